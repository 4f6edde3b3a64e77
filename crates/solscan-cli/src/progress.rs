use indicatif::{ProgressBar, ProgressStyle};
use solscan_core::pipeline::{PipelineStage, ProgressReporter};

const BAR_TEMPLATE: &str = "{prefix:.bold} {msg:28} [{bar:40}] {pos}/{len}";
const SPINNER_TEMPLATE: &str = "{prefix:.bold} {spinner} {msg}";

/// Progress reporter that drives a single terminal progress bar.
///
/// Frame passes get a bar sized to the frame count; the other stages show a
/// spinner with the stage label.
pub struct BarReporter {
    bar: ProgressBar,
}

impl BarReporter {
    pub fn new(file_label: &str) -> Self {
        let bar = ProgressBar::new(0);
        bar.set_prefix(file_label.to_string());
        Self { bar }
    }

    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    pub fn abandon(&self, message: &str) {
        self.bar.abandon_with_message(message.to_string());
    }
}

impl ProgressReporter for BarReporter {
    fn begin_stage(&self, stage: PipelineStage, total_items: Option<usize>) {
        match total_items {
            Some(total) => {
                if let Ok(style) = ProgressStyle::default_bar().template(BAR_TEMPLATE) {
                    self.bar.set_style(style.progress_chars("=> "));
                }
                self.bar.set_length(total as u64);
            }
            None => {
                if let Ok(style) = ProgressStyle::default_spinner().template(SPINNER_TEMPLATE) {
                    self.bar.set_style(style);
                }
            }
        }
        self.bar.set_position(0);
        self.bar.set_message(stage.to_string());
    }

    fn advance(&self, items_done: usize) {
        self.bar.set_position(items_done as u64);
    }

    fn finish_stage(&self) {
        self.bar.tick();
    }
}
