use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::{info, warn};

use crate::error::Result;

/// Status lines for one input file.
///
/// Every line is also emitted through `tracing`, so a run without a log file
/// still shows the same messages on the console.
#[derive(Clone, Debug, Default)]
pub struct ProcessingLog {
    lines: Vec<String>,
}

impl ProcessingLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!("{message}");
        self.lines.push(message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{message}");
        self.lines.push(format!("WARNING: {message}"));
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Write all lines to `path`, one per line, replacing any existing file.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        for line in &self.lines {
            writeln!(out, "{line}")?;
        }
        out.flush()?;
        Ok(())
    }
}
