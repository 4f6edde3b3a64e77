use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use ndarray::ArrayView2;
use solscan_core::frame::Frame;
use solscan_core::io::fits::{write_fits, FitsHeader};
use solscan_core::io::image_io::save_png16;
use solscan_core::pipeline::{
    estimate_circle_or_none, parse_offsets, parse_polynomial, post_process, reconstruct,
    PipelineStage, ProcessedDisk, ProcessingLog, ProgressReporter, ReconstructionOptions,
    Renditions,
};
use solscan_core::reconstruct::PreviewObserver;
use tracing::warn;

use crate::progress::BarReporter;
use crate::summary;

/// Write the preview image every this many preview callbacks.
const PREVIEW_EVERY: usize = 10;

#[derive(Args)]
pub struct RunArgs {
    /// Input SER or video files
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Options file (TOML); flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Pixel offsets: "a,b,c", "x:y" or "x:y:step"
    #[arg(short = 'w', long, allow_hyphen_values = true)]
    pub shifts: Option<String>,

    /// Line polynomial, comma-separated ascending coefficients
    #[arg(short = 'P', long, allow_hyphen_values = true)]
    pub polynomial: Option<String>,

    /// Build a dopplergram (needs --polynomial)
    #[arg(short, long)]
    pub doppler: bool,

    /// Mirror the disk left to right
    #[arg(short, long)]
    pub flip: bool,

    /// Crop the disk to a square around its centre
    #[arg(short, long)]
    pub square: bool,

    /// Skip the transversalium correction
    #[arg(long)]
    pub no_transversalium: bool,

    /// Transversalium smoothing window
    #[arg(long)]
    pub strength: Option<usize>,

    /// Counter-clockwise rotation of the exported images (0, 90, 180, 270)
    #[arg(short, long)]
    pub rotation: Option<u32>,

    /// Also write FITS files
    #[arg(long)]
    pub fits: bool,

    /// Only export the CLAHE image
    #[arg(long)]
    pub clahe_only: bool,

    /// Do not mask the disk in the prominence image
    #[arg(long)]
    pub no_disk: bool,

    /// Pixels added to the disk radius before masking
    #[arg(long, allow_hyphen_values = true)]
    pub delta_radius: Option<i64>,

    /// Periodically write the partial disk to <name>_preview.png
    #[arg(long)]
    pub preview: bool,

    /// Output directory (default: next to each input)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}

pub fn run(args: &RunArgs) -> Result<()> {
    let options = build_options(args)?;
    options.validate()?;
    summary::print_run_summary(&options, &args.files);

    let mut failed = 0;
    for file in &args.files {
        match process_file(file, &options) {
            Ok(outputs) => summary::print_file_done(file, &outputs),
            Err(e) => {
                warn!(file = %file.display(), error = %e, "File failed");
                summary::print_file_failed(file, &e);
                failed += 1;
            }
        }
    }
    summary::print_batch_result(args.files.len() - failed, failed);

    if failed > 0 {
        bail!("{failed} of {} file(s) failed", args.files.len());
    }
    Ok(())
}

fn build_options(args: &RunArgs) -> Result<ReconstructionOptions> {
    let mut options: ReconstructionOptions = if let Some(ref config_path) = args.config {
        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config {}", config_path.display()))?;
        toml::from_str(&contents).context("Invalid options file")?
    } else {
        ReconstructionOptions::default()
    };

    if let Some(ref offsets) = args.shifts {
        options.shifts = parse_offsets(offsets)?;
    }
    if let Some(ref poly) = args.polynomial {
        options.poly_fit = Some(parse_polynomial(poly)?);
    }
    if let Some(strength) = args.strength {
        options.trans_strength = strength;
    }
    if let Some(rotation) = args.rotation {
        options.rotation = rotation;
    }
    if let Some(delta) = args.delta_radius {
        options.delta_radius = delta;
    }
    if let Some(ref dir) = args.output_dir {
        options.work_dir = Some(dir.clone());
    }
    options.doppler |= args.doppler;
    options.flip_x |= args.flip;
    options.crop_width_square |= args.square;
    options.save_fits |= args.fits;
    options.clahe_only |= args.clahe_only;
    options.display |= args.preview;
    if args.no_transversalium {
        options.transversalium = false;
    }
    if args.no_disk {
        options.disk_display = false;
    }
    Ok(options)
}

/// Output location and base name for one input file.
struct OutputBase {
    dir: PathBuf,
    stem: String,
}

impl OutputBase {
    fn new(input: &Path, options: &ReconstructionOptions) -> Result<Self> {
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .with_context(|| format!("No file name in {}", input.display()))?
            .to_string();
        let dir = match options.work_dir {
            Some(ref dir) => dir.clone(),
            None => input
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        };
        Ok(Self { dir, stem })
    }

    fn path(&self, suffix: &str) -> PathBuf {
        self.dir.join(format!("{}{}", self.stem, suffix))
    }

    /// Base name of the images for one offset; offset 0 alone keeps the plain name.
    fn for_shift(&self, shift: i32, single: bool) -> OutputBase {
        let stem = if single && shift == 0 {
            self.stem.clone()
        } else {
            format!("{}_shift{}", self.stem, shift)
        };
        OutputBase {
            dir: self.dir.clone(),
            stem,
        }
    }
}

/// Writes the in-progress disk to a PNG at a fixed cadence.
struct PreviewWriter {
    path: PathBuf,
    calls: usize,
}

impl PreviewObserver for PreviewWriter {
    fn preview(&mut self, disk: ArrayView2<u16>, frame: &Frame) -> ControlFlow<()> {
        if self.calls % PREVIEW_EVERY == 0 {
            if let Err(e) = save_png16(disk, &self.path) {
                warn!(frame = frame.index, error = %e, "Preview not written");
            }
        }
        self.calls += 1;
        ControlFlow::Continue(())
    }
}

fn process_file(file: &Path, options: &ReconstructionOptions) -> Result<Vec<PathBuf>> {
    let base = OutputBase::new(file, options)?;
    std::fs::create_dir_all(&base.dir)
        .with_context(|| format!("Failed to create {}", base.dir.display()))?;

    let mut log = ProcessingLog::new();
    let reporter = BarReporter::new(&base.stem);
    let mut preview = PreviewWriter {
        path: base.path("_preview.png"),
        calls: 0,
    };

    let result = reconstruct_and_export(file, options, &base, &mut log, &reporter, &mut preview);
    match result {
        Ok(_) => reporter.finish("Done"),
        Err(ref e) => {
            log.warn(format!("processing failed: {e:#}"));
            reporter.abandon("Failed");
        }
    }

    // The log is written even when processing fails part way.
    let log_path = base.path("_log.txt");
    log.write_to(&log_path)
        .with_context(|| format!("Failed to write {}", log_path.display()))?;

    let mut outputs = result?;
    outputs.push(log_path);
    Ok(outputs)
}

fn reconstruct_and_export(
    file: &Path,
    options: &ReconstructionOptions,
    base: &OutputBase,
    log: &mut ProcessingLog,
    reporter: &BarReporter,
    preview: &mut PreviewWriter,
) -> Result<Vec<PathBuf>> {
    let output = reconstruct(file, options, log, reporter, preview)
        .with_context(|| format!("Failed to reconstruct {}", file.display()))?;
    let mut written = Vec::new();

    if options.save_fits {
        if let Some(ref stats) = output.analysis.stats {
            let path = base.path("_mean.fits");
            write_fits(&path, stats.mean.view(), &output.header)?;
            written.push(path);
        }
    }

    let single = output.disks.len() == 1;
    for disk in &output.disks {
        let disk_base = base.for_shift(disk.shift, single);
        if options.save_fits {
            let path = disk_base.path("_recon.fits");
            write_fits(&path, disk.data.view(), &output.header)?;
            written.push(path);
        }

        let circle = estimate_circle_or_none(disk, log);
        let processed = post_process(disk, &circle, options, log, reporter)?;

        reporter.begin_stage(PipelineStage::Writing, None);
        written.extend(export_renditions(&processed, &disk_base, options, &output.header)?);
        reporter.finish_stage();
    }

    Ok(written)
}

fn export_renditions(
    processed: &ProcessedDisk,
    base: &OutputBase,
    options: &ReconstructionOptions,
    header: &FitsHeader,
) -> Result<Vec<PathBuf>> {
    let mut images: Vec<(PathBuf, ArrayView2<u16>)> = Vec::new();
    match processed.renditions {
        Renditions::Intensity(ref r) => {
            images.push((base.path("_clahe.png"), r.clahe.view()));
            if !options.clahe_only {
                images.push((base.path("_disk.png"), r.standard.view()));
                images.push((base.path("_diskHC.png"), r.high_contrast.view()));
                images.push((base.path("_protus.png"), r.prominence.view()));
            }
        }
        Renditions::Doppler(ref r) => {
            images.push((base.path("_doppler2.png"), r.inverted.view()));
            images.push((base.path("_doppler3.png"), r.shifted.view()));
        }
    }

    let mut written = Vec::with_capacity(images.len() + 1);
    for (path, data) in images {
        save_png16(data, &path).with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(path);
    }

    if options.save_fits {
        if let Renditions::Intensity(ref r) = processed.renditions {
            let path = base.path("_clahe.fits");
            write_fits(&path, r.clahe_raw.view(), header)?;
            written.push(path);
        }
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: RunArgs,
    }

    fn parse(argv: &[&str]) -> RunArgs {
        let mut full = vec!["solscan"];
        full.extend_from_slice(argv);
        TestCli::parse_from(full).args
    }

    #[test]
    fn test_flags_override_defaults() {
        let args = parse(&["-w", "-2:2", "--no-transversalium", "-r", "90", "--delta-radius", "-4", "a.ser"]);
        let options = build_options(&args).unwrap();
        assert_eq!(options.shifts, vec![-2, -1, 0, 1, 2]);
        assert!(!options.transversalium);
        assert_eq!(options.rotation, 90);
        assert_eq!(options.delta_radius, -4);
        assert!(options.disk_display);
        assert!(!options.display);
    }

    #[test]
    fn test_doppler_flags() {
        let args = parse(&["-d", "-P", "145.8,-0.21", "a.ser", "b.ser"]);
        assert_eq!(args.files.len(), 2);
        let options = build_options(&args).unwrap();
        assert!(options.doppler);
        assert_eq!(options.poly_fit, Some(vec![145.8, -0.21]));
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_output_names() {
        let options = ReconstructionOptions {
            work_dir: Some(PathBuf::from("/out")),
            ..Default::default()
        };
        let base = OutputBase::new(Path::new("/data/scan_01.ser"), &options).unwrap();
        assert_eq!(base.path("_clahe.png"), PathBuf::from("/out/scan_01_clahe.png"));
        assert_eq!(base.for_shift(0, true).path("_disk.png"), PathBuf::from("/out/scan_01_disk.png"));
        assert_eq!(
            base.for_shift(-3, false).path("_disk.png"),
            PathBuf::from("/out/scan_01_shift-3_disk.png")
        );

        let here = OutputBase::new(Path::new("/data/scan_01.ser"), &ReconstructionOptions::default()).unwrap();
        assert_eq!(here.path("_log.txt"), PathBuf::from("/data/scan_01_log.txt"));
    }
}
