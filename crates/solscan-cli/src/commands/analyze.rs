use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use solscan_core::pipeline::{analyze, parse_polynomial, ProcessingLog, ReconstructionOptions};

use crate::progress::BarReporter;

#[derive(Args)]
pub struct AnalyzeArgs {
    /// Input SER or video file
    pub file: PathBuf,

    /// Use this line polynomial instead of fitting one (ascending coefficients)
    #[arg(short = 'P', long, allow_hyphen_values = true)]
    pub polynomial: Option<String>,

    /// Print every detected line position
    #[arg(long)]
    pub detections: bool,
}

pub fn run(args: &AnalyzeArgs) -> Result<()> {
    let poly_fit = args
        .polynomial
        .as_deref()
        .map(parse_polynomial)
        .transpose()?;
    let options = ReconstructionOptions {
        poly_fit,
        ..Default::default()
    };
    options.validate()?;

    let mut log = ProcessingLog::new();
    let reporter = BarReporter::new(&args.file.display().to_string());
    let analysis = analyze(&args.file, &options, &mut log, &reporter)
        .with_context(|| format!("Failed to analyze {}", args.file.display()));
    let analysis = match analysis {
        Ok(a) => {
            reporter.finish("Done");
            a
        }
        Err(e) => {
            reporter.abandon("Failed");
            return Err(e);
        }
    };

    println!();
    for line in log.lines() {
        println!("{line}");
    }
    match analysis.limits {
        Some((y1, y2)) => println!("Fitted rows:  {y1}..{y2}"),
        None => println!("Fitted rows:  operator polynomial"),
    }
    let coeffs: Vec<String> = analysis
        .line_fit
        .polynomial
        .coefficients()
        .iter()
        .map(|c| format!("{c:e}"))
        .collect();
    println!("Polynomial:   {}", coeffs.join(","));

    if args.detections {
        for (row, column) in &analysis.line_fit.detections {
            let fitted = analysis.line_fit.curve.get(*row).copied().unwrap_or(f64::NAN);
            println!("  row {row:>5}  min {column:>5}  fit {fitted:.2}");
        }
    }

    Ok(())
}
