#[allow(dead_code)]
mod common;

use ndarray::Array2;
use solscan_core::frame::CircleFit;
use solscan_core::pipeline::{
    analyze, estimate_circle_or_none, post_process, reconstruct, NoOpReporter, ProcessingLog,
    ReconstructionOptions, Renditions,
};
use solscan_core::reconstruct::{DiskKind, NoPreview};

// ---------------------------------------------------------------------------
// End-to-end on a synthetic scan
// ---------------------------------------------------------------------------

#[test]
fn test_end_to_end_scan() {
    let file = common::write_scan_ser();
    let options = ReconstructionOptions::default();
    let mut log = ProcessingLog::new();

    let out = reconstruct(file.path(), &options, &mut log, &NoOpReporter, &mut NoPreview).unwrap();

    assert_eq!(out.circle, CircleFit::NONE);
    assert_eq!(out.analysis.limits, Some((20, 44)));
    assert!(out.analysis.stats.is_some());
    assert_eq!(out.header.naxis1, 64);
    assert_eq!(out.header.naxis2, 64);

    // The fitted line sits on column 32.
    let line = out.analysis.line_fit.polynomial.eval(32.0);
    assert!((line - 32.0).abs() < 1e-6, "line at {line}");

    assert_eq!(out.disks.len(), 1);
    let disk = &out.disks[0].data;
    assert_eq!(disk.dim(), (64, 100));
    // Inside the disk rows the line intensity is bright ...
    assert!(disk[[32, 50]] > 10_000);
    assert!(disk[[20, 50]] > 10_000);
    assert!(disk[[32, 35]] > 10_000);
    // ... and dark elsewhere.
    assert!(disk[[32, 5]] < 1_000);
    assert!(disk[[2, 50]] < 1_000);
    assert!(disk[[60, 50]] < 1_000);

    assert!(log.lines().iter().any(|l| l.starts_with("Vertical limits")));
}

#[test]
fn test_post_process_with_estimated_circle() {
    let file = common::write_scan_ser();
    let options = ReconstructionOptions {
        flip_x: true,
        crop_width_square: true,
        rotation: 90,
        ..Default::default()
    };
    let mut log = ProcessingLog::new();
    let out = reconstruct(file.path(), &options, &mut log, &NoOpReporter, &mut NoPreview).unwrap();

    let circle = estimate_circle_or_none(&out.disks[0], &mut log);
    assert!(!circle.is_none());
    assert!((circle.cy - 32.0).abs() < 2.0, "cy = {}", circle.cy);
    assert!((circle.cx - 50.0).abs() < 2.0, "cx = {}", circle.cx);

    let processed = post_process(&out.disks[0], &circle, &options, &mut log, &NoOpReporter).unwrap();
    // Square crop to the 64 rows, centred on the mirrored disk.
    assert_eq!(processed.image.dim(), (64, 64));
    assert!((processed.circle.cx - 32.0).abs() < 2.0);
    assert_eq!(processed.profile.factors.len(), 64);

    match &processed.renditions {
        Renditions::Intensity(r) => {
            assert_eq!(r.standard.dim(), (64, 64));
            assert_eq!(r.clahe_raw.dim(), (64, 64));
        }
        Renditions::Doppler(_) => panic!("expected intensity renditions"),
    }
}

#[test]
fn test_operator_polynomial_skips_statistics() {
    let file = common::write_scan_ser();
    let options = ReconstructionOptions {
        poly_fit: Some(vec![32.0]),
        shifts: vec![0, 3],
        ..Default::default()
    };
    let mut log = ProcessingLog::new();
    let analysis = analyze(file.path(), &options, &mut log, &NoOpReporter).unwrap();
    assert!(analysis.stats.is_none());
    assert!(analysis.limits.is_none());
    assert!(analysis.line_fit.table.entries().iter().all(|e| e.base == 32 && e.weight == 0.0));

    let out = reconstruct(file.path(), &options, &mut log, &NoOpReporter, &mut NoPreview).unwrap();
    assert_eq!(out.disks.len(), 2);
    assert_eq!(out.disks[0].data[[32, 50]], common::LINE_LEVEL);
    assert_eq!(out.disks[1].data[[32, 50]], common::DISK_LEVEL);
}

#[test]
fn test_operator_polynomial_keeps_statistics_for_fits() {
    let file = common::write_scan_ser();
    let options = ReconstructionOptions {
        poly_fit: Some(vec![32.0]),
        save_fits: true,
        ..Default::default()
    };
    let mut log = ProcessingLog::new();
    let analysis = analyze(file.path(), &options, &mut log, &NoOpReporter).unwrap();
    let stats = analysis.stats.expect("mean image for FITS export");
    assert_eq!(stats.mean.dim(), (common::SCAN_SIZE, common::SCAN_SIZE));
    assert!(analysis.limits.is_none());
}

#[test]
fn test_dark_video_uses_full_height() {
    let frames = vec![Array2::<u16>::zeros((64, 32)); 20];
    let file = common::write_ser(&frames, 16);
    let options = ReconstructionOptions::default();
    let mut log = ProcessingLog::new();

    let out = reconstruct(file.path(), &options, &mut log, &NoOpReporter, &mut NoPreview).unwrap();

    assert_eq!(out.analysis.limits, Some((10, 53)));
    assert_eq!(out.disks.len(), 1);
    assert_eq!(out.disks[0].data.dim(), (64, 20));
    assert!(log.lines().iter().any(|l| l.starts_with("WARNING: disk rows not detected")));
    assert!(log.lines().iter().any(|l| l == "Vertical limits y1, y2 : 10 53"));
}

#[test]
fn test_doppler_mode_produces_one_image() {
    let file = common::write_scan_ser();
    let options = ReconstructionOptions {
        poly_fit: Some(vec![32.0]),
        doppler: true,
        shifts: vec![0, 5],
        ..Default::default()
    };
    let mut log = ProcessingLog::new();
    let out = reconstruct(file.path(), &options, &mut log, &NoOpReporter, &mut NoPreview).unwrap();
    assert_eq!(out.disks.len(), 1);
    assert_eq!(out.disks[0].kind, DiskKind::Doppler);
    // argmin 32 against a reference intensity of 20000 inside the disk.
    assert_eq!(out.disks[0].data[[32, 50]], 65535 - 20_000 + 32);

    let processed = post_process(&out.disks[0], &CircleFit::NONE, &options, &mut log, &NoOpReporter).unwrap();
    assert!(processed.profile.is_identity());
    assert!(matches!(processed.renditions, Renditions::Doppler(_)));
}

#[test]
fn test_invalid_options_fail_before_reading() {
    let options = ReconstructionOptions {
        doppler: true,
        ..Default::default()
    };
    let mut log = ProcessingLog::new();
    let result = reconstruct(
        std::path::Path::new("/nonexistent/scan.ser"),
        &options,
        &mut log,
        &NoOpReporter,
        &mut NoPreview,
    );
    assert!(matches!(
        result,
        Err(solscan_core::error::SolscanError::InvalidConfig(_))
    ));
}

#[test]
fn test_missing_file_is_io_error() {
    let mut log = ProcessingLog::new();
    let result = reconstruct(
        std::path::Path::new("/nonexistent/scan.ser"),
        &ReconstructionOptions::default(),
        &mut log,
        &NoOpReporter,
        &mut NoPreview,
    );
    assert!(matches!(result, Err(solscan_core::error::SolscanError::Io(_))));
}
