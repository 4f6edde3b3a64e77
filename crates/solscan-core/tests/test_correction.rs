use ndarray::Array2;

use solscan_core::correction::{correct_transversalium, savgol_filter};
use solscan_core::frame::{CircleFit, CropRect};
use solscan_core::pipeline::ProcessingLog;

fn full_disk(h: usize, w: usize) -> (CircleFit, CropRect) {
    let circle = CircleFit::new(w as f64 / 2.0, h as f64 / 2.0, h as f64 / 2.0 - 1.0);
    (circle, CropRect::full((h, w)))
}

// ---------------------------------------------------------------------------
// Transversalium
// ---------------------------------------------------------------------------

#[test]
fn test_sentinel_circle_is_noop() {
    let img = Array2::from_shape_fn((40, 30), |(y, x)| (y * 100 + x) as u16);
    let mut log = ProcessingLog::new();
    let out = correct_transversalium(img.view(), &CircleFit::NONE, &CropRect::full((40, 30)), 301, &mut log)
        .unwrap();
    assert_eq!(out.image, img);
    assert!(out.profile.is_identity());
    assert!(log.lines().iter().any(|l| l.starts_with("WARNING")));
}

#[test]
fn test_row_constant_image_is_unchanged() {
    let (h, w) = (120, 100);
    let (circle, borders) = full_disk(h, w);
    let mut log = ProcessingLog::new();

    let flat = Array2::from_elem((h, w), 20_000u16);
    let out = correct_transversalium(flat.view(), &circle, &borders, 301, &mut log).unwrap();
    assert_eq!(out.image, flat);

    // A linear ramp along the rows is smooth already.
    let ramp = Array2::from_shape_fn((h, w), |(y, _)| (10_000 + 50 * y) as u16);
    let out = correct_transversalium(ramp.view(), &circle, &borders, 301, &mut log).unwrap();
    assert_eq!(out.image, ramp);

    let again = correct_transversalium(out.image.view(), &circle, &borders, 301, &mut log).unwrap();
    assert_eq!(again.image, out.image);
}

#[test]
fn test_banding_is_flattened() {
    let (h, w) = (120, 100);
    let (circle, borders) = full_disk(h, w);
    let img = Array2::from_shape_fn((h, w), |(y, _)| if y % 2 == 0 { 30_000u16 } else { 20_000 });
    let mut log = ProcessingLog::new();

    let out = correct_transversalium(img.view(), &circle, &borders, 31, &mut log).unwrap();
    let mid_even = out.image[[60, 50]] as f64;
    let mid_odd = out.image[[61, 50]] as f64;
    assert!((mid_even - mid_odd).abs() < 1000.0, "{mid_even} vs {mid_odd}");
    assert_eq!(out.profile.factors.len(), h);
    assert_eq!(out.profile.factors[0], 1.0);
    assert_eq!(out.profile.factors[h - 1], 1.0);
    assert!(out.profile.y1 <= 2 && out.profile.y2 >= h - 2);
}

#[test]
fn test_correction_saturates_instead_of_wrapping() {
    let (h, w) = (120, 100);
    let (circle, borders) = full_disk(h, w);
    // Dark odd rows carry one very bright pixel.
    let img = Array2::from_shape_fn((h, w), |(y, x)| match (y % 2, x) {
        (0, _) => 60_000u16,
        (_, 50) => 65_000,
        _ => 20_000,
    });
    let mut log = ProcessingLog::new();

    let out = correct_transversalium(img.view(), &circle, &borders, 31, &mut log).unwrap();
    assert_eq!(out.image[[61, 50]], 65_535);
    assert!(out.image[[61, 10]] > 20_000);
}

#[test]
fn test_too_few_rows_is_noop() {
    let img = Array2::from_elem((6, 6), 1000u16);
    let circle = CircleFit::new(3.0, 3.0, 2.0);
    let mut log = ProcessingLog::new();
    let out = correct_transversalium(img.view(), &circle, &CropRect::full((6, 6)), 301, &mut log).unwrap();
    assert_eq!(out.image, img);
    assert!(out.profile.is_identity());
}

#[test]
fn test_crop_limits_the_fitted_rows() {
    let (h, w) = (120, 100);
    let (circle, _) = full_disk(h, w);
    let borders = CropRect::new(0.0, 30.0, 100.0, 90.0);
    let img = Array2::from_shape_fn((h, w), |(y, _)| if y % 2 == 0 { 30_000u16 } else { 20_000 });
    let mut log = ProcessingLog::new();

    let out = correct_transversalium(img.view(), &circle, &borders, 301, &mut log).unwrap();
    assert_eq!((out.profile.y1, out.profile.y2), (30, 90));
    assert!(out.profile.factors[..30].iter().all(|&f| f == 1.0));
    assert!(out.profile.factors[90..].iter().all(|&f| f == 1.0));
}

// ---------------------------------------------------------------------------
// Savitzky-Golay
// ---------------------------------------------------------------------------

#[test]
fn test_savgol_smooths_alternating_signal() {
    let data: Vec<f64> = (0..101).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
    let out = savgol_filter(&data, 51, 3).unwrap();
    assert_eq!(out.len(), data.len());
    assert!(out[25..76].iter().all(|v| v.abs() < 0.1));
}
