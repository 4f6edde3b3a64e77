use std::f64::consts::PI;

use ndarray::{Array2, ArrayView2, Axis};
use rayon::prelude::*;
use tracing::debug;

use crate::consts::{MAX_SAMPLE, PARALLEL_PIXEL_THRESHOLD, SAVGOL_ORDER, TUKEY_TAPER_FRACTION};
use crate::error::Result;
use crate::frame::{CircleFit, CropRect};
use crate::pipeline::log::ProcessingLog;

use super::savgol::savgol_filter;

/// Smallest window a cubic Savitzky-Golay fit accepts.
const MIN_WINDOW: usize = SAVGOL_ORDER + 2;

/// Per-row multiplicative correction applied to an image.
#[derive(Clone, Debug, PartialEq)]
pub struct CorrectionProfile {
    /// One factor per image row; `1.0` outside `[y1, y2)`.
    pub factors: Vec<f64>,
    /// First fitted row.
    pub y1: usize,
    /// One past the last fitted row.
    pub y2: usize,
}

impl CorrectionProfile {
    pub fn identity(height: usize) -> Self {
        Self {
            factors: vec![1.0; height],
            y1: 0,
            y2: 0,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.factors.iter().all(|&f| f == 1.0)
    }
}

#[derive(Clone, Debug)]
pub struct Corrected {
    pub image: Array2<u16>,
    pub profile: CorrectionProfile,
}

impl Corrected {
    fn unchanged(image: ArrayView2<u16>) -> Self {
        Self {
            image: image.to_owned(),
            profile: CorrectionProfile::identity(image.nrows()),
        }
    }
}

/// Remove horizontal banding by flattening the row brightness profile.
///
/// The mean of every row inside the disk (clipped to `borders`) is smoothed
/// with a cubic Savitzky-Golay filter of width `strength`; each row is then
/// scaled by `smoothed / raw`, tapered to 1 at both ends of the disk. Without
/// a circle, or when the disk spans too few rows, the image is returned as is.
pub fn correct_transversalium(
    image: ArrayView2<u16>,
    circle: &CircleFit,
    borders: &CropRect,
    strength: usize,
    log: &mut ProcessingLog,
) -> Result<Corrected> {
    if circle.is_none() {
        log.warn("no circle fit, transversalium correction skipped");
        return Ok(Corrected::unchanged(image));
    }

    let (height, width) = image.dim();
    let y1 = (circle.cy - circle.radius).max(borders.min_y).ceil().max(0.0) as usize;
    let y2 = ((circle.cy + circle.radius).min(borders.max_y).floor().max(0.0) as usize).min(height);
    if y2 <= y1 {
        log.warn(format!("disk rows {y1}..{y2} are empty, transversalium correction skipped"));
        return Ok(Corrected::unchanged(image));
    }

    let Some(raw) = row_means(image, circle, borders, y1, y2, width) else {
        log.warn("no disk pixels inside the crop, transversalium correction skipped");
        return Ok(Corrected::unchanged(image));
    };

    let n = raw.len();
    let mut window = strength.min((n / 2 * 2).saturating_sub(1));
    if window % 2 == 0 {
        window = window.saturating_sub(1);
    }
    if window < MIN_WINDOW {
        log.warn(format!(
            "{n} disk rows are too few for a smoothing window, transversalium correction skipped"
        ));
        return Ok(Corrected::unchanged(image));
    }

    let filled = fill_missing(&raw);
    let smoothed = savgol_filter(&filled, window, SAVGOL_ORDER)?;

    let mut factors = vec![1.0; height];
    for (i, slot) in factors[y1..y2].iter_mut().enumerate() {
        let factor = match raw[i] {
            Some(r) if r > 0.0 => smoothed[i] / r,
            _ => 1.0,
        };
        let factor = if factor.is_finite() { factor } else { 1.0 };
        *slot = 1.0 + (factor - 1.0) * tukey(i, n, TUKEY_TAPER_FRACTION);
    }

    debug!(y1, y2, window, "Transversalium profile computed");
    log.line(format!(
        "transversalium correction rows {y1}..{y2}, window {window}"
    ));

    let corrected = apply_row_factors(image, &factors);
    Ok(Corrected {
        image: corrected,
        profile: CorrectionProfile { factors, y1, y2 },
    })
}

/// Mean of the in-disk strip of each row, `None` where the strip is empty.
///
/// Returns `None` overall when no row has any pixel.
fn row_means(
    image: ArrayView2<u16>,
    circle: &CircleFit,
    borders: &CropRect,
    y1: usize,
    y2: usize,
    width: usize,
) -> Option<Vec<Option<f64>>> {
    let means: Vec<Option<f64>> = (y1..y2)
        .map(|y| {
            let dy = y as f64 - circle.cy;
            let dx = (circle.radius * circle.radius - dy * dy).max(0.0).sqrt().floor();
            let x1 = (circle.cx - dx).max(borders.min_x).ceil().max(0.0) as usize;
            let x2 = ((circle.cx + dx).min(borders.max_x).floor().max(0.0) as usize).min(width);
            if x2 <= x1 {
                return None;
            }
            let strip = image.row(y);
            let sum: f64 = strip.iter().skip(x1).take(x2 - x1).map(|&v| v as f64).sum();
            Some(sum / (x2 - x1) as f64)
        })
        .collect();
    means.iter().any(Option::is_some).then_some(means)
}

/// Replace missing rows with the nearest measured one.
fn fill_missing(values: &[Option<f64>]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut last = values.iter().flatten().next().copied().unwrap_or(0.0);
    for v in values {
        if let Some(v) = v {
            last = *v;
        }
        out.push(last);
    }
    out
}

/// Tukey window of taper fraction `a` at sample `x` of `n`.
fn tukey(x: usize, n: usize, a: f64) -> f64 {
    let n_f = n as f64;
    let x_f = x as f64;
    let edge = a * n_f / 2.0;
    if x_f < edge {
        0.5 * (1.0 - (2.0 * PI * x_f / (a * n_f)).cos())
    } else if x_f <= n_f / 2.0 {
        1.0
    } else {
        tukey(n - x, n, a)
    }
}

fn apply_row_factors(image: ArrayView2<u16>, factors: &[f64]) -> Array2<u16> {
    let mut out = image.to_owned();
    let scale_row = |(mut row, &factor): (ndarray::ArrayViewMut1<u16>, &f64)| {
        if factor == 1.0 {
            return;
        }
        // Rounded rather than truncated so a factor of 1 +/- epsilon leaves samples unchanged.
        row.mapv_inplace(|v| (v as f64 * factor).round().clamp(0.0, MAX_SAMPLE as f64) as u16);
    };
    if image.len() >= PARALLEL_PIXEL_THRESHOLD {
        out.axis_iter_mut(Axis(0))
            .into_par_iter()
            .zip(factors.par_iter())
            .for_each(scale_row);
    } else {
        out.axis_iter_mut(Axis(0)).zip(factors.iter()).for_each(scale_row);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taper_is_symmetric_and_flat() {
        let n = 200;
        assert_eq!(tukey(0, n, 0.05), 0.0);
        assert_eq!(tukey(100, n, 0.05), 1.0);
        assert_eq!(tukey(50, n, 0.05), 1.0);
        assert!((tukey(2, n, 0.05) - tukey(198, n, 0.05)).abs() < 1e-12);
        assert!(tukey(2, n, 0.05) > 0.0 && tukey(2, n, 0.05) < 1.0);
    }

    #[test]
    fn missing_rows_take_neighbours() {
        let filled = fill_missing(&[None, Some(3.0), None, Some(5.0), None]);
        assert_eq!(filled, vec![3.0, 3.0, 3.0, 5.0, 5.0]);
    }

    #[test]
    fn row_factors_round_to_nearest() {
        let image = ndarray::array![[1000u16, 3], [1000, 65535]];
        let out = apply_row_factors(image.view(), &[0.9999999, 2.0]);
        assert_eq!(out, ndarray::array![[1000u16, 3], [2000, 65535]]);
    }
}
