use ndarray::{ArrayView2, Axis};

use crate::consts::{BORDER_BLUR_SIZE, BORDER_MARGIN, BORDER_THRESHOLD_DIVISOR};
use crate::error::{Result, SolscanError};
use crate::filters::box_blur::box_blur;
use crate::frame::CircleFit;

/// Which bounds to detect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BorderAxis {
    /// First and last bright row (profile = mean of each row).
    Rows,
    /// First and last bright column (profile = mean of each column).
    Columns,
}

/// Find the first and last index of the bright region along `axis`.
///
/// The image is box-blurred, collapsed to a mean profile and thresholded at
/// `median / 5`. Assumes a single contiguous bright disk on a dark sky.
pub fn detect_border(image: ArrayView2<u16>, axis: BorderAxis) -> Result<(usize, usize)> {
    let (h, w) = image.dim();
    if h == 0 || w == 0 {
        return Err(SolscanError::FitDegenerate("empty image".into()));
    }
    let blurred = box_blur(image, BORDER_BLUR_SIZE);
    let profile: Vec<f64> = match axis {
        BorderAxis::Rows => blurred.mean_axis(Axis(1)),
        BorderAxis::Columns => blurred.mean_axis(Axis(0)),
    }
    .map(|a| a.to_vec())
    .unwrap_or_default();

    let threshold = median(&profile) / BORDER_THRESHOLD_DIVISOR;
    let first = profile.iter().position(|&v| v > threshold);
    let last = profile.iter().rposition(|&v| v > threshold);
    match (first, last) {
        (Some(lo), Some(hi)) => Ok((lo, hi)),
        _ => Err(SolscanError::FitDegenerate(format!(
            "no region above threshold {threshold:.1} along {axis:?}"
        ))),
    }
}

/// Disk rows of a maximum image, tightened inward by [`BORDER_MARGIN`].
pub fn vertical_limits(max_image: ArrayView2<u16>) -> Result<(usize, usize)> {
    let (y1, y2) = detect_border(max_image, BorderAxis::Rows)?;
    Ok(with_margin(y1, y2, max_image.nrows()))
}

/// The limits [`vertical_limits`] gives when every row counts as disk.
pub fn full_height_limits(height: usize) -> (usize, usize) {
    with_margin(0, height.saturating_sub(1), height)
}

fn with_margin(y1: usize, y2: usize, height: usize) -> (usize, usize) {
    (
        (y1 + BORDER_MARGIN).min(height.saturating_sub(1)),
        y2.saturating_sub(BORDER_MARGIN),
    )
}

/// Coarse circle from the bounding box of a reconstructed disk.
///
/// Used when no external circle fit is supplied. The radius is taken from the
/// vertical extent, which is the axis transversalium correction walks.
pub fn estimate_circle(disk: ArrayView2<u16>) -> Result<CircleFit> {
    let (y1, y2) = detect_border(disk, BorderAxis::Rows)?;
    let (x1, x2) = detect_border(disk, BorderAxis::Columns)?;
    if y2 <= y1 || x2 <= x1 {
        return Err(SolscanError::FitDegenerate(format!(
            "disk bounds collapse: rows {y1}..{y2}, columns {x1}..{x2}"
        )));
    }
    Ok(CircleFit::new(
        (x1 + x2) as f64 / 2.0,
        (y1 + y2) as f64 / 2.0,
        (y2 - y1) as f64 / 2.0,
    ))
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}
