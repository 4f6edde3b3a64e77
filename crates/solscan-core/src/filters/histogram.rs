use ndarray::{Array2, ArrayView2};

use crate::consts::MAX_SAMPLE;

const BINS: usize = 1 << 16;

/// Counting histogram over the full 16-bit range.
pub fn histogram_u16(data: ArrayView2<u16>) -> Vec<u64> {
    let mut hist = vec![0u64; BINS];
    for &v in data.iter() {
        hist[v as usize] += 1;
    }
    hist
}

/// The `k`-th smallest sample (0-based) described by `hist`.
fn kth_value(hist: &[u64], k: u64) -> u16 {
    let mut seen = 0u64;
    for (value, &count) in hist.iter().enumerate() {
        seen += count;
        if seen > k {
            return value as u16;
        }
    }
    MAX_SAMPLE
}

/// Percentile with linear interpolation between order statistics.
///
/// `p` is in percent. Returns 0 for an empty image.
pub fn percentile_u16(data: ArrayView2<u16>, p: f64) -> f64 {
    let n = data.len() as u64;
    if n == 0 {
        return 0.0;
    }
    let hist = histogram_u16(data);
    let pos = (p.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
    let lo = pos.floor() as u64;
    let frac = pos - lo as f64;
    let a = kth_value(&hist, lo) as f64;
    if frac == 0.0 {
        return a;
    }
    let b = kth_value(&hist, (lo + 1).min(n - 1)) as f64;
    a + (b - a) * frac
}

/// Linear stretch mapping `[low, high]` onto `[0, 65535]`, clipped and truncated.
pub fn stretch(data: ArrayView2<u16>, low: f64, high: f64) -> Array2<u16> {
    let range = high - low;
    let range = if range.abs() < f64::EPSILON { 1.0 } else { range };
    let scale = MAX_SAMPLE as f64 / range;
    data.mapv(|v| ((v as f64 - low) * scale).clamp(0.0, MAX_SAMPLE as f64) as u16)
}
