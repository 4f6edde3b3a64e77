use crate::analysis::polynomial::{solve_linear_system, Polynomial};
use crate::error::{Result, SolscanError};

/// Savitzky-Golay smoothing with polynomial interpolation at the edges.
///
/// Interior samples are convolved with the least-squares coefficients for a
/// centered window. The first and last `window / 2` samples are taken from a
/// polynomial of the same order fitted to the first and last full window.
pub fn savgol_filter(data: &[f64], window: usize, order: usize) -> Result<Vec<f64>> {
    if window % 2 == 0 || window <= order {
        return Err(SolscanError::InvalidConfig(format!(
            "Savitzky-Golay window must be odd and larger than the order ({window} <= {order})"
        )));
    }
    let n = data.len();
    if n < window {
        return Err(SolscanError::InvalidConfig(format!(
            "Savitzky-Golay window {window} exceeds signal length {n}"
        )));
    }

    let half = window / 2;
    let coeffs = smoothing_coefficients(half, order)?;

    let mut out = vec![0.0; n];
    for i in half..n - half {
        out[i] = data[i - half..=i + half]
            .iter()
            .zip(&coeffs)
            .map(|(v, c)| v * c)
            .sum();
    }

    let xs: Vec<f64> = (0..window).map(|k| k as f64).collect();
    let head = Polynomial::fit(&xs, &data[..window], order)?;
    for (i, slot) in out.iter_mut().enumerate().take(half) {
        *slot = head.eval(i as f64);
    }
    let tail = Polynomial::fit(&xs, &data[n - window..], order)?;
    for i in n - half..n {
        out[i] = tail.eval((i - (n - window)) as f64);
    }

    Ok(out)
}

/// Convolution weights for the value at the window center.
///
/// Offsets are scaled to `[-1, 1]`; the center value is unaffected and the
/// normal equations stay well conditioned for wide windows.
fn smoothing_coefficients(half: usize, order: usize) -> Result<Vec<f64>> {
    let terms = order + 1;
    let scale = half.max(1) as f64;
    let us: Vec<f64> = (-(half as i64)..=half as i64)
        .map(|k| k as f64 / scale)
        .collect();

    let mut ata = vec![vec![0.0; terms]; terms];
    for &u in &us {
        for (i, row) in ata.iter_mut().enumerate() {
            for (j, slot) in row.iter_mut().enumerate() {
                *slot += u.powi((i + j) as i32);
            }
        }
    }
    let mut e0 = vec![0.0; terms];
    e0[0] = 1.0;
    let z = solve_linear_system(&ata, &e0)?;

    Ok(us
        .iter()
        .map(|&u| z.iter().rev().fold(0.0, |acc, &c| acc * u + c))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn five_point_cubic_weights() {
        let c = smoothing_coefficients(2, 3).unwrap();
        let expected = [-3.0, 12.0, 17.0, 12.0, -3.0].map(|v| v / 35.0);
        for (a, b) in c.iter().zip(expected) {
            assert_relative_eq!(*a, b, epsilon = 1e-12);
        }
    }

    #[test]
    fn cubic_signal_is_preserved() {
        let data: Vec<f64> = (0..40)
            .map(|x| {
                let x = x as f64;
                3.0 - 0.5 * x + 0.02 * x * x - 0.001 * x * x * x
            })
            .collect();
        let smoothed = savgol_filter(&data, 11, 3).unwrap();
        for (a, b) in smoothed.iter().zip(&data) {
            assert_relative_eq!(*a, *b, epsilon = 1e-8);
        }
    }

    #[test]
    fn rejects_bad_windows() {
        let data = vec![1.0; 10];
        assert!(savgol_filter(&data, 4, 3).is_err());
        assert!(savgol_filter(&data, 3, 3).is_err());
        assert!(savgol_filter(&data, 11, 3).is_err());
    }
}
