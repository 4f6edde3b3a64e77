use crate::error::{Result, SolscanError};

/// Pivot magnitude below which a linear system is treated as singular.
const SINGULAR_EPSILON: f64 = 1e-12;

/// A polynomial in `u = (x - shift) / scale`.
///
/// Fitting works on the normalized variable so that the normal equations stay
/// well conditioned for row indices in the thousands. Operator-supplied
/// polynomials use `shift = 0`, `scale = 1`.
#[derive(Clone, Debug, PartialEq)]
pub struct Polynomial {
    /// Ascending coefficients in the normalized variable.
    coeffs: Vec<f64>,
    shift: f64,
    scale: f64,
}

impl Polynomial {
    /// From ascending coefficients: `c[0] + c[1]*x + c[2]*x^2 + ...`.
    pub fn from_coefficients(coeffs: &[f64]) -> Self {
        Self {
            coeffs: coeffs.to_vec(),
            shift: 0.0,
            scale: 1.0,
        }
    }

    /// Least-squares fit of the given degree through `(xs[i], ys[i])`.
    pub fn fit(xs: &[f64], ys: &[f64], degree: usize) -> Result<Self> {
        let n = xs.len().min(ys.len());
        let terms = degree + 1;
        if n < terms {
            return Err(SolscanError::FitDegenerate(format!(
                "{n} samples cannot determine a degree {degree} polynomial"
            )));
        }

        let shift = xs[..n].iter().sum::<f64>() / n as f64;
        let spread = xs[..n]
            .iter()
            .map(|x| (x - shift).abs())
            .fold(0.0_f64, f64::max);
        let scale = if spread > 0.0 { spread } else { 1.0 };

        // Normal equations A^T A c = A^T y over the powers of u.
        let mut ata = vec![vec![0.0; terms]; terms];
        let mut aty = vec![0.0; terms];
        let mut powers = vec![0.0; terms];
        for (&x, &y) in xs.iter().zip(ys).take(n) {
            let u = (x - shift) / scale;
            let mut p = 1.0;
            for slot in powers.iter_mut() {
                *slot = p;
                p *= u;
            }
            for i in 0..terms {
                aty[i] += powers[i] * y;
                for j in 0..terms {
                    ata[i][j] += powers[i] * powers[j];
                }
            }
        }

        let coeffs = solve_linear_system(&ata, &aty)?;
        Ok(Self {
            coeffs,
            shift,
            scale,
        })
    }

    pub fn degree(&self) -> usize {
        self.coeffs.len().saturating_sub(1)
    }

    /// Evaluate with Horner's scheme.
    pub fn eval(&self, x: f64) -> f64 {
        let u = (x - self.shift) / self.scale;
        self.coeffs.iter().rev().fold(0.0, |acc, &c| acc * u + c)
    }

    /// Ascending coefficients in the raw variable `x`.
    pub fn coefficients(&self) -> Vec<f64> {
        let n = self.coeffs.len();
        let mut raw = vec![0.0; n];
        for (k, &c) in self.coeffs.iter().enumerate() {
            let ck = c / self.scale.powi(k as i32);
            // (x - s)^k = sum_j C(k, j) x^j (-s)^(k-j)
            let mut binom = 1.0;
            for (j, slot) in raw.iter_mut().enumerate().take(k + 1) {
                *slot += ck * binom * (-self.shift).powi((k - j) as i32);
                binom = binom * (k - j) as f64 / (j + 1) as f64;
            }
        }
        raw
    }
}

/// Solve a square linear system by Gaussian elimination with partial pivoting.
#[allow(clippy::needless_range_loop)]
pub(crate) fn solve_linear_system(a: &[Vec<f64>], b: &[f64]) -> Result<Vec<f64>> {
    let n = b.len();

    let mut aug: Vec<Vec<f64>> = a
        .iter()
        .zip(b.iter())
        .map(|(row, &bi)| {
            let mut new_row = row.clone();
            new_row.push(bi);
            new_row
        })
        .collect();

    for col in 0..n {
        let mut max_row = col;
        let mut max_val = aug[col][col].abs();
        for row in (col + 1)..n {
            let val = aug[row][col].abs();
            if val > max_val {
                max_val = val;
                max_row = row;
            }
        }

        if max_val < SINGULAR_EPSILON || !max_val.is_finite() {
            return Err(SolscanError::FitDegenerate(
                "singular least-squares system".into(),
            ));
        }

        if max_row != col {
            aug.swap(col, max_row);
        }

        for row in (col + 1)..n {
            let factor = aug[row][col] / aug[col][col];
            for j in col..=n {
                aug[row][j] -= factor * aug[col][j];
            }
        }
    }

    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        x[i] = aug[i][n];
        for j in (i + 1)..n {
            x[i] -= aug[i][j] * x[j];
        }
        x[i] /= aug[i][i];
    }

    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn recovers_cubic() {
        let xs: Vec<f64> = (100..400).map(|v| v as f64).collect();
        let ys: Vec<f64> = xs
            .iter()
            .map(|x| 145.0 - 0.2 * x + 1e-4 * x * x + 2e-8 * x * x * x)
            .collect();
        let p = Polynomial::fit(&xs, &ys, 3).unwrap();
        let raw = p.coefficients();
        assert_relative_eq!(raw[0], 145.0, epsilon = 1e-6);
        assert_relative_eq!(raw[1], -0.2, epsilon = 1e-8);
        assert_relative_eq!(raw[2], 1e-4, epsilon = 1e-10);
        assert_relative_eq!(raw[3], 2e-8, epsilon = 1e-12);
        assert_relative_eq!(p.eval(1000.0), 145.0 - 200.0 + 100.0 + 20.0, epsilon = 1e-6);
    }

    #[test]
    fn too_few_points_is_degenerate() {
        assert!(Polynomial::fit(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0], 3).is_err());
    }

    #[test]
    fn repeated_abscissa_is_degenerate() {
        let xs = [5.0; 10];
        let ys: Vec<f64> = (0..10).map(|v| v as f64).collect();
        assert!(Polynomial::fit(&xs, &ys, 3).is_err());
    }

    #[test]
    fn operator_coefficients_are_ascending() {
        let p = Polynomial::from_coefficients(&[1.0, 2.0, 3.0]);
        assert_eq!(p.eval(2.0), 1.0 + 4.0 + 12.0);
        assert_eq!(p.coefficients(), vec![1.0, 2.0, 3.0]);
    }
}
