use ndarray::ArrayView2;
use tracing::debug;

use crate::consts::LINE_FIT_DEGREE;
use crate::error::{Result, SolscanError};

use super::polynomial::Polynomial;

/// Position of the spectral line on one row: column `base + weight`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinePosition {
    /// Left interpolation column, always in `[0, width - 2]`.
    pub base: usize,
    /// Weight of column `base + 1`, always in `[0, 1)`.
    pub weight: f64,
}

/// Per-row spectral line positions, one entry per frame row.
#[derive(Clone, Debug, PartialEq)]
pub struct LineFitTable {
    entries: Vec<LinePosition>,
    width: usize,
}

impl LineFitTable {
    /// Split a real-valued curve into clamped `(floor, fraction)` pairs.
    ///
    /// Values that fall outside `[0, width - 1)` (or are not finite) saturate at
    /// the nearest valid base column with zero weight.
    pub fn from_curve(curve: &[f64], width: usize) -> Result<Self> {
        if width < 2 {
            return Err(SolscanError::InvalidDimensions {
                width: width as u32,
                height: curve.len() as u32,
            });
        }
        let max_base = width - 2;
        let entries = curve
            .iter()
            .map(|&c| {
                let floor = c.floor();
                if !c.is_finite() || floor < 0.0 {
                    LinePosition {
                        base: 0,
                        weight: 0.0,
                    }
                } else if floor > max_base as f64 {
                    LinePosition {
                        base: max_base,
                        weight: 0.0,
                    }
                } else {
                    LinePosition {
                        base: floor as usize,
                        weight: c - floor,
                    }
                }
            })
            .collect();
        Ok(Self { entries, width })
    }

    /// Evaluate `poly` at every row in `[0, height)`.
    pub fn from_polynomial(poly: &Polynomial, height: usize, width: usize) -> Result<Self> {
        let curve = evaluate_curve(poly, height);
        Self::from_curve(&curve, width)
    }

    /// The same position on every row.
    pub fn uniform(height: usize, width: usize, column: f64) -> Result<Self> {
        Self::from_curve(&vec![column; height], width)
    }

    pub fn entries(&self) -> &[LinePosition] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Frame width the table was clamped against.
    pub fn width(&self) -> usize {
        self.width
    }
}

/// Result of locating and fitting the spectral line.
#[derive(Clone, Debug)]
pub struct LineFit {
    pub polynomial: Polynomial,
    /// Polynomial evaluated at every row.
    pub curve: Vec<f64>,
    pub table: LineFitTable,
    /// Raw per-row minimum columns over the fitted rows, `(row, column)`.
    pub detections: Vec<(usize, usize)>,
}

impl LineFit {
    /// Use an operator-supplied polynomial verbatim; no detection is done.
    pub fn from_polynomial(polynomial: Polynomial, height: usize, width: usize) -> Result<Self> {
        let curve = evaluate_curve(&polynomial, height);
        let table = LineFitTable::from_curve(&curve, width)?;
        Ok(Self {
            polynomial,
            curve,
            table,
            detections: Vec::new(),
        })
    }
}

/// Column of the darkest sample on each row in `[y1, y2)` (first one on ties).
pub fn row_minima(image: ArrayView2<u16>, y1: usize, y2: usize) -> Vec<(usize, usize)> {
    let y2 = y2.min(image.nrows());
    (y1..y2)
        .map(|y| {
            let row = image.row(y);
            let mut best = 0;
            for (x, &v) in row.iter().enumerate() {
                if v < row[best] {
                    best = x;
                }
            }
            (y, best)
        })
        .collect()
}

/// Locate the absorption line on the mean image and fit a cubic through it.
///
/// The darkest column of each row in `[y1, y2)` is taken as the raw line
/// position; the least-squares cubic through those points is evaluated on
/// every row of the frame.
pub fn fit_spectral_line(mean: ArrayView2<u16>, y1: usize, y2: usize) -> Result<LineFit> {
    let (height, width) = mean.dim();
    let detections = row_minima(mean, y1, y2);
    let xs: Vec<f64> = detections.iter().map(|&(y, _)| y as f64).collect();
    let ys: Vec<f64> = detections.iter().map(|&(_, x)| x as f64).collect();

    let polynomial = Polynomial::fit(&xs, &ys, LINE_FIT_DEGREE)?;
    debug!(
        rows = detections.len(),
        coefficients = ?polynomial.coefficients(),
        "Fitted spectral line"
    );

    let curve = evaluate_curve(&polynomial, height);
    let table = LineFitTable::from_curve(&curve, width)?;
    Ok(LineFit {
        polynomial,
        curve,
        table,
        detections,
    })
}

fn evaluate_curve(poly: &Polynomial, height: usize) -> Vec<f64> {
    (0..height).map(|y| poly.eval(y as f64)).collect()
}
