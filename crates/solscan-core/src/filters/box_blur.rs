use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;

/// Normalized `size x size` box filter with reflect-101 borders.
pub fn box_blur(data: ArrayView2<u16>, size: usize) -> Array2<f64> {
    let src = data.mapv(|v| v as f64);
    let rows = blur_rows(&src, size);
    blur_rows(&rows.t().to_owned(), size).t().to_owned()
}

/// Mirror an out-of-range index without repeating the edge sample.
pub(crate) fn reflect_101(i: isize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let n = n as isize;
    let mut i = i;
    while i < 0 || i >= n {
        i = if i < 0 { -i } else { 2 * n - 2 - i };
    }
    i as usize
}

fn blur_rows(data: &Array2<f64>, size: usize) -> Array2<f64> {
    let (h, w) = data.dim();
    let radius = (size / 2) as isize;
    let norm = 1.0 / size as f64;

    let blur_row = |row: usize| -> Vec<f64> {
        (0..w)
            .map(|col| {
                let sum: f64 = (-radius..=radius)
                    .map(|k| data[[row, reflect_101(col as isize + k, w)]])
                    .sum();
                sum * norm
            })
            .collect()
    };

    let rows: Vec<Vec<f64>> = if h * w >= PARALLEL_PIXEL_THRESHOLD {
        (0..h).into_par_iter().map(blur_row).collect()
    } else {
        (0..h).map(blur_row).collect()
    };

    Array2::from_shape_fn((h, w), |(row, col)| rows[row][col])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reflect_indices() {
        assert_eq!(reflect_101(-1, 5), 1);
        assert_eq!(reflect_101(-2, 5), 2);
        assert_eq!(reflect_101(5, 5), 3);
        assert_eq!(reflect_101(6, 5), 2);
        assert_eq!(reflect_101(3, 1), 0);
    }

    #[test]
    fn constant_image_is_unchanged() {
        let a = Array2::from_elem((7, 9), 1200u16);
        let b = box_blur(a.view(), 5);
        assert!(b.iter().all(|&v| (v - 1200.0).abs() < 1e-9));
    }
}
