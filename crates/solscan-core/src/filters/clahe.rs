//! Contrast-limited adaptive histogram equalization for 16-bit images.
//!
//! Follows the OpenCV formulation: the image is split into a grid of tiles
//! (padded by reflection when the size does not divide evenly), each tile
//! histogram is clipped at `clip_limit * tile_area / bins` with the excess
//! spread uniformly, and every pixel is bilinearly interpolated between the
//! lookup tables of the four nearest tile centres.

use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;

use crate::consts::{MAX_SAMPLE, PARALLEL_PIXEL_THRESHOLD};

use super::box_blur::reflect_101;

const BINS: usize = 1 << 16;

/// Equalize `data` with a `(tiles_x, tiles_y)` grid.
pub fn clahe(data: ArrayView2<u16>, clip_limit: f64, tiles: (usize, usize)) -> Array2<u16> {
    let (h, w) = data.dim();
    let (tiles_x, tiles_y) = (tiles.0.max(1), tiles.1.max(1));
    if h == 0 || w == 0 {
        return data.to_owned();
    }
    let tile_w = w.div_ceil(tiles_x);
    let tile_h = h.div_ceil(tiles_y);
    let tile_area = tile_w * tile_h;

    let limit = ((clip_limit * tile_area as f64 / BINS as f64) as u64).max(1);
    let lut_scale = (BINS - 1) as f64 / tile_area as f64;

    let luts: Vec<Vec<u16>> = (0..tiles_y * tiles_x)
        .into_par_iter()
        .map(|t| {
            let (ty, tx) = (t / tiles_x, t % tiles_x);
            let mut hist = vec![0u64; BINS];
            for y in ty * tile_h..(ty + 1) * tile_h {
                let sy = reflect_101(y as isize, h);
                for x in tx * tile_w..(tx + 1) * tile_w {
                    hist[data[[sy, reflect_101(x as isize, w)]] as usize] += 1;
                }
            }
            clip_histogram(&mut hist, limit);
            build_lut(&hist, lut_scale)
        })
        .collect();

    let interpolate_row = |y: usize| -> Vec<u16> {
        let tyf = y as f64 / tile_h as f64 - 0.5;
        let ty1 = tyf.floor();
        let ya = tyf - ty1;
        let ty2 = ((ty1 + 1.0) as usize).min(tiles_y - 1);
        let ty1 = ty1.max(0.0) as usize;
        (0..w)
            .map(|x| {
                let txf = x as f64 / tile_w as f64 - 0.5;
                let tx1 = txf.floor();
                let xa = txf - tx1;
                let tx2 = ((tx1 + 1.0) as usize).min(tiles_x - 1);
                let tx1 = tx1.max(0.0) as usize;
                let v = data[[y, x]] as usize;
                let lut = |ty: usize, tx: usize| luts[ty * tiles_x + tx][v] as f64;
                let top = lut(ty1, tx1) * (1.0 - xa) + lut(ty1, tx2) * xa;
                let bottom = lut(ty2, tx1) * (1.0 - xa) + lut(ty2, tx2) * xa;
                (top * (1.0 - ya) + bottom * ya)
                    .round()
                    .clamp(0.0, MAX_SAMPLE as f64) as u16
            })
            .collect()
    };

    let rows: Vec<Vec<u16>> = if h * w >= PARALLEL_PIXEL_THRESHOLD {
        (0..h).into_par_iter().map(interpolate_row).collect()
    } else {
        (0..h).map(interpolate_row).collect()
    };
    Array2::from_shape_fn((h, w), |(y, x)| rows[y][x])
}

fn clip_histogram(hist: &mut [u64], limit: u64) {
    let mut excess = 0u64;
    for count in hist.iter_mut() {
        if *count > limit {
            excess += *count - limit;
            *count = limit;
        }
    }

    let batch = excess / BINS as u64;
    let mut residual = excess - batch * BINS as u64;
    for count in hist.iter_mut() {
        *count += batch;
    }
    if residual > 0 {
        let step = (BINS as u64 / residual).max(1) as usize;
        for count in hist.iter_mut().step_by(step) {
            if residual == 0 {
                break;
            }
            *count += 1;
            residual -= 1;
        }
    }
}

fn build_lut(hist: &[u64], scale: f64) -> Vec<u16> {
    let mut sum = 0u64;
    hist.iter()
        .map(|&count| {
            sum += count;
            (sum as f64 * scale).round().clamp(0.0, MAX_SAMPLE as f64) as u16
        })
        .collect()
}
