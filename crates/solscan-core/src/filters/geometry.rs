use ndarray::{s, Array2, ArrayView2};

use crate::frame::CircleFit;

/// Rotate by `k` quarter turns counter-clockwise (negative `k` turns clockwise).
///
/// One turn maps `out[i][j] = in[j][w-1-i]`, so a `(h, w)` input becomes `(w, h)`.
pub fn rotate_quarter_turns(data: ArrayView2<u16>, k: i32) -> Array2<u16> {
    match k.rem_euclid(4) {
        0 => data.to_owned(),
        1 => data.t().slice(s![..;-1, ..]).to_owned(),
        2 => data.slice(s![..;-1, ..;-1]).to_owned(),
        _ => data.t().slice(s![.., ..;-1]).to_owned(),
    }
}

/// Mirror left to right.
pub fn flip_horizontal(data: ArrayView2<u16>) -> Array2<u16> {
    data.slice(s![.., ..;-1]).to_owned()
}

/// Crop the width to the height, centred on `center_x` and kept inside the image.
///
/// Returns the cropped image and the first retained column. Images that are
/// already narrower than they are tall come back unchanged.
pub fn crop_width_square(data: ArrayView2<u16>, center_x: f64) -> (Array2<u16>, usize) {
    let (h, w) = data.dim();
    if w <= h {
        return (data.to_owned(), 0);
    }
    let half = h as f64 / 2.0;
    let start = (center_x - half).round().clamp(0.0, (w - h) as f64) as usize;
    (data.slice(s![.., start..start + h]).to_owned(), start)
}

/// Paint a filled disk of `radius` pixels around the circle centre.
pub fn fill_disk(data: &mut Array2<u16>, circle: &CircleFit, radius: i64, value: u16) {
    if circle.is_none() || radius <= 0 {
        return;
    }
    let x0 = circle.cx as i64;
    let y0 = circle.cy as i64;
    let r2 = radius * radius;
    let (h, w) = data.dim();
    let rows = (y0 - radius).max(0)..=(y0 + radius).min(h as i64 - 1);
    for y in rows {
        let dy = y - y0;
        for x in (x0 - radius).max(0)..=(x0 + radius).min(w as i64 - 1) {
            let dx = x - x0;
            if dx * dx + dy * dy <= r2 {
                data[[y as usize, x as usize]] = value;
            }
        }
    }
}
