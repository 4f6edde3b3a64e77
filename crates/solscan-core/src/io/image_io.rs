use std::path::Path;

use image::{ImageBuffer, ImageFormat, Luma};
use ndarray::{Array2, ArrayView2};

use crate::error::{Result, SolscanError};

fn to_buffer(data: ArrayView2<u16>) -> Result<ImageBuffer<Luma<u16>, Vec<u16>>> {
    let (h, w) = data.dim();
    let pixels: Vec<u16> = data.iter().copied().collect();
    ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(w as u32, h as u32, pixels).ok_or(
        SolscanError::InvalidDimensions {
            width: w as u32,
            height: h as u32,
        },
    )
}

/// Save a 16-bit image as grayscale PNG.
pub fn save_png16(data: ArrayView2<u16>, path: &Path) -> Result<()> {
    to_buffer(data)?.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

/// Save a 16-bit image as grayscale TIFF.
pub fn save_tiff16(data: ArrayView2<u16>, path: &Path) -> Result<()> {
    to_buffer(data)?.save_with_format(path, ImageFormat::Tiff)?;
    Ok(())
}

/// Save, choosing the format from the file extension (PNG by default).
pub fn save_image(data: ArrayView2<u16>, path: &Path) -> Result<()> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("tiff" | "tif") => save_tiff16(data, path),
        _ => save_png16(data, path),
    }
}

/// Load any image file as 16-bit grayscale.
pub fn load_image(path: &Path) -> Result<Array2<u16>> {
    let gray = image::open(path)?.to_luma16();
    let (w, h) = gray.dimensions();
    Ok(Array2::from_shape_fn((h as usize, w as usize), |(row, col)| {
        gray.get_pixel(col as u32, row as u32).0[0]
    }))
}
