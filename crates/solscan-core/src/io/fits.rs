use std::path::Path;

use fitsio::images::{ImageDescription, ImageType};
use fitsio::FitsFile;
use ndarray::ArrayView2;

use crate::error::Result;
use crate::frame::VideoInfo;

/// Primary header values for a 16-bit mono image.
///
/// `BITPIX`, `BZERO = 32768` and `BSCALE = 1` follow from the unsigned image
/// type; the remaining keys are written from these fields.
#[derive(Clone, Debug, PartialEq)]
pub struct FitsHeader {
    /// Nominal width; the writer always emits the real data dimensions.
    pub naxis1: usize,
    pub naxis2: usize,
    pub bin1: u32,
    pub bin2: u32,
    pub exptime: f64,
    pub observer: Option<String>,
    pub instrument: Option<String>,
    pub telescope: Option<String>,
}

impl FitsHeader {
    /// Header for images derived from the given video.
    pub fn from_video(info: &VideoInfo) -> Self {
        Self {
            naxis1: info.width,
            naxis2: info.height,
            bin1: 1,
            bin2: 1,
            exptime: 0.0,
            observer: info.observer.clone(),
            instrument: info.instrument.clone(),
            telescope: info.telescope.clone(),
        }
    }
}

/// Write `data` as the primary image of a new FITS file, replacing any
/// existing file. Rows are stored in array order.
pub fn write_fits(path: &Path, data: ArrayView2<u16>, header: &FitsHeader) -> Result<()> {
    let (height, width) = data.dim();
    let dimensions = [height, width];
    let description = ImageDescription {
        data_type: ImageType::UnsignedShort,
        dimensions: &dimensions,
    };

    let mut fptr = FitsFile::create(path)
        .with_custom_primary(&description)
        .overwrite()
        .open()?;
    let hdu = fptr.primary_hdu()?;

    let samples: Vec<u16> = data.iter().copied().collect();
    hdu.write_image(&mut fptr, &samples)?;

    hdu.write_key(&mut fptr, "BIN1", header.bin1 as i64)?;
    hdu.write_key(&mut fptr, "BIN2", header.bin2 as i64)?;
    hdu.write_key(&mut fptr, "EXPTIME", header.exptime)?;
    for (key, value) in [
        ("OBSERVER", &header.observer),
        ("INSTRUME", &header.instrument),
        ("TELESCOP", &header.telescope),
    ] {
        if let Some(v) = value {
            let printable: String = v
                .chars()
                .filter(|c| c.is_ascii() && !c.is_ascii_control())
                .collect();
            hdu.write_key(&mut fptr, key, printable.trim().to_string())?;
        }
    }
    Ok(())
}
