use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_TRANSVERSALIUM_STRENGTH;
use crate::error::{Result, SolscanError};
use crate::presentation::PresentationSettings;

/// Options controlling one reconstruction run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconstructionOptions {
    /// Pixel offsets from the fitted line; one disk image per offset.
    pub shifts: Vec<i32>,
    /// Surface in-progress previews to an observer.
    pub display: bool,
    /// Fixed Y/X aspect ratio for the external geometry correction.
    pub ratio_fixed: Option<f64>,
    /// Fixed tilt in degrees for the external geometry correction.
    pub slant_fixed: Option<f64>,
    /// Also write FITS files (mean image, raw disks, CLAHE image).
    pub save_fits: bool,
    /// Only export the final CLAHE rendition.
    pub clahe_only: bool,
    /// Mask the disk in the prominence rendition.
    pub disk_display: bool,
    /// Pixels added to the circle radius before masking.
    pub delta_radius: i64,
    pub crop_width_square: bool,
    pub transversalium: bool,
    /// Savitzky-Golay window of the transversalium correction.
    pub trans_strength: usize,
    /// Degrees counter-clockwise: 0, 90, 180 or 270.
    pub rotation: u32,
    /// Mirror the disk left to right.
    pub flip_x: bool,
    /// Output directory; defaults to the input file's directory.
    pub work_dir: Option<PathBuf>,
    /// Operator line polynomial, ascending coefficients.
    pub poly_fit: Option<Vec<f64>>,
    pub doppler: bool,
}

impl Default for ReconstructionOptions {
    fn default() -> Self {
        Self {
            shifts: vec![0],
            display: false,
            ratio_fixed: None,
            slant_fixed: None,
            save_fits: false,
            clahe_only: false,
            disk_display: true,
            delta_radius: 0,
            crop_width_square: false,
            transversalium: true,
            trans_strength: DEFAULT_TRANSVERSALIUM_STRENGTH,
            rotation: 0,
            flip_x: false,
            work_dir: None,
            poly_fit: None,
            doppler: false,
        }
    }
}

impl ReconstructionOptions {
    pub fn validate(&self) -> Result<()> {
        if self.shifts.is_empty() {
            return Err(SolscanError::InvalidConfig(
                "at least one pixel offset is required".into(),
            ));
        }
        if self.doppler && self.poly_fit.is_none() {
            return Err(SolscanError::InvalidConfig(
                "doppler mode needs a reference polynomial".into(),
            ));
        }
        if let Some(poly) = &self.poly_fit {
            if poly.is_empty() || poly.iter().any(|c| !c.is_finite()) {
                return Err(SolscanError::InvalidConfig(format!(
                    "invalid line polynomial {poly:?}"
                )));
            }
        }
        if !matches!(self.rotation, 0 | 90 | 180 | 270) {
            return Err(SolscanError::InvalidConfig(format!(
                "rotation must be 0, 90, 180 or 270 (got {})",
                self.rotation
            )));
        }
        if self.trans_strength == 0 {
            return Err(SolscanError::InvalidConfig(
                "transversalium strength must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn presentation(&self) -> PresentationSettings {
        PresentationSettings {
            rotation: self.rotation,
            disk_mask: self.disk_display,
            delta_radius: self.delta_radius,
        }
    }
}

/// Parse `"a,b,c"`, `"x:y"` or `"x:y:step"` into a list of offsets.
///
/// Ranges include both ends.
pub fn parse_offsets(text: &str) -> Result<Vec<i32>> {
    let invalid = || SolscanError::InvalidConfig(format!("invalid offset list '{text}'"));
    let int = |s: &str| s.trim().parse::<i32>().map_err(|_| invalid());

    let parts: Vec<&str> = text.split(':').collect();
    let offsets: Vec<i32> = match parts.as_slice() {
        [list] => list
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(int)
            .collect::<Result<_>>()?,
        [start, end] => (int(start)?..=int(end)?).collect(),
        [start, end, step] => {
            let step = int(step)?;
            if step <= 0 {
                return Err(invalid());
            }
            (int(start)?..=int(end)?).step_by(step as usize).collect()
        }
        _ => return Err(invalid()),
    };

    if offsets.is_empty() {
        return Err(invalid());
    }
    Ok(offsets)
}

/// Parse comma-separated ascending polynomial coefficients.
pub fn parse_polynomial(text: &str) -> Result<Vec<f64>> {
    let coeffs = text
        .split(',')
        .map(|s| {
            s.trim()
                .parse::<f64>()
                .map_err(|_| SolscanError::InvalidConfig(format!("invalid coefficient '{s}'")))
        })
        .collect::<Result<Vec<f64>>>()?;
    if coeffs.is_empty() {
        return Err(SolscanError::InvalidConfig("empty polynomial".into()));
    }
    Ok(coeffs)
}
