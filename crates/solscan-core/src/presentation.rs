use ndarray::{Array2, ArrayView2};

use crate::consts::{
    CLAHE_CLIP_LIMIT, CLAHE_HIGH_SCALE, CLAHE_TILE_GRID, DISK_MASK_VALUE, DOPPLER_SHIFTED_OFFSET,
    HIGH_CONTRAST_LOW_FRACTION, MAX_SAMPLE, PROMINENCE_HIGH_FRACTION, STRETCH_HIGH_PERCENTILE,
    STRETCH_LOW_PERCENTILE,
};
use crate::filters::clahe::clahe;
use crate::filters::geometry::{fill_disk, rotate_quarter_turns};
use crate::filters::histogram::{percentile_u16, stretch};
use crate::frame::CircleFit;
use crate::pipeline::log::ProcessingLog;

/// Display settings shared by every rendition.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PresentationSettings {
    /// Degrees counter-clockwise; a multiple of 90.
    pub rotation: u32,
    /// Paint the disk dark in the prominence rendition.
    pub disk_mask: bool,
    /// Added to the circle radius before masking.
    pub delta_radius: i64,
}

impl Default for PresentationSettings {
    fn default() -> Self {
        Self {
            rotation: 0,
            disk_mask: true,
            delta_radius: 0,
        }
    }
}

impl PresentationSettings {
    fn quarter_turns(&self) -> i32 {
        (self.rotation / 90) as i32
    }
}

/// Black and white points of one linear stretch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StretchLevels {
    pub low: f64,
    pub high: f64,
}

impl StretchLevels {
    fn apply(&self, data: ArrayView2<u16>) -> Array2<u16> {
        stretch(data, self.low, self.high)
    }
}

/// Display renditions of an intensity disk.
#[derive(Clone, Debug)]
pub struct IntensityRenditions {
    /// `[p25, p99.9999]`.
    pub standard: Array2<u16>,
    /// `[0.25 * p99.9999, p99.9999]`.
    pub high_contrast: Array2<u16>,
    /// `[0, 0.18 * p99.9999]` with the disk optionally masked.
    pub prominence: Array2<u16>,
    /// Stretched CLAHE rendition.
    pub clahe: Array2<u16>,
    /// Unstretched, unrotated CLAHE output, as saved to FITS.
    pub clahe_raw: Array2<u16>,
    pub levels: Vec<(&'static str, StretchLevels)>,
}

/// Build the standard, high-contrast, prominence and CLAHE renditions.
pub fn render_intensity(
    disk: ArrayView2<u16>,
    circle: &CircleFit,
    settings: &PresentationSettings,
    log: &mut ProcessingLog,
) -> IntensityRenditions {
    let turns = settings.quarter_turns();
    let p_low = percentile_u16(disk, STRETCH_LOW_PERCENTILE);
    let p_high = percentile_u16(disk, STRETCH_HIGH_PERCENTILE);

    let standard = StretchLevels {
        low: p_low,
        high: p_high,
    };
    let high_contrast = StretchLevels {
        low: p_high * HIGH_CONTRAST_LOW_FRACTION,
        high: p_high,
    };
    let prominence = StretchLevels {
        low: 0.0,
        high: p_high * PROMINENCE_HIGH_FRACTION,
    };

    let mut prominence_img = prominence.apply(disk);
    if settings.disk_mask && !circle.is_none() {
        let radius = circle.radius as i64 + settings.delta_radius;
        fill_disk(&mut prominence_img, circle, radius, DISK_MASK_VALUE);
    }

    let clahe_raw = clahe(disk, CLAHE_CLIP_LIMIT, CLAHE_TILE_GRID);
    let clahe_levels = StretchLevels {
        low: percentile_u16(clahe_raw.view(), STRETCH_LOW_PERCENTILE),
        high: percentile_u16(clahe_raw.view(), STRETCH_HIGH_PERCENTILE) * CLAHE_HIGH_SCALE,
    };

    let levels = vec![
        ("standard", standard),
        ("high contrast", high_contrast),
        ("prominence", prominence),
        ("clahe", clahe_levels),
    ];
    for (name, l) in &levels {
        log.line(format!(
            "{name} thresholds: {} .. {}",
            l.low.floor(),
            l.high.floor()
        ));
    }

    IntensityRenditions {
        standard: rotate_quarter_turns(standard.apply(disk).view(), turns),
        high_contrast: rotate_quarter_turns(high_contrast.apply(disk).view(), turns),
        prominence: rotate_quarter_turns(prominence_img.view(), turns),
        clahe: rotate_quarter_turns(clahe_levels.apply(clahe_raw.view()).view(), turns),
        clahe_raw,
        levels,
    }
}

/// Display renditions of a dopplergram.
#[derive(Clone, Debug)]
pub struct DopplerRenditions {
    /// `65535 - v`.
    pub inverted: Array2<u16>,
    /// Inverted, lowered by a fixed offset (saturating at 0).
    pub shifted: Array2<u16>,
}

pub fn render_doppler(disk: ArrayView2<u16>, settings: &PresentationSettings) -> DopplerRenditions {
    let turns = settings.quarter_turns();
    let inverted = disk.mapv(|v| MAX_SAMPLE - v);
    let shifted = inverted.mapv(|v| v.saturating_sub(DOPPLER_SHIFTED_OFFSET));
    DopplerRenditions {
        inverted: rotate_quarter_turns(inverted.view(), turns),
        shifted: rotate_quarter_turns(shifted.view(), turns),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doppler_renditions_saturate() {
        let disk = ndarray::array![[0u16, 65535], [40000, 20000]];
        let r = render_doppler(disk.view(), &PresentationSettings::default());
        assert_eq!(r.inverted, ndarray::array![[65535u16, 0], [25535, 45535]]);
        assert_eq!(r.shifted, ndarray::array![[35535u16, 0], [0, 15535]]);
    }
}
