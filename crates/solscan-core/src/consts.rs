/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Largest representable sample value; every 16-bit computation saturates here.
pub const MAX_SAMPLE: u16 = u16::MAX;

/// Factor applied to 8-bit samples to bring them onto the 16-bit scale.
pub const EIGHT_BIT_UPSCALE: u16 = 256;

/// Side length of the box filter applied before border detection.
pub const BORDER_BLUR_SIZE: usize = 5;

/// Border threshold is the median of the row/column profile divided by this.
pub const BORDER_THRESHOLD_DIVISOR: f64 = 5.0;

/// Rows trimmed inside each detected disk border before line fitting.
pub const BORDER_MARGIN: usize = 10;

/// Degree of the spectral line polynomial.
pub const LINE_FIT_DEGREE: usize = 3;

/// Live preview is surfaced every this many frames.
pub const PREVIEW_INTERVAL: usize = 10;

/// Doppler deviations are stored relative to this value, saturating at both ends.
pub const DOPPLER_BIAS: f64 = 65535.0;

/// Default Savitzky-Golay window for transversalium correction.
pub const DEFAULT_TRANSVERSALIUM_STRENGTH: usize = 301;

/// Polynomial order of the transversalium smoothing filter.
pub const SAVGOL_ORDER: usize = 3;

/// Total fraction of the profile covered by the Tukey taper (both ends).
pub const TUKEY_TAPER_FRACTION: f64 = 0.05;

/// Lower percentile of the standard stretch.
pub const STRETCH_LOW_PERCENTILE: f64 = 25.0;

/// Upper percentile shared by all stretches.
pub const STRETCH_HIGH_PERCENTILE: f64 = 99.9999;

/// High-contrast stretch black point, as a fraction of the upper threshold.
pub const HIGH_CONTRAST_LOW_FRACTION: f64 = 0.25;

/// Prominence stretch white point, as a fraction of the upper threshold.
pub const PROMINENCE_HIGH_FRACTION: f64 = 0.18;

/// Upper threshold scale applied to the CLAHE rendition.
pub const CLAHE_HIGH_SCALE: f64 = 1.05;

/// CLAHE clip limit (OpenCV convention).
pub const CLAHE_CLIP_LIMIT: f64 = 0.8;

/// CLAHE tile grid (columns, rows).
pub const CLAHE_TILE_GRID: (usize, usize) = (2, 2);

/// Sample value painted over the disk in the prominence rendition.
pub const DISK_MASK_VALUE: u16 = 80;

/// Offset subtracted from the inverted doppler rendition.
pub const DOPPLER_SHIFTED_OFFSET: u16 = 30_000;
