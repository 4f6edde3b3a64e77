use ndarray::Array2;
use std::path::PathBuf;

/// A single decoded spectrum frame.
/// Samples are u16; 8-bit sources are upscaled by 256.
#[derive(Clone, Debug)]
pub struct Frame {
    /// Pixel data, row-major, shape = (height, width). Rows run along the slit.
    pub data: Array2<u16>,
    /// Position of this frame in the scan, starting at 0.
    pub index: usize,
}

impl Frame {
    pub fn new(data: Array2<u16>, index: usize) -> Self {
        Self { data, index }
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }
}

/// Container family of the source video.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContainerKind {
    Ser,
    Video,
}

/// Metadata about an opened video, after orientation normalization.
#[derive(Clone, Debug)]
pub struct VideoInfo {
    pub filename: PathBuf,
    pub kind: ContainerKind,
    /// Logical frame width (wavelength axis).
    pub width: usize,
    /// Logical frame height (slit axis).
    pub height: usize,
    /// Width as stored in the container, before rotation.
    pub stored_width: usize,
    /// Height as stored in the container, before rotation.
    pub stored_height: usize,
    pub bit_depth: u8,
    pub frame_count: usize,
    pub little_endian: bool,
    /// True when frames are rotated 90 degrees on decode.
    pub rotated: bool,
    pub observer: Option<String>,
    pub instrument: Option<String>,
    pub telescope: Option<String>,
}

/// Fitted solar disk circle in image coordinates, or [`CircleFit::NONE`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CircleFit {
    pub cx: f64,
    pub cy: f64,
    pub radius: f64,
}

impl CircleFit {
    /// Sentinel for "no fit available".
    pub const NONE: CircleFit = CircleFit {
        cx: -1.0,
        cy: -1.0,
        radius: -1.0,
    };

    pub fn new(cx: f64, cy: f64, radius: f64) -> Self {
        Self { cx, cy, radius }
    }

    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }
}

impl Default for CircleFit {
    fn default() -> Self {
        Self::NONE
    }
}

/// Valid-data rectangle `[min_x, max_x) x [min_y, max_y)` of a reconstructed image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CropRect {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl CropRect {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// The whole of an image with the given shape `(height, width)`.
    pub fn full(dim: (usize, usize)) -> Self {
        Self::new(0.0, 0.0, dim.1 as f64, dim.0 as f64)
    }
}
