use thiserror::Error;

#[derive(Error, Debug)]
pub enum SolscanError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported container: {0}")]
    Format(String),

    #[error("Frame decode failed: {0}")]
    Decode(String),

    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("Video contains no frames")]
    EmptyVideo,

    #[error("Degenerate fit: {0}")]
    FitDegenerate(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Reconstruction incomplete: {filled} of {expected} columns written")]
    IncompleteReconstruction { filled: usize, expected: usize },

    #[error("Reconstruction cancelled at frame {0}")]
    Cancelled(usize),

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("FITS error: {0}")]
    Fits(#[from] fitsio::errors::Error),
}

pub type Result<T> = std::result::Result<T, SolscanError>;
