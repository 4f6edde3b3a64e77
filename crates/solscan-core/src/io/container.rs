use std::path::Path;

use crate::error::{Result, SolscanError};
use crate::frame::{Frame, VideoInfo};

use super::ser::SerReader;
use super::video::VideoReader;

/// Extensions decoded through the generic video path.
pub const VIDEO_EXTENSIONS: &[&str] = &["avi", "mp4", "mov", "mkv"];

/// Forward-only source of orientation-normalized 16-bit frames.
pub trait FrameSource {
    fn info(&self) -> &VideoInfo;

    fn has_next(&self) -> bool;

    /// Decode the next frame. Fails past the last frame or on short data.
    fn next_frame(&mut self) -> Result<Frame>;

    fn frame_count(&self) -> usize {
        self.info().frame_count
    }

    /// Logical width (wavelength axis).
    fn width(&self) -> usize {
        self.info().width
    }

    /// Logical height (slit axis).
    fn height(&self) -> usize {
        self.info().height
    }
}

/// An opened video of either supported family.
pub enum ContainerReader {
    Ser(SerReader),
    Video(VideoReader),
}

impl ContainerReader {
    /// Open `path`, choosing the decoder from its extension.
    ///
    /// Rewinding is done by calling `open` again.
    pub fn open(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        if ext == "ser" {
            Ok(Self::Ser(SerReader::open(path)?))
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Ok(Self::Video(VideoReader::open(path)?))
        } else {
            Err(SolscanError::Format(format!(
                "{} is neither SER nor a supported video ({})",
                path.display(),
                VIDEO_EXTENSIONS.join(", ")
            )))
        }
    }
}

impl FrameSource for ContainerReader {
    fn info(&self) -> &VideoInfo {
        match self {
            Self::Ser(r) => r.info(),
            Self::Video(r) => r.info(),
        }
    }

    fn has_next(&self) -> bool {
        match self {
            Self::Ser(r) => r.has_next(),
            Self::Video(r) => r.has_next(),
        }
    }

    fn next_frame(&mut self) -> Result<Frame> {
        match self {
            Self::Ser(r) => r.next_frame(),
            Self::Video(r) => r.next_frame(),
        }
    }
}
