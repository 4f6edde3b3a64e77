pub mod disk;
pub mod preview;

pub use disk::{DiskImage, DiskKind, DiskReconstructor, ExtractionMode, ReconstructionState};
pub use preview::{NoPreview, PreviewObserver};
