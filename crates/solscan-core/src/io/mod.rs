pub mod container;
pub mod fits;
pub mod image_io;
pub mod ser;
pub mod ser_writer;
pub mod video;

pub use container::{ContainerReader, FrameSource};
