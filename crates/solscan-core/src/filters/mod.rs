pub mod box_blur;
pub mod clahe;
pub mod geometry;
pub mod histogram;
