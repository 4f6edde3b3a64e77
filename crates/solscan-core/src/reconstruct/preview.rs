use std::ops::ControlFlow;

use ndarray::ArrayView2;

use crate::frame::Frame;

/// Receives the in-progress disk and the current frame at a fixed cadence.
///
/// Returning `ControlFlow::Break(())` aborts the whole reconstruction; it
/// cannot be resumed.
pub trait PreviewObserver {
    fn preview(&mut self, disk: ArrayView2<u16>, frame: &Frame) -> ControlFlow<()>;
}

impl<F> PreviewObserver for F
where
    F: FnMut(ArrayView2<u16>, &Frame) -> ControlFlow<()>,
{
    fn preview(&mut self, disk: ArrayView2<u16>, frame: &Frame) -> ControlFlow<()> {
        self(disk, frame)
    }
}

/// Observer that never looks and never cancels.
pub struct NoPreview;

impl PreviewObserver for NoPreview {
    fn preview(&mut self, _disk: ArrayView2<u16>, _frame: &Frame) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}
