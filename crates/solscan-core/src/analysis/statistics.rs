use ndarray::{Array2, Zip};

use crate::error::{Result, SolscanError};
use crate::frame::Frame;
use crate::io::FrameSource;

/// Pixel-wise mean and maximum over every frame of a video.
#[derive(Clone, Debug)]
pub struct StatisticsImages {
    pub mean: Array2<u16>,
    pub max: Array2<u16>,
    pub frame_count: usize,
}

/// Running sum and maximum; frames are added one at a time and dropped.
pub struct StatisticsAccumulator {
    sum: Array2<u64>,
    max: Array2<u16>,
    count: usize,
}

impl StatisticsAccumulator {
    pub fn new(height: usize, width: usize) -> Self {
        Self {
            sum: Array2::zeros((height, width)),
            max: Array2::zeros((height, width)),
            count: 0,
        }
    }

    pub fn add(&mut self, frame: &Frame) -> Result<()> {
        if frame.data.dim() != self.sum.dim() {
            return Err(SolscanError::InvalidDimensions {
                width: frame.width() as u32,
                height: frame.height() as u32,
            });
        }
        Zip::from(&mut self.sum)
            .and(&mut self.max)
            .and(&frame.data)
            .for_each(|s, m, &v| {
                *s += v as u64;
                *m = (*m).max(v);
            });
        self.count += 1;
        Ok(())
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Divide the sum by the frame count, truncating to 16 bits.
    pub fn finalize(self) -> Result<StatisticsImages> {
        if self.count == 0 {
            return Err(SolscanError::EmptyVideo);
        }
        let n = self.count as u64;
        let mean = self.sum.mapv(|s| (s / n) as u16);
        Ok(StatisticsImages {
            mean,
            max: self.max,
            frame_count: self.count,
        })
    }
}

/// One forward pass over `reader` producing the mean and maximum images.
pub fn compute_mean_max<S: FrameSource + ?Sized>(reader: &mut S) -> Result<StatisticsImages> {
    compute_mean_max_with_progress(reader, |_| {})
}

/// Like [`compute_mean_max`], calling `on_frame` with the number of frames consumed.
pub fn compute_mean_max_with_progress<S, F>(reader: &mut S, mut on_frame: F) -> Result<StatisticsImages>
where
    S: FrameSource + ?Sized,
    F: FnMut(usize),
{
    if reader.frame_count() == 0 {
        return Err(SolscanError::EmptyVideo);
    }
    let mut acc = StatisticsAccumulator::new(reader.height(), reader.width());
    while reader.has_next() {
        let frame = reader.next_frame()?;
        acc.add(&frame)?;
        on_frame(acc.count());
    }
    acc.finalize()
}
