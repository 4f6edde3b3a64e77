use std::ops::ControlFlow;

use ndarray::{Array2, ArrayView2};
use tracing::{debug, info};

use crate::analysis::line_fit::LineFitTable;
use crate::consts::{DOPPLER_BIAS, MAX_SAMPLE, PREVIEW_INTERVAL};
use crate::error::{Result, SolscanError};
use crate::frame::Frame;
use crate::io::FrameSource;

use super::preview::PreviewObserver;

/// What a reconstructed image encodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiskKind {
    /// Interpolated intensity at the line position plus an offset.
    Intensity,
    /// Raw line position minus the reference intensity, biased by [`DOPPLER_BIAS`].
    Doppler,
}

/// Column extraction policy for a pass.
#[derive(Clone, Debug, PartialEq)]
pub enum ExtractionMode {
    /// One image per pixel offset, all from the same decoded frame.
    Intensity { offsets: Vec<i32> },
    /// One differential image against the table shifted by `shift`.
    Doppler { shift: i32 },
}

/// A reconstructed disk: rows follow the slit, columns follow the scan.
#[derive(Clone, Debug)]
pub struct DiskImage {
    pub shift: i32,
    pub kind: DiskKind,
    pub data: Array2<u16>,
}

impl DiskImage {
    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }
}

/// Precomputed interpolation columns and weights for one offset.
#[derive(Clone, Debug)]
struct ColumnSampler {
    left: Vec<usize>,
    left_weight: Vec<f64>,
    right_weight: Vec<f64>,
}

impl ColumnSampler {
    /// `left = clamp(base + shift, 0, width - 2)`; out-of-range offsets saturate.
    ///
    /// `base` is already clamped by the table, so a line position past the
    /// frame edge is offset from the edge column with zero weight.
    fn new(table: &LineFitTable, shift: i32) -> Self {
        let max_left = table.width() as i64 - 2;
        let mut left = Vec::with_capacity(table.len());
        let mut left_weight = Vec::with_capacity(table.len());
        let mut right_weight = Vec::with_capacity(table.len());
        for pos in table.entries() {
            left.push((pos.base as i64 + shift as i64).clamp(0, max_left) as usize);
            left_weight.push(1.0 - pos.weight);
            right_weight.push(pos.weight);
        }
        Self {
            left,
            left_weight,
            right_weight,
        }
    }

    #[inline]
    fn sample(&self, frame: ArrayView2<u16>, y: usize) -> f64 {
        let l = self.left[y];
        self.left_weight[y] * frame[[y, l]] as f64 + self.right_weight[y] * frame[[y, l + 1]] as f64
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconstructionState {
    Init,
    Extracting { columns: usize },
    Done,
}

/// Builds disk images one column per frame in a single forward pass.
pub struct DiskReconstructor {
    kind: DiskKind,
    samplers: Vec<(i32, ColumnSampler)>,
    disks: Vec<Array2<u16>>,
    height: usize,
    width: usize,
    frame_count: usize,
    state: ReconstructionState,
}

impl DiskReconstructor {
    /// Prepare empty `height x frame_count` images for every output.
    ///
    /// In doppler mode `table` is the reference table.
    pub fn new(table: &LineFitTable, mode: &ExtractionMode, frame_count: usize) -> Result<Self> {
        let (kind, shifts) = match mode {
            ExtractionMode::Intensity { offsets } => (DiskKind::Intensity, offsets.clone()),
            ExtractionMode::Doppler { shift } => (DiskKind::Doppler, vec![*shift]),
        };
        if shifts.is_empty() {
            return Err(SolscanError::InvalidConfig(
                "at least one pixel offset is required".into(),
            ));
        }
        if frame_count == 0 {
            return Err(SolscanError::EmptyVideo);
        }

        let height = table.len();
        let samplers: Vec<(i32, ColumnSampler)> = shifts
            .iter()
            .map(|&s| (s, ColumnSampler::new(table, s)))
            .collect();
        let disks = samplers
            .iter()
            .map(|_| Array2::zeros((height, frame_count)))
            .collect();

        Ok(Self {
            kind,
            samplers,
            disks,
            height,
            width: table.width(),
            frame_count,
            state: ReconstructionState::Init,
        })
    }

    pub fn state(&self) -> ReconstructionState {
        self.state
    }

    /// The first output image as it stands.
    pub fn preview_disk(&self) -> ArrayView2<u16> {
        self.disks[0].view()
    }

    /// Extract one column from `frame` into every output.
    ///
    /// Frames must arrive in scan order starting at index 0.
    pub fn accumulate(&mut self, frame: &Frame) -> Result<()> {
        let expected = match self.state {
            ReconstructionState::Init => 0,
            ReconstructionState::Extracting { columns } => columns,
            ReconstructionState::Done => self.frame_count,
        };
        if frame.index != expected || expected >= self.frame_count {
            return Err(SolscanError::Decode(format!(
                "frame {} arrived out of order (expected {expected} of {})",
                frame.index, self.frame_count
            )));
        }
        if frame.data.dim() != (self.height, self.width) {
            return Err(SolscanError::InvalidDimensions {
                width: frame.width() as u32,
                height: frame.height() as u32,
            });
        }

        let t = frame.index;
        let data = frame.data.view();
        match self.kind {
            DiskKind::Intensity => {
                for ((_, sampler), disk) in self.samplers.iter().zip(self.disks.iter_mut()) {
                    let mut column = disk.column_mut(t);
                    for (y, out) in column.iter_mut().enumerate() {
                        *out = sampler.sample(data, y) as u16;
                    }
                }
            }
            DiskKind::Doppler => {
                let (_, sampler) = &self.samplers[0];
                let mut column = self.disks[0].column_mut(t);
                for (y, out) in column.iter_mut().enumerate() {
                    let line = argmin(data.row(y).iter().copied()) as f64;
                    let deviation = line - sampler.sample(data, y);
                    *out = (DOPPLER_BIAS + deviation).clamp(0.0, MAX_SAMPLE as f64) as u16;
                }
            }
        }

        let columns = t + 1;
        self.state = if columns == self.frame_count {
            ReconstructionState::Done
        } else {
            ReconstructionState::Extracting { columns }
        };
        Ok(())
    }

    /// Hand out the images; refuses a pass that did not reach every frame.
    pub fn finish(self) -> Result<Vec<DiskImage>> {
        let filled = match self.state {
            ReconstructionState::Done => self.frame_count,
            ReconstructionState::Extracting { columns } => columns,
            ReconstructionState::Init => 0,
        };
        if filled != self.frame_count {
            return Err(SolscanError::IncompleteReconstruction {
                filled,
                expected: self.frame_count,
            });
        }
        let kind = self.kind;
        Ok(self
            .samplers
            .into_iter()
            .zip(self.disks)
            .map(|((shift, _), data)| DiskImage { shift, kind, data })
            .collect())
    }

    /// Drive a full pass over `reader`.
    ///
    /// Every [`PREVIEW_INTERVAL`]th frame is shown to `observer`, which may
    /// cancel. `on_frame` receives the number of frames consumed so far.
    pub fn run<S, O, F>(mut self, reader: &mut S, observer: &mut O, mut on_frame: F) -> Result<Vec<DiskImage>>
    where
        S: FrameSource + ?Sized,
        O: PreviewObserver + ?Sized,
        F: FnMut(usize),
    {
        info!(
            frames = reader.frame_count(),
            outputs = self.disks.len(),
            kind = ?self.kind,
            "Reconstructing disk"
        );
        while reader.has_next() {
            let frame = reader.next_frame()?;
            self.accumulate(&frame)?;
            on_frame(frame.index + 1);

            if frame.index % PREVIEW_INTERVAL == 0 {
                if let ControlFlow::Break(()) = observer.preview(self.preview_disk(), &frame) {
                    debug!(frame = frame.index, "Reconstruction cancelled by observer");
                    return Err(SolscanError::Cancelled(frame.index));
                }
            }
        }
        self.finish()
    }
}

/// Index of the first minimum.
fn argmin(values: impl Iterator<Item = u16>) -> usize {
    let mut best = (0usize, u16::MAX);
    for (i, v) in values.enumerate() {
        if i == 0 || v < best.1 {
            best = (i, v);
        }
    }
    best.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argmin_takes_first_minimum() {
        assert_eq!(argmin([5u16, 2, 9, 2].into_iter()), 1);
        assert_eq!(argmin([u16::MAX, u16::MAX].into_iter()), 0);
    }

    #[test]
    fn sampler_clamps_offsets() {
        let table = LineFitTable::uniform(3, 10, 4.25).unwrap();
        assert_eq!(ColumnSampler::new(&table, -20).left, vec![0, 0, 0]);
        assert_eq!(ColumnSampler::new(&table, 20).left, vec![8, 8, 8]);
        let s = ColumnSampler::new(&table, 1);
        assert_eq!(s.left, vec![5, 5, 5]);
        assert_eq!(s.right_weight, vec![0.25, 0.25, 0.25]);
    }

    #[test]
    fn offset_applies_after_table_clamp() {
        let table = LineFitTable::from_curve(&[70.5, 30.5], 64).unwrap();
        let s = ColumnSampler::new(&table, -10);
        assert_eq!(s.left, vec![52, 20]);
        assert_eq!(s.right_weight, vec![0.0, 0.5]);
    }
}
