use std::fs::File;
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use memmap2::Mmap;
use ndarray::Array2;
use tracing::{debug, warn};

use crate::consts::EIGHT_BIT_UPSCALE;
use crate::error::{Result, SolscanError};
use crate::filters::geometry::rotate_quarter_turns;
use crate::frame::{ContainerKind, Frame, VideoInfo};

use super::container::FrameSource;

pub const SER_HEADER_SIZE: usize = 178;
pub const SER_MAGIC: &[u8; 14] = b"LUCAM-RECORDER";

/// Size of each fixed-width ASCII metadata field.
pub const SER_STRING_FIELD: usize = 40;

/// SER file header (178 bytes).
#[derive(Clone, Debug)]
pub struct SerHeader {
    pub lu_id: u32,
    pub color_id: u32,
    pub little_endian_flag: u32,
    pub width: u32,
    pub height: u32,
    pub pixel_depth: u32,
    pub frame_count: u32,
    pub observer: String,
    pub instrument: String,
    pub telescope: String,
    pub date_time: u64,
    pub date_time_utc: u64,
}

impl SerHeader {
    /// A mono header with empty metadata.
    pub fn mono(width: u32, height: u32, pixel_depth: u32, frame_count: u32) -> Self {
        Self {
            lu_id: 0,
            color_id: 0,
            little_endian_flag: 0,
            width,
            height,
            pixel_depth,
            frame_count,
            observer: String::new(),
            instrument: String::new(),
            telescope: String::new(),
            date_time: 0,
            date_time_utc: 0,
        }
    }

    /// Bytes per sample: 1 for 8-bit data, 2 for anything else.
    pub fn bytes_per_sample(&self) -> usize {
        if self.pixel_depth == 8 {
            1
        } else {
            2
        }
    }

    /// Total bytes per frame.
    pub fn frame_byte_size(&self) -> Result<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|n| n.checked_mul(self.bytes_per_sample()))
            .ok_or_else(|| self.too_large())
    }

    /// Byte offset of frame `index` from the start of the file.
    pub fn frame_offset(&self, index: usize) -> Result<usize> {
        index
            .checked_mul(self.frame_byte_size()?)
            .and_then(|n| n.checked_add(SER_HEADER_SIZE))
            .ok_or_else(|| self.too_large())
    }

    /// End of the frame data block, where the optional timestamp trailer starts.
    pub fn data_end(&self) -> Result<usize> {
        self.frame_offset(self.frame_count as usize)
    }

    fn too_large(&self) -> SolscanError {
        SolscanError::Format(format!(
            "{} frames of {}x{} at {} bits do not fit in memory",
            self.frame_count, self.width, self.height, self.pixel_depth
        ))
    }

    fn is_rgb(&self) -> bool {
        matches!(self.color_id, 100 | 101)
    }
}

/// Memory-mapped, forward-only SER reader.
pub struct SerReader {
    mmap: Mmap,
    pub header: SerHeader,
    info: VideoInfo,
    next_index: usize,
}

impl SerReader {
    /// Open a SER file and parse its header.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        // SAFETY: the map is read-only and lives no longer than the reader.
        let mmap = unsafe { Mmap::map(&file)? };

        if mmap.len() < SER_HEADER_SIZE {
            return Err(SolscanError::Format(format!(
                "{}: file too small for SER header",
                path.display()
            )));
        }

        if &mmap[0..14] != SER_MAGIC {
            return Err(SolscanError::Format(format!(
                "{}: missing LUCAM-RECORDER signature",
                path.display()
            )));
        }

        let header = parse_header(&mmap[..SER_HEADER_SIZE])?;
        if header.is_rgb() {
            return Err(SolscanError::Format(format!(
                "{}: color SER data (color id {}) is not supported",
                path.display(),
                header.color_id
            )));
        }

        let data_end = header.data_end()?;
        if mmap.len() < data_end {
            warn!(
                expected = data_end,
                actual = mmap.len(),
                "SER file shorter than its header declares"
            );
        }

        let stored_w = header.width as usize;
        let stored_h = header.height as usize;
        let rotated = stored_w > stored_h;
        let (width, height) = if rotated {
            (stored_h, stored_w)
        } else {
            (stored_w, stored_h)
        };

        let info = VideoInfo {
            filename: path.to_path_buf(),
            kind: ContainerKind::Ser,
            width,
            height,
            stored_width: stored_w,
            stored_height: stored_h,
            bit_depth: if header.bytes_per_sample() == 1 { 8 } else { 16 },
            frame_count: header.frame_count as usize,
            little_endian: header.little_endian_flag != 0,
            rotated,
            observer: non_empty(&header.observer),
            instrument: non_empty(&header.instrument),
            telescope: non_empty(&header.telescope),
        };
        debug!(
            width = stored_w,
            height = stored_h,
            depth = header.pixel_depth,
            frames = header.frame_count,
            "Opened SER file"
        );

        Ok(Self {
            mmap,
            header,
            info,
            next_index: 0,
        })
    }

    pub fn frame_count(&self) -> usize {
        self.header.frame_count as usize
    }

    /// Total size of the mapped file in bytes.
    pub fn file_len(&self) -> usize {
        self.mmap.len()
    }

    /// Get the raw bytes for a single frame (zero-copy from mmap).
    pub fn frame_raw(&self, index: usize) -> Result<&[u8]> {
        let count = self.frame_count();
        if index >= count {
            return Err(SolscanError::Decode(format!(
                "frame {index} requested but the file holds {count}"
            )));
        }
        let offset = self.header.frame_offset(index)?;
        let end = self.header.frame_offset(index + 1)?;
        if end > self.mmap.len() {
            return Err(SolscanError::Decode(format!(
                "frame {index} truncated: needs bytes {offset}..{end}, file has {}",
                self.mmap.len()
            )));
        }
        Ok(&self.mmap[offset..end])
    }

    /// Decode frame `index` into orientation-normalized 16-bit samples.
    pub fn read_frame(&self, index: usize) -> Result<Frame> {
        let raw = self.frame_raw(index)?;
        let h = self.header.height as usize;
        let w = self.header.width as usize;
        let stored = decode_plane(raw, h, w, self.header.bytes_per_sample());
        let data = if self.info.rotated {
            rotate_quarter_turns(stored.view(), 1)
        } else {
            stored
        };
        Ok(Frame::new(data, index))
    }

    /// Read the per-frame timestamp from the optional trailer.
    pub fn read_timestamp(&self, index: usize) -> Option<u64> {
        let ts_offset = self.header.data_end().ok()?.checked_add(index.checked_mul(8)?)?;
        let ts_end = ts_offset.checked_add(8)?;
        if ts_end <= self.mmap.len() {
            let bytes = &self.mmap[ts_offset..ts_end];
            Some(u64::from_le_bytes(bytes.try_into().ok()?))
        } else {
            None
        }
    }
}

impl FrameSource for SerReader {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn has_next(&self) -> bool {
        self.next_index < self.frame_count()
    }

    fn next_frame(&mut self) -> Result<Frame> {
        let frame = self.read_frame(self.next_index)?;
        self.next_index += 1;
        Ok(frame)
    }
}

fn parse_header(buf: &[u8]) -> Result<SerHeader> {
    let mut cursor = std::io::Cursor::new(&buf[14..]); // skip magic

    let lu_id = cursor.read_u32::<LittleEndian>()?;
    let color_id = cursor.read_u32::<LittleEndian>()?;
    let little_endian_flag = cursor.read_u32::<LittleEndian>()?;
    let width = cursor.read_u32::<LittleEndian>()?;
    let height = cursor.read_u32::<LittleEndian>()?;
    let pixel_depth = cursor.read_u32::<LittleEndian>()?;
    let frame_count = cursor.read_u32::<LittleEndian>()?;

    let observer = read_fixed_string(&buf[42..82]);
    let instrument = read_fixed_string(&buf[82..122]);
    let telescope = read_fixed_string(&buf[122..162]);

    let mut cursor = std::io::Cursor::new(&buf[162..]);
    let date_time = cursor.read_u64::<LittleEndian>()?;
    let date_time_utc = cursor.read_u64::<LittleEndian>()?;

    if width == 0 || height == 0 {
        return Err(SolscanError::InvalidDimensions { width, height });
    }

    Ok(SerHeader {
        lu_id,
        color_id,
        little_endian_flag,
        width,
        height,
        pixel_depth,
        frame_count,
        observer,
        instrument,
        telescope,
        date_time,
        date_time_utc,
    })
}

fn read_fixed_string(buf: &[u8]) -> String {
    String::from_utf8_lossy(buf)
        .trim_end_matches('\0')
        .trim()
        .to_string()
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

// Sample data is always read little-endian; the header flag is informational.
fn decode_plane(raw: &[u8], height: usize, width: usize, bytes_per_sample: usize) -> Array2<u16> {
    if bytes_per_sample == 1 {
        Array2::from_shape_fn((height, width), |(row, col)| {
            raw[row * width + col] as u16 * EIGHT_BIT_UPSCALE
        })
    } else {
        Array2::from_shape_fn((height, width), |(row, col)| {
            let idx = (row * width + col) * 2;
            u16::from_le_bytes([raw[idx], raw[idx + 1]])
        })
    }
}
