use std::io::Write;

use ndarray::Array2;

use solscan_core::error::{Result, SolscanError};
use solscan_core::frame::{ContainerKind, Frame, VideoInfo};
use solscan_core::io::ser::{SerHeader, SER_HEADER_SIZE};
use solscan_core::io::ser_writer::SerWriter;
use solscan_core::io::FrameSource;

/// Build the 178-byte header of a mono SER file.
///
/// Append frame bytes after calling this function.
pub fn build_ser_header(width: u32, height: u32, bit_depth: u32, num_frames: usize) -> Vec<u8> {
    build_ser_header_full(width, height, bit_depth, num_frames, 0)
}

/// Build a SER header with a configurable color id (0 = mono, 100 = RGB).
pub fn build_ser_header_full(
    width: u32,
    height: u32,
    bit_depth: u32,
    num_frames: usize,
    color_id: u32,
) -> Vec<u8> {
    let mut buf = Vec::with_capacity(SER_HEADER_SIZE);

    // Magic (14 bytes)
    buf.extend_from_slice(b"LUCAM-RECORDER");
    // LuID, ColorID, LittleEndian
    buf.extend_from_slice(&0u32.to_le_bytes());
    buf.extend_from_slice(&color_id.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes());
    // Width, Height, PixelDepth, FrameCount
    buf.extend_from_slice(&width.to_le_bytes());
    buf.extend_from_slice(&height.to_le_bytes());
    buf.extend_from_slice(&bit_depth.to_le_bytes());
    buf.extend_from_slice(&(num_frames as u32).to_le_bytes());
    // Observer (40 bytes)
    let mut observer = [0u8; 40];
    observer[..6].copy_from_slice(b"Tester");
    buf.extend_from_slice(&observer);
    // Instrument (40 bytes)
    let mut instrument = [0u8; 40];
    instrument[..7].copy_from_slice(b"Sol'Ex ");
    buf.extend_from_slice(&instrument);
    // Telescope (40 bytes)
    buf.extend_from_slice(&[0u8; 40]);
    // DateTime, DateTimeUTC
    buf.extend_from_slice(&638_000_000_000_000_000u64.to_le_bytes());
    buf.extend_from_slice(&638_000_000_000_000_001u64.to_le_bytes());

    assert_eq!(buf.len(), SER_HEADER_SIZE);
    buf
}

/// Write raw bytes to a temporary file with the given suffix (e.g. ".ser").
///
/// The file stays alive as long as the returned `NamedTempFile` is not dropped.
pub fn write_temp(data: &[u8], suffix: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("create temp file");
    f.write_all(data).expect("write data");
    f.flush().expect("flush");
    f
}

/// Write `frames` (stored orientation) as a mono SER file.
pub fn write_ser(frames: &[Array2<u16>], bit_depth: u32) -> tempfile::NamedTempFile {
    let (h, w) = frames.first().map(|f| f.dim()).unwrap_or((1, 1));
    let header = SerHeader::mono(w as u32, h as u32, bit_depth, frames.len() as u32);
    let file = tempfile::Builder::new()
        .suffix(".ser")
        .tempfile()
        .expect("create temp file");
    let mut writer = SerWriter::new(file.reopen().expect("reopen"), &header).expect("header");
    for frame in frames {
        writer.write_frame(frame.view()).expect("write frame");
    }
    writer.finalize().expect("flush");
    file
}

pub const SCAN_SIZE: usize = 64;
pub const SCAN_FRAMES: usize = 100;
pub const SCAN_RADIUS: f64 = 20.0;
pub const SCAN_LINE: usize = 32;
pub const DISK_LEVEL: u16 = 40_000;
pub const LINE_LEVEL: u16 = 20_000;
pub const SKY_LEVEL: u16 = 500;
pub const SKY_LINE_LEVEL: u16 = 200;

/// One frame of a synthetic scan across a disk centred at row 32, frame 50.
///
/// Rows inside the disk are bright with a darker absorption line at
/// [`SCAN_LINE`]; the sky is dark with a fainter line.
pub fn scan_frame(t: usize) -> Array2<u16> {
    let cy = SCAN_SIZE as f64 / 2.0;
    let ct = SCAN_FRAMES as f64 / 2.0;
    Array2::from_shape_fn((SCAN_SIZE, SCAN_SIZE), |(y, x)| {
        let dy = y as f64 - cy;
        let dt = t as f64 - ct;
        let inside = dy * dy + dt * dt <= SCAN_RADIUS * SCAN_RADIUS;
        match (inside, x == SCAN_LINE) {
            (true, true) => LINE_LEVEL,
            (true, false) => DISK_LEVEL,
            (false, true) => SKY_LINE_LEVEL,
            (false, false) => SKY_LEVEL,
        }
    })
}

/// The full 100-frame, 64x64, 16-bit scan.
pub fn write_scan_ser() -> tempfile::NamedTempFile {
    let frames: Vec<Array2<u16>> = (0..SCAN_FRAMES).map(scan_frame).collect();
    write_ser(&frames, 16)
}

/// In-memory frame source.
pub struct VecSource {
    info: VideoInfo,
    frames: Vec<Array2<u16>>,
    next: usize,
}

impl VecSource {
    pub fn new(frames: Vec<Array2<u16>>) -> Self {
        let (h, w) = frames.first().map(|f| f.dim()).unwrap_or((0, 0));
        let info = VideoInfo {
            filename: "memory".into(),
            kind: ContainerKind::Ser,
            width: w,
            height: h,
            stored_width: w,
            stored_height: h,
            bit_depth: 16,
            frame_count: frames.len(),
            little_endian: false,
            rotated: false,
            observer: None,
            instrument: None,
            telescope: None,
        };
        Self {
            info,
            frames,
            next: 0,
        }
    }
}

impl FrameSource for VecSource {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn has_next(&self) -> bool {
        self.next < self.frames.len()
    }

    fn next_frame(&mut self) -> Result<Frame> {
        let data = self
            .frames
            .get(self.next)
            .cloned()
            .ok_or_else(|| SolscanError::Decode("past the last frame".into()))?;
        let frame = Frame::new(data, self.next);
        self.next += 1;
        Ok(frame)
    }
}
