use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use ndarray::ArrayView2;

use crate::error::{Result, SolscanError};
use crate::io::ser::{SerHeader, SER_HEADER_SIZE, SER_MAGIC, SER_STRING_FIELD};

/// Writes a mono SER file at the raw byte level.
pub struct SerWriter<W: Write> {
    writer: W,
    header: SerHeader,
    frames_written: u32,
}

impl SerWriter<BufWriter<File>> {
    /// Create a new SER file and write the header.
    pub fn create(path: &Path, header: &SerHeader) -> Result<Self> {
        let file = File::create(path)?;
        Self::new(BufWriter::new(file), header)
    }
}

impl<W: Write> SerWriter<W> {
    /// Wrap any byte sink; the header is written immediately.
    pub fn new(mut writer: W, header: &SerHeader) -> Result<Self> {
        write_header(&mut writer, header)?;
        Ok(Self {
            writer,
            header: header.clone(),
            frames_written: 0,
        })
    }

    /// Write a single raw frame (bytes must match the header's frame_byte_size).
    pub fn write_raw_frame(&mut self, data: &[u8]) -> Result<()> {
        if data.len() != self.header.frame_byte_size()? {
            return Err(SolscanError::InvalidDimensions {
                width: self.header.width,
                height: self.header.height,
            });
        }
        self.writer.write_all(data)?;
        self.frames_written += 1;
        Ok(())
    }

    /// Write a frame in stored orientation. 8-bit files keep the high byte.
    pub fn write_frame(&mut self, data: ArrayView2<u16>) -> Result<()> {
        let (h, w) = data.dim();
        if h != self.header.height as usize || w != self.header.width as usize {
            return Err(SolscanError::InvalidDimensions {
                width: w as u32,
                height: h as u32,
            });
        }
        let mut raw = Vec::with_capacity(self.header.frame_byte_size()?);
        if self.header.bytes_per_sample() == 1 {
            raw.extend(data.iter().map(|&v| (v >> 8) as u8));
        } else {
            for &v in data.iter() {
                raw.extend_from_slice(&v.to_le_bytes());
            }
        }
        self.write_raw_frame(&raw)
    }

    pub fn frames_written(&self) -> u32 {
        self.frames_written
    }

    /// Write the optional timestamp trailer (one u64 per frame, little-endian).
    pub fn write_timestamps(&mut self, timestamps: &[u64]) -> Result<()> {
        for &ts in timestamps {
            self.writer.write_all(&ts.to_le_bytes())?;
        }
        Ok(())
    }

    /// Flush and hand back the underlying sink.
    pub fn finalize(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

fn write_header(w: &mut impl Write, header: &SerHeader) -> Result<()> {
    w.write_all(SER_MAGIC)?;
    for field in [
        header.lu_id,
        header.color_id,
        header.little_endian_flag,
        header.width,
        header.height,
        header.pixel_depth,
        header.frame_count,
    ] {
        w.write_all(&field.to_le_bytes())?;
    }
    write_fixed_string(w, &header.observer)?;
    write_fixed_string(w, &header.instrument)?;
    write_fixed_string(w, &header.telescope)?;
    w.write_all(&header.date_time.to_le_bytes())?;
    w.write_all(&header.date_time_utc.to_le_bytes())?;

    debug_assert_eq!(14 + 7 * 4 + 3 * SER_STRING_FIELD + 2 * 8, SER_HEADER_SIZE);
    Ok(())
}

fn write_fixed_string(w: &mut impl Write, s: &str) -> Result<()> {
    let mut field = [0u8; SER_STRING_FIELD];
    let bytes = s.as_bytes();
    let n = bytes.len().min(SER_STRING_FIELD);
    field[..n].copy_from_slice(&bytes[..n]);
    w.write_all(&field)?;
    Ok(())
}
