//! Generic compressed video input through the system `ffmpeg` tools.
//!
//! `ffprobe` supplies dimensions and the frame count; `ffmpeg` decodes the
//! first video stream to raw 8-bit luma frames streamed over a pipe. Both
//! binaries must be on `PATH`. If they are missing, opening fails with a
//! structured error; there is no fallback decoder.

use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

use ndarray::Array2;
use tracing::debug;

use crate::consts::EIGHT_BIT_UPSCALE;
use crate::error::{Result, SolscanError};
use crate::filters::geometry::rotate_quarter_turns;
use crate::frame::{ContainerKind, Frame, VideoInfo};

use super::container::FrameSource;

/// Stream dimensions reported by `ffprobe`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProbeResult {
    pub width: usize,
    pub height: usize,
    pub frame_count: usize,
}

/// Sequential luma reader backed by an `ffmpeg` child process.
pub struct VideoReader {
    child: Child,
    stdout: BufReader<ChildStdout>,
    info: VideoInfo,
    buf: Vec<u8>,
    next_index: usize,
}

impl VideoReader {
    pub fn open(path: &Path) -> Result<Self> {
        let probe = probe(path)?;
        if probe.width == 0 || probe.height == 0 {
            return Err(SolscanError::InvalidDimensions {
                width: probe.width as u32,
                height: probe.height as u32,
            });
        }

        let mut child = Command::new("ffmpeg")
            .arg("-v")
            .arg("error")
            .arg("-nostdin")
            .arg("-i")
            .arg(path)
            .args(["-map", "0:v:0", "-f", "rawvideo", "-pix_fmt", "gray", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| tool_error("ffmpeg", e))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SolscanError::Decode("ffmpeg stdout not captured".into()))?;

        let rotated = probe.width > probe.height;
        let (width, height) = if rotated {
            (probe.height, probe.width)
        } else {
            (probe.width, probe.height)
        };
        debug!(
            width = probe.width,
            height = probe.height,
            frames = probe.frame_count,
            "Opened video through ffmpeg"
        );

        Ok(Self {
            child,
            stdout: BufReader::new(stdout),
            info: VideoInfo {
                filename: path.to_path_buf(),
                kind: ContainerKind::Video,
                width,
                height,
                stored_width: probe.width,
                stored_height: probe.height,
                bit_depth: 8,
                frame_count: probe.frame_count,
                little_endian: true,
                rotated,
                observer: None,
                instrument: None,
                telescope: None,
            },
            buf: vec![0u8; probe.width * probe.height],
            next_index: 0,
        })
    }
}

impl FrameSource for VideoReader {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn has_next(&self) -> bool {
        self.next_index < self.info.frame_count
    }

    fn next_frame(&mut self) -> Result<Frame> {
        let index = self.next_index;
        if index >= self.info.frame_count {
            return Err(SolscanError::Decode(format!(
                "frame {index} requested but the video holds {}",
                self.info.frame_count
            )));
        }
        self.stdout.read_exact(&mut self.buf).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => {
                SolscanError::Decode(format!("video stream ended before frame {index}"))
            }
            _ => SolscanError::Io(e),
        })?;

        let (w, h) = (self.info.stored_width, self.info.stored_height);
        let buf = &self.buf;
        let stored = Array2::from_shape_fn((h, w), |(row, col)| {
            buf[row * w + col] as u16 * EIGHT_BIT_UPSCALE
        });
        let data = if self.info.rotated {
            rotate_quarter_turns(stored.view(), 1)
        } else {
            stored
        };
        self.next_index += 1;
        Ok(Frame::new(data, index))
    }
}

impl Drop for VideoReader {
    fn drop(&mut self) {
        // The decoder may still be producing frames nobody will read.
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Query stream dimensions and packet count of the first video stream.
pub fn probe(path: &Path) -> Result<ProbeResult> {
    let output = Command::new("ffprobe")
        .args(["-v", "error", "-select_streams", "v:0", "-count_packets"])
        .args([
            "-show_entries",
            "stream=width,height,nb_read_packets",
            "-of",
            "default=noprint_wrappers=1",
        ])
        .arg(path)
        .output()
        .map_err(|e| tool_error("ffprobe", e))?;

    if !output.status.success() {
        return Err(SolscanError::Decode(format!(
            "ffprobe failed on {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    parse_probe_output(&String::from_utf8_lossy(&output.stdout))
}

/// Parse `key=value` lines as printed by `ffprobe -of default=noprint_wrappers=1`.
pub fn parse_probe_output(text: &str) -> Result<ProbeResult> {
    let mut width = None;
    let mut height = None;
    let mut frames = None;
    for line in text.lines() {
        let Some((key, value)) = line.trim().split_once('=') else {
            continue;
        };
        let parsed = value.trim().parse::<usize>().ok();
        match key.trim() {
            "width" => width = parsed,
            "height" => height = parsed,
            "nb_read_packets" => frames = parsed,
            _ => {}
        }
    }
    match (width, height, frames) {
        (Some(width), Some(height), Some(frame_count)) => Ok(ProbeResult {
            width,
            height,
            frame_count,
        }),
        _ => Err(SolscanError::Decode(format!(
            "incomplete ffprobe output: {text:?}"
        ))),
    }
}

fn tool_error(tool: &str, e: std::io::Error) -> SolscanError {
    if e.kind() == ErrorKind::NotFound {
        SolscanError::Decode(format!("`{tool}` not found on PATH"))
    } else {
        SolscanError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_probe_lines() {
        let text = "width=640\nheight=480\nnb_read_packets=120\n";
        let probe = parse_probe_output(text).unwrap();
        assert_eq!(
            probe,
            ProbeResult {
                width: 640,
                height: 480,
                frame_count: 120
            }
        );
    }

    #[test]
    fn rejects_missing_frame_count() {
        assert!(parse_probe_output("width=640\nheight=480\nnb_read_packets=N/A\n").is_err());
    }
}
