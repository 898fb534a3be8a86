use std::ffi::OsString;
use std::io::{BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{Result, VideoError};
use crate::video::source::{SourceOpener, VideoSource};
use crate::video::types::{Frame, RGB_CHANNELS};

/// Geometry and frame count of the first video stream, as seen by ffprobe
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeInfo {
    pub width: u32,
    pub height: u32,
    pub frame_count: u64,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    nb_frames: Option<String>,
    avg_frame_rate: Option<String>,
    duration: Option<String>,
}

/// Parse `ffprobe -of json` output into [`ProbeInfo`]
///
/// The frame count prefers `nb_frames` and falls back to
/// `duration * avg_frame_rate`; containers that carry neither report 0.
pub fn parse_probe_output(json: &str, path: &str) -> Result<ProbeInfo> {
    let output: ProbeOutput = serde_json::from_str(json).map_err(|e| VideoError::SourceUnavailable {
        path: path.to_string(),
        reason: format!("invalid ffprobe output: {}", e),
    })?;

    let stream = output.streams.into_iter().next().ok_or_else(|| VideoError::SourceUnavailable {
        path: path.to_string(),
        reason: "no video stream found".to_string(),
    })?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => {
            return Err(VideoError::SourceUnavailable {
                path: path.to_string(),
                reason: "video stream has no frame size".to_string(),
            }
            .into())
        }
    };

    let frame_count = stream
        .nb_frames
        .as_deref()
        .and_then(|n| n.parse::<u64>().ok())
        .or_else(|| {
            let duration: f64 = stream.duration.as_deref()?.parse().ok()?;
            let fps = parse_frame_rate(stream.avg_frame_rate.as_deref()?)?;
            Some((duration * fps).round() as u64)
        })
        .unwrap_or(0);

    Ok(ProbeInfo { width, height, frame_count })
}

/// Parse an ffprobe rational such as `30000/1001`
fn parse_frame_rate(rate: &str) -> Option<f64> {
    let (num, den) = rate.split_once('/')?;
    let num: f64 = num.trim().parse().ok()?;
    let den: f64 = den.trim().parse().ok()?;
    if den == 0.0 || num <= 0.0 {
        None
    } else {
        Some(num / den)
    }
}

/// ffmpeg arguments that decode the first video stream of `path` to raw
/// `rgb24` on stdout
///
/// Every decoded frame is emitted exactly once (`-fps_mode passthrough`), and
/// rotation metadata is ignored (`-noautorotate`) so the output keeps the
/// geometry ffprobe reports.
fn decode_args(path: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-v", "error", "-nostdin", "-noautorotate", "-i"]
        .into_iter()
        .map(OsString::from)
        .collect();
    args.push(path.as_os_str().to_os_string());
    args.extend(
        ["-map", "0:v:0", "-fps_mode", "passthrough", "-f", "rawvideo", "-pix_fmt", "rgb24", "-"]
            .into_iter()
            .map(OsString::from),
    );
    args
}

/// Video source that decodes through an `ffmpeg` child process
///
/// The child writes packed `rgb24` frames to its stdout; each
/// [`VideoSource::read_frame`] call pulls exactly one frame off the pipe, so
/// only a single decoded frame is ever resident.
pub struct FfmpegSource {
    identifier: String,
    info: ProbeInfo,
    child: Option<Child>,
    stdout: Option<BufReader<ChildStdout>>,
    frames_read: u64,
}

impl FfmpegSource {
    fn frame_bytes(&self) -> usize {
        self.info.width as usize * self.info.height as usize * RGB_CHANNELS
    }

    /// Reap the child after its stdout hit end of file
    fn finish(&mut self) -> Result<()> {
        self.stdout = None;
        if let Some(mut child) = self.child.take() {
            let status = child.wait()?;
            if !status.success() {
                return Err(VideoError::DecodingFailed {
                    path: self.identifier.clone(),
                    reason: format!("ffmpeg exited with {} after {} frames", status, self.frames_read),
                }
                .into());
            }
        }
        Ok(())
    }
}

/// Fill `buf` from `reader`, returning how many bytes arrived before EOF
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

impl VideoSource for FfmpegSource {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.info.width, self.info.height)
    }

    fn reported_frame_count(&self) -> u64 {
        self.info.frame_count
    }

    fn read_frame(&mut self) -> Result<Option<Frame>> {
        let frame_bytes = self.frame_bytes();
        let Some(reader) = self.stdout.as_mut() else {
            return Ok(None);
        };

        let mut buffer = vec![0u8; frame_bytes];
        let filled = read_full(reader, &mut buffer).map_err(|e| VideoError::DecodingFailed {
            path: self.identifier.clone(),
            reason: e.to_string(),
        })?;

        if filled == 0 {
            debug!("{}: end of stream after {} frames", self.identifier, self.frames_read);
            self.finish()?;
            return Ok(None);
        }

        if filled < frame_bytes {
            if let Err(e) = self.close() {
                warn!("Failed to release decoder for {}: {}", self.identifier, e);
            }
            return Err(VideoError::DecodingFailed {
                path: self.identifier.clone(),
                reason: format!("truncated frame #{} ({} of {} bytes)", self.frames_read, filled, frame_bytes),
            }
            .into());
        }

        let frame = Frame::from_rgb_bytes(self.info.width, self.info.height, buffer).ok_or_else(|| {
            VideoError::DecodingFailed {
                path: self.identifier.clone(),
                reason: "frame buffer size mismatch".to_string(),
            }
        })?;
        self.frames_read += 1;
        Ok(Some(frame))
    }

    fn close(&mut self) -> Result<()> {
        self.stdout = None;
        if let Some(mut child) = self.child.take() {
            // Already-exited children make kill fail; wait still reaps them.
            let _ = child.kill();
            child.wait()?;
            debug!("{}: decoder released", self.identifier);
        }
        Ok(())
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to release decoder for {}: {}", self.identifier, e);
        }
    }
}

/// Opens video files through external `ffprobe`/`ffmpeg` binaries
#[derive(Debug, Clone)]
pub struct FfmpegOpener {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl Default for FfmpegOpener {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

impl FfmpegOpener {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(ffmpeg: P, ffprobe: Q) -> Self {
        Self { ffmpeg: ffmpeg.into(), ffprobe: ffprobe.into() }
    }

    /// Check whether the configured ffmpeg binary can be launched
    pub fn is_available(&self) -> bool {
        Command::new(&self.ffmpeg)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    /// Read geometry and frame count of the first video stream
    pub fn probe(&self, path: &Path) -> Result<ProbeInfo> {
        let path_str = path.display().to_string();
        let output = Command::new(&self.ffprobe)
            .args([
                "-v", "error",
                "-select_streams", "v:0",
                "-show_entries", "stream=width,height,nb_frames,avg_frame_rate,duration",
                "-of", "json",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| VideoError::SourceUnavailable {
                path: path_str.clone(),
                reason: format!("cannot run {}: {}", self.ffprobe.display(), e),
            })?;

        if !output.status.success() {
            return Err(VideoError::SourceUnavailable {
                path: path_str,
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }

        parse_probe_output(&String::from_utf8_lossy(&output.stdout), &path_str)
    }
}

impl SourceOpener for FfmpegOpener {
    fn open(&self, identifier: &str) -> Result<Box<dyn VideoSource>> {
        let path = Path::new(identifier);
        if !path.is_file() {
            return Err(VideoError::SourceUnavailable {
                path: identifier.to_string(),
                reason: "file not found".to_string(),
            }
            .into());
        }

        let info = self.probe(path)?;

        let mut child = Command::new(&self.ffmpeg)
            .args(decode_args(path))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| VideoError::SourceUnavailable {
                path: identifier.to_string(),
                reason: format!("cannot run {}: {}", self.ffmpeg.display(), e),
            })?;

        let stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(VideoError::SourceUnavailable {
                    path: identifier.to_string(),
                    reason: "ffmpeg stdout unavailable".to_string(),
                }
                .into());
            }
        };

        info!("Opened {}: {}x{}, {} frames reported", identifier, info.width, info.height, info.frame_count);

        Ok(Box::new(FfmpegSource {
            identifier: identifier.to_string(),
            info,
            child: Some(child),
            stdout: Some(BufReader::new(stdout)),
            frames_read: 0,
        }))
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}
