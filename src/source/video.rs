//! Streaming video decode source bridged over a system `ffmpeg` child.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use crate::foundation::core::{ChannelOrder, Fps, Frame};
use crate::foundation::error::{LustreError, LustreResult};
use crate::source::FrameSource;

/// Probed properties of a video file.
#[derive(Clone, Debug)]
pub struct VideoSourceInfo {
    /// Source file path.
    pub path: PathBuf,
    /// Video width in pixels.
    pub width: u32,
    /// Video height in pixels.
    pub height: u32,
    /// Reported frame rate.
    pub fps: Fps,
    /// Container-reported duration in seconds, 0 when unknown.
    pub duration_sec: f64,
    /// Reported total frame count. Containers that do not carry an exact
    /// count get an estimate from duration and rate, or `None`.
    pub frame_count: Option<u64>,
}

/// Probe a video file with `ffprobe`.
pub fn probe_video(path: &Path) -> LustreResult<VideoSourceInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        r_frame_rate: Option<String>,
        nb_frames: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    let out = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(path)
        .output()
        .map_err(|e| LustreError::media(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(LustreError::media(format!(
            "ffprobe failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| LustreError::media(format!("ffprobe json parse failed: {e}")))?;
    let video_stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| LustreError::media("no video stream found"))?;
    let width = video_stream
        .width
        .ok_or_else(|| LustreError::media("missing video width from ffprobe"))?;
    let height = video_stream
        .height
        .ok_or_else(|| LustreError::media("missing video height from ffprobe"))?;

    let (num, den) = parse_ff_ratio(video_stream.r_frame_rate.as_deref().unwrap_or("0/1"))
        .ok_or_else(|| LustreError::media("invalid video r_frame_rate"))?;
    let fps = Fps::new(num, den)?;

    let duration_sec = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_ref())
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0);

    let frame_count = match video_stream.nb_frames.as_ref().and_then(|s| s.parse::<u64>().ok()) {
        Some(n) if n > 0 => Some(n),
        // Estimated from duration; approximate by nature.
        _ if duration_sec > 0.0 => Some((duration_sec * fps.as_f64()).round() as u64),
        _ => None,
    };

    Ok(VideoSourceInfo {
        path: path.to_path_buf(),
        width,
        height,
        fps,
        duration_sec,
        frame_count,
    })
}

/// Sequential, exhaustible decode source.
///
/// Spawns one long-lived `ffmpeg` child decoding to raw `rgb24` on stdout and
/// reads it frame by frame. A clean EOF on a frame boundary is end-of-stream;
/// a partial frame is a media error.
pub struct VideoSource {
    info: VideoSourceInfo,
    child: Option<Child>,
    stdout: Option<ChildStdout>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,
    frame_len: usize,
}

impl VideoSource {
    /// Probe `path` and start the decode child.
    pub fn open(path: &Path) -> LustreResult<Self> {
        let info = probe_video(path)?;
        Self::from_info(info)
    }

    /// Start the decode child for already probed properties.
    pub fn from_info(info: VideoSourceInfo) -> LustreResult<Self> {
        let frame_len = (info.width as usize)
            .checked_mul(info.height as usize)
            .and_then(|v| v.checked_mul(3))
            .filter(|&v| v > 0)
            .ok_or_else(|| LustreError::media("invalid source dimensions"))?;

        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-i"])
            .arg(&info.path)
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                LustreError::media(format!(
                    "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
                ))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| LustreError::media("failed to open ffmpeg stdout (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| LustreError::media("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut bytes = Vec::new();
            stderr.read_to_end(&mut bytes)?;
            Ok(bytes)
        });

        Ok(Self {
            info,
            child: Some(child),
            stdout: Some(stdout),
            stderr_drain: Some(stderr_drain),
            frame_len,
        })
    }

    /// Borrow the probed source properties.
    pub fn info(&self) -> &VideoSourceInfo {
        &self.info
    }

    /// Reap the child after end-of-stream, surfacing decode errors.
    fn finish(&mut self) -> LustreResult<()> {
        drop(self.stdout.take());
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let status = child
            .wait()
            .map_err(|e| LustreError::media(format!("failed to wait for ffmpeg: {e}")))?;
        let stderr_bytes = match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| LustreError::media("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| LustreError::media(format!("ffmpeg stderr read failed: {e}")))?,
            None => Vec::new(),
        };
        if !status.success() {
            return Err(LustreError::media(format!(
                "ffmpeg decode exited with status {}: {}",
                status,
                String::from_utf8_lossy(&stderr_bytes).trim()
            )));
        }
        Ok(())
    }
}

impl FrameSource for VideoSource {
    fn next_frame(&mut self) -> LustreResult<Option<Frame>> {
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(None);
        };

        let mut buf = vec![0u8; self.frame_len];
        let read = read_full(stdout, &mut buf)
            .map_err(|e| LustreError::media(format!("ffmpeg decode read failed: {e}")))?;

        if read == 0 {
            // Clean end-of-stream on a frame boundary.
            self.finish()?;
            return Ok(None);
        }
        if read < self.frame_len {
            self.finish()?;
            return Err(LustreError::media(format!(
                "truncated frame from decoder: got {read} of {} bytes",
                self.frame_len
            )));
        }

        Ok(Some(Frame::new(
            self.info.width,
            self.info.height,
            ChannelOrder::Rgb,
            buf,
        )?))
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.info.width, self.info.height)
    }

    fn fps(&self) -> Fps {
        self.info.fps
    }

    fn frame_count(&self) -> Option<u64> {
        self.info.frame_count
    }

    fn is_open(&self) -> bool {
        self.stdout.is_some()
    }
}

impl Drop for VideoSource {
    fn drop(&mut self) {
        // Session-granularity cancellation: a source dropped mid-stream takes
        // its decode child down with it.
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// Read until `buf` is full or EOF; returns bytes read.
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0usize;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn parse_ff_ratio(s: &str) -> Option<(u32, u32)> {
    let mut parts = s.split('/');
    let a = parts.next()?.parse::<u32>().ok()?;
    let b = parts.next()?.parse::<u32>().ok()?;
    if b == 0 {
        return None;
    }
    Some((a, b))
}
