//! The render/transcode loop: the single driver thread that alternates
//! between surface input, decode, transform, display, and encode.

use tracing::{debug, info, warn};

use crate::encode::{FrameSink, SinkConfig};
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{LustreError, LustreResult};
use crate::input::{InputAction, map_key};
use crate::session::BeautySession;
use crate::source::{FrameSource, LandmarkDetector};
use crate::surface::DisplaySurface;

/// Lifecycle of a transcode session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TranscodeState {
    /// Constructed, no frame read yet.
    Idle,
    /// Frames are being decoded and pushed.
    Streaming,
    /// Source exhausted; the loop exits on the next close check.
    Draining,
    /// Source and sink released. Terminal.
    Finished,
}

/// Per-session transcode bookkeeping.
///
/// The armed flag is the per-frame Armed/Unarmed sub-state: output recording
/// only begins after an explicit user-triggered start edge, and display-only
/// preview (never arming) is a legal run.
#[derive(Clone, Copy, Debug)]
pub struct TranscodeSession {
    state: TranscodeState,
    armed: bool,
    written: u64,
    total: Option<u64>,
}

impl TranscodeSession {
    /// New idle session with the codec-reported frame count, if any.
    pub fn new(total: Option<u64>) -> Self {
        Self {
            state: TranscodeState::Idle,
            armed: false,
            written: 0,
            total,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TranscodeState {
        self.state
    }

    /// Whether transformed frames are being written to the sink.
    pub fn armed(&self) -> bool {
        self.armed
    }

    /// Enter `Streaming` from `Idle`.
    pub fn begin_streaming(&mut self) {
        if self.state == TranscodeState::Idle {
            self.state = TranscodeState::Streaming;
        }
    }

    /// Observe the user's start-recording edge. Idempotent.
    pub fn arm(&mut self) {
        self.armed = true;
    }

    /// Decode failure or end-of-stream: enter `Draining`.
    pub fn mark_end_of_stream(&mut self) {
        if self.state == TranscodeState::Streaming {
            self.state = TranscodeState::Draining;
        }
    }

    /// Release the session. Terminal.
    pub fn finish(&mut self) {
        self.state = TranscodeState::Finished;
    }

    /// Account one written frame and return its sink index.
    pub fn record_write(&mut self) -> FrameIndex {
        let idx = FrameIndex(self.written);
        self.written += 1;
        idx
    }

    /// Progress line for the most recent accepted frame.
    ///
    /// The total is the codec-reported count and may be approximate, so the
    /// percentage is not guaranteed to reach exactly 100%. With no reported
    /// count the line is `written/?`.
    pub fn progress(&self) -> String {
        match self.total {
            Some(total) if total > 0 => {
                let pct = self.written * 100 / total;
                format!("{}/{} ({}%)", self.written, total, pct)
            }
            _ => format!("{}/?", self.written),
        }
    }
}

/// Knobs for [`run_transcode`].
#[derive(Clone, Copy, Debug, Default)]
pub struct TranscodeOpts {
    /// Stop reading after this many source frames, as if the stream ended.
    pub max_frames: Option<u64>,
}

/// What a loop run did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TranscodeReport {
    /// Source frames pulled into the pipeline.
    pub frames_seen: u64,
    /// Frames written to the sink while armed.
    pub frames_written: u64,
    /// Frames dropped on per-frame transform failures.
    pub frames_dropped: u64,
}

/// Drive a full video transcode session.
///
/// Single-threaded by contract: input handling, decode, transform, display,
/// and encode all run inline on the calling thread, and nothing yields
/// mid-frame. Cancellation is session-granular via the surface close request
/// or Escape.
#[tracing::instrument(skip_all)]
pub fn run_transcode(
    source: &mut dyn FrameSource,
    detector: &mut dyn LandmarkDetector,
    session: &mut BeautySession,
    sink: &mut dyn FrameSink,
    surface: &mut dyn DisplaySurface,
    opts: TranscodeOpts,
) -> LustreResult<TranscodeReport> {
    let (width, height) = source.dimensions();
    let fps = source.fps();
    let mut tx = TranscodeSession::new(source.frame_count());
    let mut report = TranscodeReport::default();

    tx.begin_streaming();
    // Prime one frame eagerly so the display has content before any user
    // action; the chain must tolerate this frame being in flight already.
    let mut pending = read_next(source, &mut tx);

    'drive: while !surface.close_requested() && tx.state() == TranscodeState::Streaming {
        if let Some((w, h)) = surface.take_resize() {
            debug!(width = w, height = h, "output viewport updated");
        }

        for key in surface.poll_input() {
            match map_key(key) {
                InputAction::Adjust(kind, delta) => {
                    let raw = session.adjust(kind, delta);
                    info!(param = kind.name(), value = raw, "parameter edit");
                }
                InputAction::ArmRecording => {
                    if !tx.armed() {
                        sink.begin(SinkConfig { width, height, fps })?;
                        tx.arm();
                        info!("recording armed");
                    }
                }
                InputAction::Quit => break 'drive,
            }
        }

        if let Some(frame) = pending.take() {
            report.frames_seen += 1;
            match session.process(detector, &frame) {
                Ok(Some(out)) => {
                    surface.present(&out)?;
                    if tx.armed() {
                        let rgb = out.to_rgb()?;
                        let idx = tx.record_write();
                        sink.push_frame(idx, &rgb)?;
                        report.frames_written += 1;
                        info!("encoded {}", tx.progress());
                    }
                }
                Ok(None) => {}
                Err(LustreError::Pipeline(msg)) => {
                    report.frames_dropped += 1;
                    warn!("dropping frame: {msg}");
                }
                Err(e) => return Err(e),
            }
        }

        if opts.max_frames.is_some_and(|m| report.frames_seen >= m) {
            tx.mark_end_of_stream();
        } else {
            pending = read_next(source, &mut tx);
        }
    }

    if tx.armed() {
        sink.end()?;
    }
    tx.finish();
    debug!(?report, "transcode finished");
    Ok(report)
}

/// Drive a live preview session over a repeatable source. No sink is
/// attached; the arm key is a no-op here.
#[tracing::instrument(skip_all)]
pub fn run_preview(
    source: &mut dyn FrameSource,
    detector: &mut dyn LandmarkDetector,
    session: &mut BeautySession,
    surface: &mut dyn DisplaySurface,
) -> LustreResult<TranscodeReport> {
    let mut report = TranscodeReport::default();

    'drive: while !surface.close_requested() {
        if let Some((w, h)) = surface.take_resize() {
            debug!(width = w, height = h, "viewport resized");
        }

        for key in surface.poll_input() {
            match map_key(key) {
                InputAction::Adjust(kind, delta) => {
                    let raw = session.adjust(kind, delta);
                    info!(param = kind.name(), value = raw, "parameter edit");
                }
                InputAction::ArmRecording => debug!("arm ignored in preview mode"),
                InputAction::Quit => break 'drive,
            }
        }

        let Some(frame) = source.next_frame()? else {
            break;
        };
        report.frames_seen += 1;
        match session.process(detector, &frame) {
            Ok(Some(out)) => surface.present(&out)?,
            Ok(None) => {}
            Err(LustreError::Pipeline(msg)) => {
                report.frames_dropped += 1;
                warn!("dropping frame: {msg}");
            }
            Err(e) => return Err(e),
        }
    }

    Ok(report)
}

/// Read the next source frame; decode failure and end-of-stream both signal
/// the `Draining` transition rather than an error.
fn read_next(
    source: &mut dyn FrameSource,
    tx: &mut TranscodeSession,
) -> Option<crate::foundation::core::Frame> {
    match source.next_frame() {
        Ok(Some(frame)) => Some(frame),
        Ok(None) => {
            tx.mark_end_of_stream();
            None
        }
        Err(e) => {
            warn!("decode failed, draining: {e}");
            tx.mark_end_of_stream();
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_uses_reported_total() {
        let mut tx = TranscodeSession::new(Some(100));
        for _ in 0..37 {
            tx.record_write();
        }
        assert_eq!(tx.progress(), "37/100 (37%)");
    }

    #[test]
    fn progress_without_total_has_no_percentage() {
        let mut tx = TranscodeSession::new(None);
        for _ in 0..12 {
            tx.record_write();
        }
        assert_eq!(tx.progress(), "12/?");
    }

    #[test]
    fn approximate_total_can_undershoot_100_percent() {
        // Count reported by the container is approximate; writing fewer
        // frames than reported never reaches 100%.
        let mut tx = TranscodeSession::new(Some(100));
        for _ in 0..98 {
            tx.record_write();
        }
        assert_eq!(tx.progress(), "98/100 (98%)");
    }

    #[test]
    fn state_machine_transitions_in_order() {
        let mut tx = TranscodeSession::new(Some(10));
        assert_eq!(tx.state(), TranscodeState::Idle);

        tx.begin_streaming();
        assert_eq!(tx.state(), TranscodeState::Streaming);

        // No-op preview transitions are legal; arming is orthogonal.
        assert!(!tx.armed());
        tx.arm();
        tx.arm();
        assert!(tx.armed());

        tx.mark_end_of_stream();
        assert_eq!(tx.state(), TranscodeState::Draining);

        tx.finish();
        assert_eq!(tx.state(), TranscodeState::Finished);
    }

    #[test]
    fn end_of_stream_before_streaming_stays_idle() {
        let mut tx = TranscodeSession::new(None);
        tx.mark_end_of_stream();
        assert_eq!(tx.state(), TranscodeState::Idle);
    }

    #[test]
    fn record_write_indices_increase_strictly() {
        let mut tx = TranscodeSession::new(None);
        assert_eq!(tx.record_write(), FrameIndex(0));
        assert_eq!(tx.record_write(), FrameIndex(1));
        assert_eq!(tx.record_write(), FrameIndex(2));
    }
}
