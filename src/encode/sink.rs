use crate::foundation::core::{Fps, Frame, FrameIndex};
use crate::foundation::error::LustreResult;

/// Configuration provided to a [`FrameSink`] when a transcode session starts.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output frames-per-second.
    pub fps: Fps,
}

/// Sink contract for consuming transformed frames in stream order.
///
/// Ordering contract: `push_frame` is called in strictly increasing
/// `FrameIndex` order. The sink is exhaustible once: after `end` it is
/// finalized and accepts nothing further.
pub trait FrameSink {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> LustreResult<()>;
    /// Push one frame in strictly increasing stream order.
    fn push_frame(&mut self, idx: FrameIndex, frame: &Frame) -> LustreResult<()>;
    /// Called once after the last frame is pushed.
    fn end(&mut self) -> LustreResult<()>;
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<(FrameIndex, Frame)>,
    ended: bool,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the sink configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg.clone()
    }

    /// Borrow the captured frames.
    pub fn frames(&self) -> &[(FrameIndex, Frame)] {
        &self.frames
    }

    /// Whether `end` has been observed.
    pub fn ended(&self) -> bool {
        self.ended
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> LustreResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.ended = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &Frame) -> LustreResult<()> {
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> LustreResult<()> {
        self.ended = true;
        Ok(())
    }
}
