//! Frame sources: where frames and their landmarks come from.

mod image;
mod video;

pub use self::image::ImageSource;
pub use self::video::{VideoSource, VideoSourceInfo, probe_video};

use crate::foundation::core::{Fps, Frame, Landmarks};
use crate::foundation::error::LustreResult;

/// Producer of frames for the render/transcode loop.
///
/// An image source yields the same frame repeatedly; a video source is
/// sequential and exhaustible (`next_frame` returns `None` at end-of-stream,
/// which is not an error).
pub trait FrameSource {
    /// Read the next frame in source channel order, or `None` at end-of-stream.
    fn next_frame(&mut self) -> LustreResult<Option<Frame>>;

    /// Source dimensions in pixels.
    fn dimensions(&self) -> (u32, u32);

    /// Reported frame rate.
    fn fps(&self) -> Fps;

    /// Reported total frame count, when the container reports one.
    ///
    /// May be approximate; progress percentages derived from it are not
    /// guaranteed to reach exactly 100%.
    fn frame_count(&self) -> Option<u64>;

    /// Whether the source can still produce frames.
    fn is_open(&self) -> bool;
}

/// Per-frame face-landmark producer.
///
/// Detection internals are an external collaborator; the pipeline only
/// consumes the resulting coordinate set.
pub trait LandmarkDetector {
    /// Detect landmarks on one frame. No face is the empty set, not an error.
    fn detect(&mut self, frame: &Frame) -> LustreResult<Landmarks>;
}

/// Detector stand-in that never finds a face.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopDetector;

impl LandmarkDetector for NoopDetector {
    fn detect(&mut self, _frame: &Frame) -> LustreResult<Landmarks> {
        Ok(Landmarks::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::ChannelOrder;

    #[test]
    fn noop_detector_reports_no_face() {
        let frame = Frame::zeroed(2, 2, ChannelOrder::Rgb).unwrap();
        let lm = NoopDetector.detect(&frame).unwrap();
        assert!(lm.is_empty());
    }
}
