//! Transformation stages: the polymorphic units of the pipeline chain.

mod reshape;
mod smooth;
mod tint;

pub use reshape::ReshapeStage;
pub use smooth::SmoothStage;
pub use tint::TintStage;

use crate::foundation::core::{ChannelOrder, Frame, Landmarks};
use crate::foundation::error::{LustreError, LustreResult};
use crate::params::ParamKind;

/// One unit in the transformation chain, implementing one visual effect.
///
/// `transform` must be a pure function of the input frame, the stage's current
/// parameters, and the most recently broadcast landmark set. Stages keep no
/// other cross-frame state, so a parameter edit takes effect on the very next
/// frame.
pub trait Stage {
    /// Stable stage name for log lines and errors.
    fn name(&self) -> &'static str;

    /// Produce an output frame of the same dimensions as the input.
    ///
    /// A malformed input buffer yields a frame-level error; the chain drops
    /// that frame and the driver continues.
    fn transform(&self, frame: &Frame) -> LustreResult<Frame>;

    /// Whether this stage consumes per-frame landmark broadcasts.
    fn wants_landmarks(&self) -> bool {
        false
    }

    /// Record the landmark set consulted by the next `transform` call.
    ///
    /// Stages without the landmark capability ignore this.
    fn set_landmarks(&mut self, _landmarks: &Landmarks) {}

    /// Accept a normalized parameter value.
    ///
    /// Stages take the parameters they own and ignore the rest; repeated
    /// identical calls are idempotent.
    fn set_parameter(&mut self, param: ParamKind, value: f32);
}

/// Shared entry check for stage transforms: the chain's internal
/// representation is fixed at 4-channel RGBA.
pub(crate) fn require_rgba(stage: &str, frame: &Frame) -> LustreResult<()> {
    frame.validate()?;
    if frame.order != ChannelOrder::Rgba {
        return Err(LustreError::pipeline(format!(
            "{stage} expects pipeline-order RGBA frames, got {:?}",
            frame.order
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_rgba_rejects_source_order() {
        let frame = Frame::zeroed(2, 2, ChannelOrder::Rgb).unwrap();
        assert!(require_rgba("test", &frame).is_err());

        let frame = Frame::zeroed(2, 2, ChannelOrder::Rgba).unwrap();
        assert!(require_rgba("test", &frame).is_ok());
    }

    #[test]
    fn require_rgba_rejects_malformed_buffer() {
        let frame = Frame {
            width: 4,
            height: 4,
            order: ChannelOrder::Rgba,
            data: vec![0u8; 7],
        };
        assert!(matches!(
            require_rgba("test", &frame),
            Err(LustreError::Pipeline(_))
        ));
    }
}
