//! The beautify session: parameter store plus pipeline chain under one owner.

use crate::chain::{PipelineChain, ReadbackHandle, ReadbackSink};
use crate::config::EffectConfig;
use crate::foundation::core::{Frame, Landmarks};
use crate::foundation::error::LustreResult;
use crate::params::{ParamKind, ParamStore};
use crate::source::LandmarkDetector;
use crate::stage::{ReshapeStage, SmoothStage, Stage, TintStage};

/// Owns the parameter store and the assembled pipeline chain for one run.
///
/// Every accepted edit is pushed into the owning stage immediately, so an
/// edit is visible on the very next frame.
pub struct BeautySession {
    params: ParamStore,
    chain: PipelineChain,
    output: ReadbackHandle,
}

impl BeautySession {
    /// Assemble the standard four-stage chain with a readback sink.
    ///
    /// Stage order matters and is fixed for the session: lip tint, cheek
    /// tint, geometry reshape, then smoothing.
    pub fn new() -> Self {
        let (sink, output) = ReadbackSink::new();
        let stages: Vec<Box<dyn Stage>> = vec![
            Box::new(TintStage::lipstick()),
            Box::new(TintStage::blusher()),
            Box::new(ReshapeStage::new()),
            Box::new(SmoothStage::new()),
        ];
        Self {
            params: ParamStore::new(),
            chain: PipelineChain::assemble(stages, Box::new(sink)),
            output,
        }
    }

    /// Build a session around a custom chain and its readback handle.
    pub fn with_chain(chain: PipelineChain, output: ReadbackHandle) -> Self {
        Self {
            params: ParamStore::new(),
            chain,
            output,
        }
    }

    /// Current raw parameter values.
    pub fn params(&self) -> &ParamStore {
        &self.params
    }

    /// Stage names in transformation order.
    pub fn stage_order(&self) -> Vec<&'static str> {
        self.chain.stage_names()
    }

    /// Apply one discrete edit and immediately hand the normalized value to
    /// the owning stage. Returns the new raw value.
    pub fn adjust(&mut self, kind: ParamKind, delta: f32) -> f32 {
        let raw = self.params.adjust(kind, delta);
        self.chain.set_parameter(kind, self.params.normalize(kind));
        raw
    }

    /// Replay loaded config values through the adjust path.
    pub fn apply_config(&mut self, cfg: &EffectConfig) {
        for kind in ParamKind::ALL {
            self.adjust(kind, cfg.value(kind));
        }
    }

    /// Fan a landmark set out ahead of the next push.
    pub fn broadcast(&mut self, landmarks: &Landmarks) {
        self.chain.broadcast(landmarks);
    }

    /// Push one pipeline-order frame through the chain.
    pub fn push(&mut self, frame: Frame) -> LustreResult<()> {
        self.chain.push(frame)
    }

    /// Take the most recent chain output, if any.
    pub fn take_output(&mut self) -> Option<Frame> {
        self.output.take()
    }

    /// Run one source-order frame through detection, broadcast, and the
    /// chain, returning the transformed frame from the readback sink.
    ///
    /// Landmarks are broadcast before the push so landmark-driven stages see
    /// the current frame's set.
    pub fn process(
        &mut self,
        detector: &mut dyn LandmarkDetector,
        frame: &Frame,
    ) -> LustreResult<Option<Frame>> {
        let landmarks = detector.detect(frame)?;
        let rgba = frame.to_rgba()?;
        self.broadcast(&landmarks);
        self.push(rgba)?;
        Ok(self.take_output())
    }
}

impl Default for BeautySession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::ChannelOrder;
    use crate::source::NoopDetector;

    #[test]
    fn standard_chain_order_is_fixed() {
        let session = BeautySession::new();
        assert_eq!(
            session.stage_order(),
            vec!["lipstick", "blusher", "reshape", "smooth"]
        );
    }

    #[test]
    fn adjust_returns_clamped_raw_value() {
        let mut session = BeautySession::new();
        assert_eq!(session.adjust(ParamKind::Smoothing, 4.0), 4.0);
        assert_eq!(session.adjust(ParamKind::Smoothing, 9.0), 10.0);
        assert_eq!(session.params().value(ParamKind::Smoothing), 10.0);
    }

    #[test]
    fn apply_config_saturates_out_of_range_values() {
        let mut session = BeautySession::new();
        let cfg = EffectConfig {
            whitening: 25.0,
            lipstick: 3.0,
            ..Default::default()
        };
        session.apply_config(&cfg);
        assert_eq!(session.params().value(ParamKind::Whitening), 10.0);
        assert_eq!(session.params().value(ParamKind::Lipstick), 3.0);
        assert_eq!(session.params().value(ParamKind::Smoothing), 0.0);
    }

    #[test]
    fn process_with_empty_landmarks_keeps_dimensions() {
        let mut session = BeautySession::new();
        // All four stages active; the landmark-consuming ones must tolerate
        // an empty set.
        for kind in ParamKind::ALL {
            session.adjust(kind, 5.0);
        }
        let frame = Frame::new(
            6,
            4,
            ChannelOrder::Rgb,
            vec![90u8; 6 * 4 * 3],
        )
        .unwrap();

        let out = session
            .process(&mut NoopDetector, &frame)
            .unwrap()
            .expect("readback frame");
        assert_eq!((out.width, out.height), (6, 4));
        assert_eq!(out.order, ChannelOrder::Rgba);
    }

    #[test]
    fn process_twice_is_deterministic() {
        let mut session = BeautySession::new();
        session.adjust(ParamKind::Smoothing, 6.0);
        session.adjust(ParamKind::Whitening, 4.0);

        let frame = Frame::new(4, 4, ChannelOrder::Rgb, (0..48).collect()).unwrap();
        let a = session.process(&mut NoopDetector, &frame).unwrap().unwrap();
        let b = session.process(&mut NoopDetector, &frame).unwrap().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn edits_take_effect_on_the_next_frame() {
        let mut session = BeautySession::new();
        let frame = Frame::new(4, 4, ChannelOrder::Rgb, vec![60u8; 48]).unwrap();

        let before = session.process(&mut NoopDetector, &frame).unwrap().unwrap();
        session.adjust(ParamKind::Whitening, 8.0);
        let after = session.process(&mut NoopDetector, &frame).unwrap().unwrap();
        assert_ne!(before.data, after.data);
    }
}
