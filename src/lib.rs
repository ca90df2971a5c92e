//! Lustre is a face-beautification frame pipeline.
//!
//! Frames from a static image or a decoded video stream flow through an
//! ordered chain of transformation stages (smoothing, geometry reshape, lip
//! and cheek tint), with per-frame face landmarks fanned out to the stages
//! that consume them. In transcode mode the loop bridges an external ffmpeg
//! decode source and encode sink while servicing a live display surface and
//! keyboard-driven parameter edits:
//!
//! - Build a [`BeautySession`] and apply an [`EffectConfig`]
//! - Drive it with [`run_preview`] or [`run_transcode`]
//! - Record through any [`FrameSink`], e.g. [`FfmpegSink`]
#![forbid(unsafe_code)]

pub mod chain;
pub mod config;
pub mod encode;
pub mod foundation;
pub mod input;
pub mod params;
pub mod session;
pub mod source;
pub mod stage;
pub mod surface;
pub mod transcode;

pub use crate::chain::{ChainSink, NullSink, PipelineChain, ReadbackHandle, ReadbackSink};
pub use crate::config::EffectConfig;
pub use crate::encode::{FfmpegSink, FfmpegSinkOpts, FrameSink, InMemorySink, SinkConfig};
pub use crate::foundation::core::{ChannelOrder, Fps, Frame, FrameIndex, Landmarks, Point, Vec2};
pub use crate::foundation::error::{LustreError, LustreResult};
pub use crate::input::{InputAction, Key, map_key};
pub use crate::params::{PARAM_MAX, PARAM_MIN, ParamKind, ParamStore};
pub use crate::session::BeautySession;
pub use crate::source::{
    FrameSource, ImageSource, LandmarkDetector, NoopDetector, VideoSource, VideoSourceInfo,
    probe_video,
};
pub use crate::stage::{ReshapeStage, SmoothStage, Stage, TintStage};
pub use crate::surface::{DisplaySurface, HeadlessSurface};
pub use crate::transcode::{
    TranscodeOpts, TranscodeReport, TranscodeSession, TranscodeState, run_preview, run_transcode,
};
