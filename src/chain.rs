//! The pipeline chain: an ordered sequence of stages plus a terminal sink.

use std::cell::RefCell;
use std::rc::Rc;

use crate::foundation::core::{ChannelOrder, Frame, Landmarks};
use crate::foundation::error::{LustreError, LustreResult};
use crate::params::ParamKind;
use crate::stage::Stage;

/// Terminal consumer of the chain's final frame.
pub trait ChainSink {
    /// Accept one fully transformed frame.
    fn consume(&mut self, frame: &Frame) -> LustreResult<()>;
}

/// Sink that discards frames.
#[derive(Debug, Default)]
pub struct NullSink;

impl ChainSink for NullSink {
    fn consume(&mut self, _frame: &Frame) -> LustreResult<()> {
        Ok(())
    }
}

/// Sink exposing the transformed pixel buffer back to the driver.
///
/// The driver keeps the [`ReadbackHandle`] and takes the frame after each
/// `push` for display and, when armed, for encoding. Single-threaded by
/// design; the whole loop runs on one thread.
#[derive(Debug)]
pub struct ReadbackSink {
    cell: Rc<RefCell<Option<Frame>>>,
}

/// Cloneable read side of a [`ReadbackSink`].
#[derive(Clone, Debug)]
pub struct ReadbackHandle {
    cell: Rc<RefCell<Option<Frame>>>,
}

impl ReadbackSink {
    /// Create a sink and its read handle.
    pub fn new() -> (Self, ReadbackHandle) {
        let cell = Rc::new(RefCell::new(None));
        (
            Self { cell: Rc::clone(&cell) },
            ReadbackHandle { cell },
        )
    }
}

impl ChainSink for ReadbackSink {
    fn consume(&mut self, frame: &Frame) -> LustreResult<()> {
        *self.cell.borrow_mut() = Some(frame.clone());
        Ok(())
    }
}

impl ReadbackHandle {
    /// Take the most recent frame, leaving the slot empty.
    pub fn take(&self) -> Option<Frame> {
        self.cell.borrow_mut().take()
    }
}

/// An ordered, linear chain of transformation stages ending in a sink.
///
/// The order is fixed at [`PipelineChain::assemble`] time and is significant:
/// later stages see the cumulative output of all earlier ones. Reassembly is
/// unrepresentable; building a new chain is the only way to change the order.
pub struct PipelineChain {
    stages: Vec<Box<dyn Stage>>,
    sink: Box<dyn ChainSink>,
}

impl PipelineChain {
    /// Fix the linear stage order and terminal sink.
    pub fn assemble(stages: Vec<Box<dyn Stage>>, sink: Box<dyn ChainSink>) -> Self {
        Self { stages, sink }
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Return `true` when the chain holds no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage names in transformation order; the order is an inspectable value.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Fan a landmark set out to every stage that declared interest.
    ///
    /// Must complete before `push` for the same frame, so that landmark-driven
    /// stages observe the current frame's set during `transform`.
    pub fn broadcast(&mut self, landmarks: &Landmarks) {
        for stage in &mut self.stages {
            if stage.wants_landmarks() {
                stage.set_landmarks(landmarks);
            }
        }
    }

    /// Route a normalized parameter value to its owning stage.
    ///
    /// Every stage is offered the value; stages ignore parameters they do not
    /// own, so routing needs no table here.
    pub fn set_parameter(&mut self, param: ParamKind, value: f32) {
        for stage in &mut self.stages {
            stage.set_parameter(param, value);
        }
    }

    /// Push one frame through every stage in order, then into the sink.
    ///
    /// Frames must already be in the pipeline-internal 4-channel order. A
    /// stage failure aborts this frame (the sink never sees it); the caller
    /// decides whether to continue with the next source frame.
    pub fn push(&mut self, frame: Frame) -> LustreResult<()> {
        if frame.order != ChannelOrder::Rgba {
            return Err(LustreError::pipeline(format!(
                "chain expects normalized RGBA frames, got {:?}",
                frame.order
            )));
        }

        let mut current = frame;
        for stage in &self.stages {
            current = stage
                .transform(&current)
                .map_err(|e| LustreError::pipeline(format!("stage '{}': {e}", stage.name())))?;
        }
        self.sink.consume(&current)
    }
}
