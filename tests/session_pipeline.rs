use std::cell::RefCell;
use std::rc::Rc;

use lustre::{
    BeautySession, ChannelOrder, Fps, Frame, FrameSource, InMemorySink, Key, Landmarks,
    LandmarkDetector, LustreResult, NoopDetector, ParamKind, PipelineChain, ReadbackSink,
    HeadlessSurface, Stage, TranscodeOpts, run_preview, run_transcode,
};

/// Scripted in-memory frame source.
struct ScriptedSource {
    frames: Vec<Frame>,
    cursor: usize,
    fps: Fps,
    total: Option<u64>,
}

impl ScriptedSource {
    fn new(frames: Vec<Frame>, total: Option<u64>) -> Self {
        Self {
            frames,
            cursor: 0,
            fps: Fps { num: 30, den: 1 },
            total,
        }
    }
}

impl FrameSource for ScriptedSource {
    fn next_frame(&mut self) -> LustreResult<Option<Frame>> {
        let frame = self.frames.get(self.cursor).cloned();
        if frame.is_some() {
            self.cursor += 1;
        }
        Ok(frame)
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.frames[0].width, self.frames[0].height)
    }

    fn fps(&self) -> Fps {
        self.fps
    }

    fn frame_count(&self) -> Option<u64> {
        self.total
    }

    fn is_open(&self) -> bool {
        self.cursor < self.frames.len()
    }
}

/// Detector yielding one scripted landmark set per frame, then empty.
struct ScriptedDetector {
    sets: Vec<Landmarks>,
    cursor: usize,
}

impl LandmarkDetector for ScriptedDetector {
    fn detect(&mut self, _frame: &Frame) -> LustreResult<Landmarks> {
        let set = self.sets.get(self.cursor).cloned().unwrap_or_default();
        self.cursor += 1;
        Ok(set)
    }
}

/// Stage recording the landmark set visible during each transform call.
struct FreshnessProbe {
    current: Landmarks,
    seen_at_transform: Rc<RefCell<Vec<Landmarks>>>,
}

impl Stage for FreshnessProbe {
    fn name(&self) -> &'static str {
        "freshness_probe"
    }

    fn transform(&self, frame: &Frame) -> LustreResult<Frame> {
        self.seen_at_transform.borrow_mut().push(self.current.clone());
        Ok(frame.clone())
    }

    fn wants_landmarks(&self) -> bool {
        true
    }

    fn set_landmarks(&mut self, landmarks: &Landmarks) {
        self.current = landmarks.clone();
    }

    fn set_parameter(&mut self, _param: ParamKind, _value: f32) {}
}

fn rgb_frames(count: usize, w: u32, h: u32) -> Vec<Frame> {
    (0..count)
        .map(|i| {
            Frame::new(w, h, ChannelOrder::Rgb, vec![(i * 20 % 256) as u8; (w * h * 3) as usize])
                .unwrap()
        })
        .collect()
}

#[test]
fn transcode_writes_only_after_arm_edge() {
    let mut source = ScriptedSource::new(rgb_frames(6, 4, 2), Some(6));
    let mut session = BeautySession::new();
    let mut sink = InMemorySink::new();
    // Arm on the third loop iteration: two frames preview-only, four written.
    let mut surface = HeadlessSurface::new().script_key(2, Key::Space);

    let report = run_transcode(
        &mut source,
        &mut NoopDetector,
        &mut session,
        &mut sink,
        &mut surface,
        TranscodeOpts::default(),
    )
    .unwrap();

    assert_eq!(report.frames_seen, 6);
    assert_eq!(report.frames_written, 4);
    assert_eq!(report.frames_dropped, 0);
    assert_eq!(sink.frames().len(), 4);
    assert!(sink.ended());
    assert_eq!(surface.presented(), 6);

    let cfg = sink.config().unwrap();
    assert_eq!((cfg.width, cfg.height), (4, 2));

    // Sink receives source-order frames with strictly increasing indices.
    for (i, (idx, frame)) in sink.frames().iter().enumerate() {
        assert_eq!(idx.0, i as u64);
        assert_eq!(frame.order, ChannelOrder::Rgb);
    }
}

#[test]
fn unarmed_run_is_preview_only() {
    let mut source = ScriptedSource::new(rgb_frames(3, 4, 2), Some(3));
    let mut session = BeautySession::new();
    let mut sink = InMemorySink::new();
    let mut surface = HeadlessSurface::new();

    let report = run_transcode(
        &mut source,
        &mut NoopDetector,
        &mut session,
        &mut sink,
        &mut surface,
        TranscodeOpts::default(),
    )
    .unwrap();

    assert_eq!(report.frames_seen, 3);
    assert_eq!(report.frames_written, 0);
    // Never armed, so the sink was never started or finalized.
    assert!(sink.config().is_none());
    assert!(!sink.ended());
    assert_eq!(surface.presented(), 3);
}

#[test]
fn escape_quits_before_end_of_stream() {
    let mut source = ScriptedSource::new(rgb_frames(10, 4, 2), Some(10));
    let mut session = BeautySession::new();
    let mut sink = InMemorySink::new();
    let mut surface = HeadlessSurface::new()
        .script_key(0, Key::Space)
        .script_key(3, Key::Escape);

    let report = run_transcode(
        &mut source,
        &mut NoopDetector,
        &mut session,
        &mut sink,
        &mut surface,
        TranscodeOpts::default(),
    )
    .unwrap();

    assert_eq!(report.frames_seen, 3);
    assert_eq!(report.frames_written, 3);
    assert!(sink.ended());
}

#[test]
fn parameter_edits_apply_between_frames() {
    // Four identical source frames, so any difference comes from the edit.
    let frame = Frame::new(4, 4, ChannelOrder::Rgb, vec![60u8; 48]).unwrap();
    let mut source = ScriptedSource::new(vec![frame; 4], None);
    let mut session = BeautySession::new();
    let mut sink = InMemorySink::new();
    // Arm immediately, then push whitening up hard before the third frame.
    let mut surface = HeadlessSurface::new()
        .script_key(0, Key::Space)
        .script_key(2, Key::S)
        .script_key(2, Key::S)
        .script_key(2, Key::S)
        .script_key(2, Key::S)
        .script_key(2, Key::S);

    run_transcode(
        &mut source,
        &mut NoopDetector,
        &mut session,
        &mut sink,
        &mut surface,
        TranscodeOpts::default(),
    )
    .unwrap();

    assert_eq!(session.params().value(ParamKind::Whitening), 5.0);
    let frames = sink.frames();
    assert_eq!(frames.len(), 4);
    // Source frames are identical per fill; the edit separates frame 1 from 2.
    let brightness = |f: &Frame| f.data.iter().map(|&b| u64::from(b)).sum::<u64>();
    assert!(brightness(&frames[2].1) > brightness(&frames[1].1));
}

#[test]
fn stages_observe_current_frame_landmarks_never_stale() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let probe = FreshnessProbe {
        current: Landmarks::empty(),
        seen_at_transform: Rc::clone(&seen),
    };
    let (readback, handle) = ReadbackSink::new();
    let chain = PipelineChain::assemble(vec![Box::new(probe)], Box::new(readback));
    let mut session = BeautySession::with_chain(chain, handle);

    let first = Landmarks::from_flat(vec![1.0, 1.0]).unwrap();
    let second = Landmarks::from_flat(vec![9.0, 9.0]).unwrap();
    let mut detector = ScriptedDetector {
        sets: vec![first.clone(), second.clone()],
        cursor: 0,
    };

    let mut source = ScriptedSource::new(rgb_frames(2, 2, 2), Some(2));
    let mut sink = InMemorySink::new();
    let mut surface = HeadlessSurface::new();

    run_transcode(
        &mut source,
        &mut detector,
        &mut session,
        &mut sink,
        &mut surface,
        TranscodeOpts::default(),
    )
    .unwrap();

    let seen = seen.borrow();
    assert_eq!(*seen, vec![first, second]);
}

#[test]
fn four_stage_chain_tolerates_empty_landmarks() {
    let mut source = ScriptedSource::new(rgb_frames(2, 8, 6), Some(2));
    let mut session = BeautySession::new();
    for kind in ParamKind::ALL {
        session.adjust(kind, 10.0);
    }
    let mut sink = InMemorySink::new();
    let mut surface = HeadlessSurface::new().script_key(0, Key::Space);

    let report = run_transcode(
        &mut source,
        &mut NoopDetector,
        &mut session,
        &mut sink,
        &mut surface,
        TranscodeOpts::default(),
    )
    .unwrap();

    assert_eq!(report.frames_dropped, 0);
    for (_, frame) in sink.frames() {
        assert_eq!((frame.width, frame.height), (8, 6));
    }
}

#[test]
fn max_frames_caps_the_session() {
    let mut source = ScriptedSource::new(rgb_frames(10, 4, 2), Some(10));
    let mut session = BeautySession::new();
    let mut sink = InMemorySink::new();
    let mut surface = HeadlessSurface::new().script_key(0, Key::Space);

    let report = run_transcode(
        &mut source,
        &mut NoopDetector,
        &mut session,
        &mut sink,
        &mut surface,
        TranscodeOpts {
            max_frames: Some(4),
        },
    )
    .unwrap();

    assert_eq!(report.frames_seen, 4);
    assert_eq!(report.frames_written, 4);
}

#[test]
fn preview_loop_repeats_one_frame_until_close() {
    let frame = Frame::new(4, 4, ChannelOrder::Rgb, vec![77u8; 48]).unwrap();
    let mut source = lustre::ImageSource::from_frame(frame);
    let mut session = BeautySession::new();
    let mut surface = HeadlessSurface::new()
        .script_key(1, Key::A)
        .close_after(5);

    let report = run_preview(&mut source, &mut NoopDetector, &mut session, &mut surface).unwrap();

    assert_eq!(report.frames_seen, 5);
    assert_eq!(surface.presented(), 5);
    assert_eq!(session.params().value(ParamKind::Smoothing), 1.0);
    assert!(surface.take_last_frame().is_some());
}
