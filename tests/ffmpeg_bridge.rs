use std::path::Path;
use std::process::Command;

use lustre::{
    BeautySession, FfmpegSink, FfmpegSinkOpts, FrameSource, HeadlessSurface, Key, NoopDetector,
    ParamKind, TranscodeOpts, VideoSource, probe_video, run_transcode,
};

fn ffmpeg_tools_available() -> bool {
    let ffmpeg_ok = Command::new("ffmpeg")
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false);
    let ffprobe_ok = Command::new("ffprobe")
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false);
    ffmpeg_ok && ffprobe_ok
}

fn synth_clip(path: &Path) -> anyhow::Result<()> {
    let status = Command::new("ffmpeg")
        .args([
            "-v",
            "error",
            "-y",
            "-f",
            "lavfi",
            "-i",
            "testsrc=size=64x64:rate=30",
            "-t",
            "1",
            "-pix_fmt",
            "yuv420p",
            "-c:v",
            "libx264",
        ])
        .arg(path)
        .status()?;
    anyhow::ensure!(status.success(), "ffmpeg failed creating test clip");
    Ok(())
}

#[test]
fn probe_reports_dimensions_and_rate() -> anyhow::Result<()> {
    if !ffmpeg_tools_available() {
        eprintln!("skipping: ffmpeg/ffprobe not available");
        return Ok(());
    }

    let root = std::env::temp_dir().join("lustre_ffmpeg_probe");
    std::fs::create_dir_all(&root)?;
    let clip = root.join("clip.mp4");
    synth_clip(&clip)?;

    let info = probe_video(&clip)?;
    assert_eq!((info.width, info.height), (64, 64));
    assert!((info.fps.as_f64() - 30.0).abs() < 0.5);
    // One second at 30fps; the reported count may be approximate.
    let total = info.frame_count.expect("frame count for local mp4");
    assert!((25..=35).contains(&total), "unexpected count {total}");
    Ok(())
}

#[test]
fn video_source_decodes_every_frame_then_drains() -> anyhow::Result<()> {
    if !ffmpeg_tools_available() {
        eprintln!("skipping: ffmpeg/ffprobe not available");
        return Ok(());
    }

    let root = std::env::temp_dir().join("lustre_ffmpeg_decode");
    std::fs::create_dir_all(&root)?;
    let clip = root.join("clip.mp4");
    synth_clip(&clip)?;

    let mut source = VideoSource::open(&clip)?;
    let mut decoded = 0u64;
    while let Some(frame) = source.next_frame()? {
        assert_eq!((frame.width, frame.height), (64, 64));
        decoded += 1;
    }
    assert!(decoded > 0);
    assert!(!source.is_open());
    // Exhausted once: further reads keep reporting end-of-stream.
    assert!(source.next_frame()?.is_none());
    Ok(())
}

#[test]
fn transcode_round_trip_produces_playable_output() -> anyhow::Result<()> {
    if !ffmpeg_tools_available() {
        eprintln!("skipping: ffmpeg/ffprobe not available");
        return Ok(());
    }

    let root = std::env::temp_dir().join("lustre_ffmpeg_transcode");
    std::fs::create_dir_all(&root)?;
    let clip = root.join("clip.mp4");
    let out = root.join("out.mp4");
    synth_clip(&clip)?;

    let mut source = VideoSource::open(&clip)?;
    let mut session = BeautySession::new();
    session.adjust(ParamKind::Smoothing, 5.0);
    session.adjust(ParamKind::Whitening, 3.0);

    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new(&out));
    let mut surface = HeadlessSurface::new().script_key(0, Key::Space);

    let report = run_transcode(
        &mut source,
        &mut NoopDetector,
        &mut session,
        &mut sink,
        &mut surface,
        TranscodeOpts {
            max_frames: Some(10),
        },
    )?;

    assert_eq!(report.frames_seen, 10);
    assert_eq!(report.frames_written, 10);
    assert_eq!(report.frames_dropped, 0);

    let info = probe_video(&out)?;
    assert_eq!((info.width, info.height), (64, 64));
    Ok(())
}
