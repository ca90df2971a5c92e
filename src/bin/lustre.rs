use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use lustre::{
    BeautySession, EffectConfig, FfmpegSink, FfmpegSinkOpts, HeadlessSurface, ImageSource, Key,
    NoopDetector, TranscodeOpts, VideoSource, run_preview, run_transcode,
};

const DEFAULT_CONFIG: &str = "lustre.json";

#[derive(Parser, Debug)]
#[command(name = "lustre", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a single image through the beautify chain.
    Preview(PreviewArgs),
    /// Transcode a video through the beautify chain (requires `ffmpeg` on PATH).
    Transcode(TranscodeArgs),
}

#[derive(Parser, Debug)]
struct PreviewArgs {
    /// Input image file.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Config file of initial parameter values. A file named explicitly must
    /// parse; the default path is skipped when absent.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output PNG path for the transformed frame.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct TranscodeArgs {
    /// Input video file.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,

    /// Config file of initial parameter values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Loop iteration at which recording arms (the scripted start edge).
    #[arg(long, default_value_t = 0)]
    arm_at: u64,

    /// Stop after this many source frames.
    #[arg(long)]
    max_frames: Option<u64>,

    /// Overwrite the output file if it already exists.
    #[arg(long, default_value_t = true)]
    overwrite: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Preview(args) => cmd_preview(args),
        Command::Transcode(args) => cmd_transcode(args),
    }
}

fn load_config(explicit: Option<&Path>) -> anyhow::Result<EffectConfig> {
    match explicit {
        Some(path) => Ok(EffectConfig::load(path)?),
        None => {
            let path = Path::new(DEFAULT_CONFIG);
            if path.exists() {
                Ok(EffectConfig::load(path)?)
            } else {
                Ok(EffectConfig::default())
            }
        }
    }
}

fn cmd_preview(args: PreviewArgs) -> anyhow::Result<()> {
    let cfg = load_config(args.config.as_deref())?;

    let mut source = ImageSource::open(&args.in_path)?;
    let mut session = BeautySession::new();
    session.apply_config(&cfg);

    let mut surface = HeadlessSurface::new().close_after(1);
    run_preview(&mut source, &mut NoopDetector, &mut session, &mut surface)?;

    let frame = surface
        .take_last_frame()
        .context("pipeline produced no output frame")?;

    if let Some(out_path) = args.out {
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create output dir '{}'", parent.display()))?;
        }
        image::save_buffer_with_format(
            &out_path,
            &frame.data,
            frame.width,
            frame.height,
            image::ColorType::Rgba8,
            image::ImageFormat::Png,
        )
        .with_context(|| format!("write png '{}'", out_path.display()))?;
        eprintln!("wrote {}", out_path.display());
    }

    Ok(())
}

fn cmd_transcode(args: TranscodeArgs) -> anyhow::Result<()> {
    let cfg = load_config(args.config.as_deref())?;

    let mut source = VideoSource::open(&args.in_path)?;
    let mut session = BeautySession::new();
    session.apply_config(&cfg);

    let mut sink = FfmpegSink::new(FfmpegSinkOpts {
        out_path: args.out.clone(),
        overwrite: args.overwrite,
    });

    // Headless run: the start-recording edge is scripted instead of typed.
    let mut surface = HeadlessSurface::new().script_key(args.arm_at, Key::Space);

    let report = run_transcode(
        &mut source,
        &mut NoopDetector,
        &mut session,
        &mut sink,
        &mut surface,
        TranscodeOpts {
            max_frames: args.max_frames,
        },
    )?;

    eprintln!(
        "wrote {} ({} frames written, {} dropped)",
        args.out.display(),
        report.frames_written,
        report.frames_dropped
    );
    Ok(())
}
