use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use frameloom::{Document, FrameRange, PngSequenceSink, SceneDesc, Settings, SoftwareGpu};

#[derive(Parser, Debug)]
#[command(name = "frameloom", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a single frame as a PNG.
    Frame(FrameArgs),
    /// Render a frame range as a numbered PNG sequence.
    Render(RenderArgs),
}

#[derive(Parser, Debug)]
struct CommonArgs {
    /// Input scene JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Performance settings JSON; defaults apply when omitted.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Disable the software GPU context, leaving GPU-only effects unrenderable.
    #[arg(long)]
    no_gpu: bool,

    /// Seconds to wait for any single frame.
    #[arg(long, default_value_t = 60)]
    timeout: u64,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Frame number.
    #[arg(long, allow_negative_numbers = true)]
    frame: i64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Output directory.
    #[arg(long)]
    out: PathBuf,

    /// First frame; defaults to the scene's range.
    #[arg(long, allow_negative_numbers = true)]
    from: Option<i64>,

    /// Last frame (inclusive); defaults to the scene's range.
    #[arg(long, allow_negative_numbers = true)]
    to: Option<i64>,

    /// File name prefix.
    #[arg(long, default_value = "frame")]
    prefix: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Render(args) => cmd_render(args),
    }
}

fn open_document(args: &CommonArgs) -> anyhow::Result<Document> {
    let desc = SceneDesc::load(&args.in_path)
        .with_context(|| format!("load scene '{}'", args.in_path.display()))?;
    let base_dir = args.in_path.parent().unwrap_or_else(|| Path::new("."));
    let scene = desc.build(base_dir).context("build scene")?;
    let settings = match &args.settings {
        Some(path) => Settings::load(path)
            .with_context(|| format!("load settings '{}'", path.display()))?,
        None => Settings::default(),
    };
    let gpu = if args.no_gpu {
        None
    } else {
        Some(Box::new(SoftwareGpu::new()) as Box<dyn frameloom::GpuContext>)
    };
    Ok(Document::new(scene, settings, gpu)?)
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let mut doc = open_document(&args.common)?;
    let timeout = Duration::from_secs(args.common.timeout);
    let image = doc
        .render_frame_blocking(args.frame, timeout)
        .with_context(|| format!("render frame {}", args.frame))?;
    image.save_png(&args.out)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let mut doc = open_document(&args.common)?;
    let scene_range = doc.scene().frame_range();
    let range = FrameRange::new(
        args.from.unwrap_or(scene_range.min),
        args.to.unwrap_or(scene_range.max),
    );
    if range.is_empty() {
        anyhow::bail!("empty frame range {}..={}", range.min, range.max);
    }
    let mut sink = PngSequenceSink::new(&args.out).with_prefix(args.prefix);
    let written = doc
        .export_range(range, &mut sink, Duration::from_secs(args.common.timeout))
        .with_context(|| format!("export frames {}..={}", range.min, range.max))?;
    eprintln!("wrote {written} frames to {}", args.out.display());
    Ok(())
}
