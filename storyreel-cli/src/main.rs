use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "storyreel", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a scene script and print a summary.
    Validate(ValidateArgs),
    /// Render a scene script plus audio clips to an MP4 (requires `ffmpeg` on PATH).
    Render(RenderArgs),
}

#[derive(Parser, Debug)]
struct ValidateArgs {
    /// Input scene script JSON.
    #[arg(long = "script")]
    script: PathBuf,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input scene script JSON.
    #[arg(long = "script")]
    script: PathBuf,

    /// Audio clip for one storyboard, in script order (repeat per line).
    #[arg(long = "audio")]
    audio: Vec<PathBuf>,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,

    /// Output size as WIDTHxHEIGHT.
    #[arg(long, default_value = "1280x720")]
    size: String,

    /// Output frame rate.
    #[arg(long, default_value_t = 24)]
    fps: u32,

    /// Seed for the deterministic overlay-fallback choice.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Expression overlay library directory.
    #[arg(long)]
    overlay_dir: Option<PathBuf>,

    /// Subtitle font file, tried before the built-in candidates.
    #[arg(long)]
    font: Vec<PathBuf>,

    /// Background music volume; 0 disables per-scene bgm.
    #[arg(long, default_value_t = 0.2)]
    bgm_volume: f32,

    /// Overwrite the output if it already exists.
    #[arg(long, default_value_t = true)]
    overwrite: bool,

    /// Render each unit's frames on a worker pool.
    #[arg(long, default_value_t = false)]
    parallel: bool,

    /// Override worker threads (parallel mode only).
    #[arg(long)]
    threads: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Validate(args) => cmd_validate(args),
        Command::Render(args) => cmd_render(args),
    }
}

fn load_script(path: &PathBuf) -> anyhow::Result<storyreel::Script> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read script '{}'", path.display()))?;
    let script = storyreel::Script::from_json_str(&raw)
        .with_context(|| format!("validate script '{}'", path.display()))?;
    Ok(script)
}

fn cmd_validate(args: ValidateArgs) -> anyhow::Result<()> {
    let script = load_script(&args.script)?;

    let summary = serde_json::json!({
        "scenes": script.scenes.len(),
        "storyboards": script.storyboard_count(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let script = load_script(&args.script)?;
    let (width, height) = parse_size(&args.size)?;

    let defaults = storyreel::RenderOpts::default();
    let mut fonts = args.font;
    fonts.extend(defaults.font_candidates.iter().cloned());

    let opts = storyreel::RenderOpts {
        canvas: storyreel::Canvas { width, height },
        fps: storyreel::Fps {
            num: args.fps,
            den: 1,
        },
        seed: args.seed,
        overlay_dir: args.overlay_dir,
        bgm_volume: args.bgm_volume,
        overwrite: args.overwrite,
        threading: storyreel::RenderThreading {
            parallel: args.parallel,
            threads: args.threads,
        },
        font_candidates: fonts,
        ..defaults
    };

    let summary = storyreel::render_script(&script, &args.audio, args.out, &opts, None)?;
    eprintln!(
        "wrote {} ({} scenes, {} units, {} frames)",
        summary.video_path.display(),
        summary.scenes,
        summary.units,
        summary.frames
    );
    Ok(())
}

fn parse_size(size: &str) -> anyhow::Result<(u32, u32)> {
    let (w, h) = size
        .split_once('x')
        .with_context(|| format!("size '{size}' must look like 1280x720"))?;
    let width = w
        .trim()
        .parse::<u32>()
        .with_context(|| format!("invalid width in '{size}'"))?;
    let height = h
        .trim()
        .parse::<u32>()
        .with_context(|| format!("invalid height in '{size}'"))?;
    Ok((width, height))
}
