//! pixgraph - raw image resize and depth conversion tool
//!
//! Reads and writes headerless planar (or YUY2) files described by
//! `format@path` specifiers, running each frame through a filter graph.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use pixgraph_core::{CpuClass, PixelType};
use pixgraph_resize::KernelKind;
use tracing_subscriber::EnvFilter;

mod commands;
mod frame_io;
mod mmap;
mod pathspec;

#[derive(Parser)]
#[command(name = "pixgraph")]
#[command(author, version, about = "Raw image resize and depth conversion")]
#[command(long_about = "
Resizes and converts headerless raw frames using tiled filter graphs.

Path specifiers take the form format@path, e.g. i420@clip.yuv. Formats:
  8-bit:  grey yuy2 yv12 yv16 yv24 i420 i422 i444 rgbp gbrp
  16-bit: greyw yv12w yv16w yv24w i420w i422w i444w rgbpw gbrpw
  half:   greyh i420h i422h i444h rgbph
  float:  greys i420s i422s i444s rgbps

Examples:
  pixgraph resize i420@in.yuv i420@out.yuv -w 1920 -H 1080 --dst-width 1280 --dst-height 720
  pixgraph resize in.raw out.raw -w 640 -H 480 --dst-width 960 -f bilinear --frames 30
  pixgraph convert i420@in.yuv i420s@out.raw -w 1920 -H 1080 --fullrange-out
  pixgraph cpuinfo
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Number of threads (0 = auto)
    #[arg(short = 'j', long, global = true, default_value = "0")]
    threads: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Resize raw frames
    #[command(visible_alias = "r")]
    Resize(ResizeArgs),

    /// Convert sample type, bit depth and range
    #[command(visible_alias = "c")]
    Convert(ConvertArgs),

    /// Show detected instruction set classes
    Cpuinfo,
}

/// Arguments shared by commands that stream raw frames.
#[derive(Args)]
struct FrameArgs {
    /// Input path specifier
    input: String,

    /// Output path specifier (/dev/null or NUL discards)
    output: String,

    /// Source width
    #[arg(short, long)]
    width: u32,

    /// Source height
    #[arg(short = 'H', long)]
    height: u32,

    /// Number of consecutive frames in the input
    #[arg(long, default_value = "1")]
    frames: usize,

    /// Instruction set class: auto, none, sse2, avx2, neon
    #[arg(long, default_value = "auto")]
    cpu: CpuClass,
}

#[derive(Args)]
struct ResizeArgs {
    #[command(flatten)]
    io: FrameArgs,

    /// Output width (default: source width)
    #[arg(long)]
    dst_width: Option<u32>,

    /// Output height (default: source height)
    #[arg(long)]
    dst_height: Option<u32>,

    /// Kernel: point, bilinear, bicubic, spline16, spline36, spline64, lanczos
    #[arg(short, long, default_value = "bicubic")]
    filter: KernelKind,

    /// Lanczos taps
    #[arg(long, default_value = "3")]
    taps: u32,

    /// Working sample type: word, half, float (default: word for 8/16-bit files, else the file type)
    #[arg(short = 't', long)]
    pixel_type: Option<PixelType>,

    /// Horizontal window offset in source pixels
    #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
    shift_w: f64,

    /// Vertical window offset in source pixels
    #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
    shift_h: f64,

    /// Source window width (default: source width)
    #[arg(long)]
    sub_width: Option<f64>,

    /// Source window height (default: source height)
    #[arg(long)]
    sub_height: Option<f64>,

    /// Treat integer samples as full range
    #[arg(long)]
    fullrange: bool,

    /// Fixed column tile width
    #[arg(long)]
    tile_width: Option<u32>,
}

#[derive(Args)]
struct ConvertArgs {
    #[command(flatten)]
    io: FrameArgs,

    /// Significant bits of integer input samples (default: file depth)
    #[arg(long)]
    depth_in: Option<u32>,

    /// Significant bits of integer output samples (default: file depth)
    #[arg(long)]
    depth_out: Option<u32>,

    /// Input is full range
    #[arg(long)]
    fullrange_in: bool,

    /// Output is full range
    #[arg(long)]
    fullrange_out: bool,

    /// Fixed column tile width
    #[arg(long)]
    tile_width: Option<u32>,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Configure thread pool
    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .context("Failed to configure thread pool")?;
    }

    match cli.command {
        Commands::Resize(args) => commands::resize::run(args, cli.verbose),
        Commands::Convert(args) => commands::convert::run(args, cli.verbose),
        Commands::Cpuinfo => commands::cpuinfo::run(cli.verbose),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_resize() {
        let cli = Cli::try_parse_from([
            "pixgraph", "-vv", "resize", "i420@a.yuv", "b.yuv", "-w", "64", "-H", "32", "--dst-width", "48",
            "-f", "lanczos", "--shift-w", "-0.25", "--cpu", "none",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Commands::Resize(args) = cli.command else {
            panic!("expected resize");
        };
        assert_eq!(args.filter, KernelKind::Lanczos);
        assert_eq!(args.io.cpu, CpuClass::None);
        assert_eq!(args.shift_w, -0.25);
        assert_eq!(args.dst_height, None);
    }
}
