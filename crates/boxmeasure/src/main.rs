//! boxmeasure: detect objects in an image and report their pixel widths.
//!
//! Runs the contour-based detection pipeline on one image file, writes a
//! copy with every detected object outlined to the output directory
//! (same file name as the input), and prints the object count and
//! widths.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin boxmeasure -- [OPTIONS] <IMAGE>
//! ```
//!
//! Set `RUST_LOG=debug` for per-stage pipeline logs on stderr.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use boxmeasure_pipeline::diagnostics::{Clock, PipelineDiagnostics};
use boxmeasure_pipeline::{BoundingBox, ContourOrder, DetectionConfig, OverlapPolicy};
use clap::{Parser, ValueEnum};
use serde::Serialize;

/// Default output directory for annotated images.
const DEFAULT_OUTPUT_DIR: &str = "processed";

/// Detect objects in an image and estimate their widths in pixels.
///
/// Individual knob flags override whichever base configuration is
/// selected (`--preset`, `--config`, or `--config-json`).
#[derive(Parser)]
#[command(name = "boxmeasure", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image: PathBuf,

    /// Directory the annotated image is written to (created if missing).
    #[arg(long, short, default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// Base configuration.
    #[arg(long, value_enum, default_value_t = Preset::Default, conflicts_with_all = ["config", "config_json"])]
    preset: Preset,

    /// Base configuration from a JSON file.
    #[arg(long, conflicts_with = "config_json")]
    config: Option<PathBuf>,

    /// Base configuration as a JSON string.
    #[arg(long)]
    config_json: Option<String>,

    /// Gaussian blur kernel size (odd).
    #[arg(long)]
    blur_kernel: Option<u32>,

    /// Canny low threshold.
    #[arg(long)]
    canny_low: Option<f32>,

    /// Canny high threshold.
    #[arg(long)]
    canny_high: Option<f32>,

    /// Dilation kernel size (odd).
    #[arg(long, conflicts_with = "no_dilation")]
    dilation: Option<u32>,

    /// Skip edge-map dilation.
    #[arg(long)]
    no_dilation: bool,

    /// Boxes must be wider than this.
    #[arg(long)]
    min_width: Option<u32>,

    /// Boxes must be taller than this.
    #[arg(long)]
    min_height: Option<u32>,

    /// Boxes must have a larger area than this.
    #[arg(long)]
    min_area: Option<u64>,

    /// Overlap handling between accepted boxes.
    #[arg(long, value_enum)]
    overlap: Option<Overlap>,

    /// Order candidates are offered to the overlap policy.
    #[arg(long, value_enum)]
    order: Option<Order>,

    /// Outline thickness in pixels.
    #[arg(long)]
    thickness: Option<u32>,

    /// Also print per-stage timing and count diagnostics.
    #[arg(long)]
    diagnostics: bool,

    /// Print the result as JSON instead of the human-readable report.
    #[arg(long)]
    json: bool,
}

/// Named detector configurations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Preset {
    /// Canny 50/150, 5x5 dilation, overlaps allowed.
    Default,
    /// Canny 50/150, no dilation, overlaps allowed.
    Simple,
    /// Canny 30/100, 5x5 dilation, area > 500, overlaps allowed.
    Dilated,
    /// Canny 50/150, 5x5 dilation, overlapping boxes suppressed.
    NonOverlapping,
}

impl Preset {
    fn config(self) -> DetectionConfig {
        match self {
            Self::Default => DetectionConfig::default(),
            Self::Simple => DetectionConfig::simple(),
            Self::Dilated => DetectionConfig::dilated(),
            Self::NonOverlapping => DetectionConfig::non_overlapping(),
        }
    }
}

/// Overlap policy selection.
#[derive(Clone, Copy, ValueEnum)]
enum Overlap {
    /// Keep every box that passes the size filter.
    Allow,
    /// Drop boxes that intersect an earlier accepted box.
    Suppress,
}

/// Candidate order selection.
#[derive(Clone, Copy, ValueEnum)]
enum Order {
    /// Sort by top-left corner, row first.
    TopLeft,
    /// Border-following discovery order.
    Discovery,
}

/// Build a [`DetectionConfig`] from CLI arguments.
///
/// Starts from `--config-json`, `--config`, or `--preset` (in that
/// order of precedence; clap rejects combinations) and then applies the
/// individual knob flags.
fn config_from_cli(cli: &Cli) -> Result<DetectionConfig, String> {
    let mut config = if let Some(ref json) = cli.config_json {
        serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"))?
    } else if let Some(ref path) = cli.config {
        boxmeasure_io::load_config(path).map_err(|e| e.to_string())?
    } else {
        cli.preset.config()
    };

    if let Some(size) = cli.blur_kernel {
        config.blur_kernel_size = size;
    }
    if let Some(low) = cli.canny_low {
        config.canny_low = low;
    }
    if let Some(high) = cli.canny_high {
        config.canny_high = high;
    }
    if cli.no_dilation {
        config.dilation = None;
    } else if let Some(size) = cli.dilation {
        config.dilation = Some(size);
    }
    if let Some(width) = cli.min_width {
        config.size_filter.min_width = width;
    }
    if let Some(height) = cli.min_height {
        config.size_filter.min_height = height;
    }
    if let Some(area) = cli.min_area {
        config.size_filter.min_area = Some(area);
    }
    if let Some(overlap) = cli.overlap {
        config.overlap = match overlap {
            Overlap::Allow => OverlapPolicy::Allow,
            Overlap::Suppress => OverlapPolicy::Suppress,
        };
    }
    if let Some(order) = cli.order {
        config.contour_order = match order {
            Order::TopLeft => ContourOrder::TopLeft,
            Order::Discovery => ContourOrder::Discovery,
        };
    }
    if let Some(thickness) = cli.thickness {
        config.render.thickness = thickness;
    }

    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

/// JSON form of one run.
#[derive(Serialize)]
struct Report<'a> {
    input: &'a Path,
    output_path: &'a Path,
    object_count: usize,
    widths: Vec<u32>,
    boxes: &'a [BoundingBox],
    #[serde(skip_serializing_if = "Option::is_none")]
    diagnostics: Option<&'a PipelineDiagnostics>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };
    tracing::debug!(?config, "resolved configuration");

    let outcome = if cli.diagnostics {
        boxmeasure_io::measure_file_with_diagnostics(
            &cli.image,
            &cli.output_dir,
            &config,
            &StdClock,
        )
        .map(|(result, diag)| (result, Some(diag)))
    } else {
        boxmeasure_io::measure_file(&cli.image, &cli.output_dir, &config).map(|r| (r, None))
    };

    let (result, diagnostics) = match outcome {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if cli.json {
        let report = Report {
            input: &cli.image,
            output_path: &result.output_path,
            object_count: result.boxes.len(),
            widths: result.widths(),
            boxes: &result.boxes,
            diagnostics: diagnostics.as_ref(),
        };
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing result: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        println!("Detected {} object(s)", result.boxes.len());
        println!("Estimated widths (in pixels): {:?}", result.widths());
        println!("Annotated image: {}", result.output_path.display());
        if let Some(ref diag) = diagnostics {
            println!();
            println!("{}", diag.report());
        }
    }

    ExitCode::SUCCESS
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}
