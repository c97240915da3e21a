//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod animate;
mod edits;
mod inspect;
mod sheet;

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::config::{load_config, merge_cli_overrides, CliOverrides, StudioConfig};
use crate::output::load_image;
use crate::session::Session;

pub use edits::{EditArgs, EditError};

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "SHEETSMITH_LOG";

/// Sheetsmith - Edit, repack and export sprite-sheet frame grids
#[derive(Parser)]
#[command(name = "sheetsmith")]
#[command(about = "Sheetsmith - Edit, repack and export sprite-sheet frame grids")]
#[command(version)]
pub struct Cli {
    /// Config file to use instead of discovering sheetsmith.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Input sheet, grid shape and frame edits
#[derive(Args, Debug, Clone)]
pub struct SheetArgs {
    /// Sprite-sheet image (PNG, GIF, JPEG, ...)
    pub sheet: PathBuf,

    /// Number of grid rows
    #[arg(long)]
    pub rows: u32,

    /// Number of grid columns
    #[arg(long)]
    pub cols: u32,

    #[command(flatten)]
    pub edits: EditArgs,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write every surviving frame as its own PNG
    Slice {
        #[command(flatten)]
        input: SheetArgs,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Compose the edited frames into a gap-free sheet PNG
    Export {
        #[command(flatten)]
        input: SheetArgs,

        /// Output PNG file
        #[arg(short, long)]
        output: PathBuf,

        /// Fill color for the sheet (default: transparent)
        #[arg(long)]
        background: Option<String>,

        /// Color to turn transparent in the output
        #[arg(long)]
        transparent_key: Option<String>,

        /// Tolerance for --transparent-key, percent (0-100)
        #[arg(long)]
        tolerance: Option<f32>,
    },

    /// Crop frames to content and pack them into smaller uniform cells
    Repack {
        #[command(flatten)]
        input: SheetArgs,

        /// Output PNG file
        #[arg(short, long)]
        output: PathBuf,

        /// Space around the largest content box
        #[arg(long)]
        padding: Option<u32>,

        /// Margin around each detected content box
        #[arg(long)]
        margin: Option<u32>,

        /// Background distance threshold, 0-255 channel units
        #[arg(long)]
        channel_tolerance: Option<f32>,

        /// Print the placement report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Report the content bounds of each frame
    Bounds {
        #[command(flatten)]
        input: SheetArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Sample pixels with the preview stride instead of scanning all of them
        #[arg(long)]
        fast: bool,
    },

    /// Render the playback loop as an animated GIF
    Animate {
        #[command(flatten)]
        input: SheetArgs,

        /// Output GIF file
        #[arg(short, long)]
        output: PathBuf,

        /// Frames per second (1-60)
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=60))]
        fps: Option<u32>,

        /// Number of leading frames in the loop
        #[arg(long)]
        active: Option<usize>,
    },
}

/// Install the stderr log subscriber, filtered by `SHEETSMITH_LOG`.
fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    // A subscriber may already be installed when run from tests
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

/// Load config, apply overrides, and report failures the CLI way.
fn resolve_config(path: Option<&Path>, overrides: &CliOverrides) -> Result<StudioConfig, ExitCode> {
    let mut config = match load_config(path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Err(ExitCode::from(EXIT_ERROR));
        }
    };
    merge_cli_overrides(&mut config, overrides);

    let errors = config.validate();
    if !errors.is_empty() {
        for error in errors {
            eprintln!("Error: {}", error);
        }
        return Err(ExitCode::from(EXIT_INVALID_ARGS));
    }
    Ok(config)
}

/// Open the sheet, build a session from config and apply the edit flags.
fn open_session(input: &SheetArgs, config: &StudioConfig) -> Result<Session, ExitCode> {
    let image = match load_image(&input.sheet) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("Error: Cannot open input file '{}': {}", input.sheet.display(), e);
            return Err(ExitCode::from(EXIT_INVALID_ARGS));
        }
    };

    let mut session = Session::new(config.repack_options(), config.playback());
    if let Err(e) = session.load_image(image, input.rows, input.cols) {
        eprintln!("Error: {}", e);
        return Err(ExitCode::from(EXIT_INVALID_ARGS));
    }

    if let Err(e) = input.edits.apply(&mut session) {
        eprintln!("Error: {}", e);
        let code = match e {
            EditError::Session(_) => EXIT_ERROR,
            _ => EXIT_INVALID_ARGS,
        };
        return Err(ExitCode::from(code));
    }
    Ok(session)
}

/// Entry point for the CLI
pub fn run() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Slice { input, output } => {
            sheet::run_slice(&input, &output, config_path)
        }
        Commands::Export { input, output, background, transparent_key, tolerance } => {
            let overrides = CliOverrides { background, transparent_key, tolerance, ..Default::default() };
            sheet::run_export(&input, &output, config_path, &overrides)
        }
        Commands::Repack { input, output, padding, margin, channel_tolerance, json } => {
            let overrides = CliOverrides { padding, margin, channel_tolerance, ..Default::default() };
            sheet::run_repack(&input, &output, json, config_path, &overrides)
        }
        Commands::Bounds { input, json, fast } => {
            inspect::run_bounds(&input, json, fast, config_path)
        }
        Commands::Animate { input, output, fps, active } => {
            let overrides = CliOverrides { fps, ..Default::default() };
            animate::run_animate(&input, &output, active, config_path, &overrides)
        }
    }
}
