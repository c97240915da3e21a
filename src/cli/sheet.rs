//! Slice, export and repack command implementations

use serde::Serialize;
use std::path::Path;
use std::process::ExitCode;

use crate::config::CliOverrides;
use crate::output::{frame_output_path, save_png};
use crate::repack::PlacedFrame;

use super::{open_session, resolve_config, SheetArgs, EXIT_ERROR, EXIT_INVALID_ARGS, EXIT_SUCCESS};

/// Execute the slice command - one PNG per surviving frame
pub fn run_slice(input: &SheetArgs, output: &Path, config_path: Option<&Path>) -> ExitCode {
    let config = match resolve_config(config_path, &CliOverrides::default()) {
        Ok(config) => config,
        Err(code) => return code,
    };
    let mut session = match open_session(input, &config) {
        Ok(session) => session,
        Err(code) => return code,
    };

    let stem = input
        .sheet
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("frame");
    let positions = session.frames().live_positions();
    let total = session.frames().len();

    for position in positions {
        let image = match session.render_frame(position) {
            Ok(Some(image)) => image,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::from(EXIT_ERROR);
            }
        };
        let path = frame_output_path(output, stem, position, total);
        if let Err(e) = save_png(&image, &path) {
            eprintln!("Error: Failed to save '{}': {}", path.display(), e);
            return ExitCode::from(EXIT_ERROR);
        }
        println!("Saved: {}", path.display());
    }

    ExitCode::from(EXIT_SUCCESS)
}

/// Execute the export command - gap-free sheet of the edited frames
pub fn run_export(
    input: &SheetArgs,
    output: &Path,
    config_path: Option<&Path>,
    overrides: &CliOverrides,
) -> ExitCode {
    let config = match resolve_config(config_path, overrides) {
        Ok(config) => config,
        Err(code) => return code,
    };
    let options = match config.export_options() {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };
    let session = match open_session(input, &config) {
        Ok(session) => session,
        Err(code) => return code,
    };

    let export = match session.export(&options) {
        Ok(Some(export)) => export,
        Ok(None) => return ExitCode::from(EXIT_ERROR),
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    if export.frame_count() == 0 {
        eprintln!("Warning: every frame is deleted, exported sheet is empty");
    }
    if let Err(e) = save_png(&export.image, output) {
        eprintln!("Error: Failed to save '{}': {}", output.display(), e);
        return ExitCode::from(EXIT_ERROR);
    }
    println!("Saved: {} ({} frames)", output.display(), export.frame_count());
    ExitCode::from(EXIT_SUCCESS)
}

#[derive(Serialize)]
struct RepackJson<'a> {
    cell_width: u32,
    cell_height: u32,
    frames: &'a [PlacedFrame],
}

/// Execute the repack command - crop to content and pack into tighter cells
pub fn run_repack(
    input: &SheetArgs,
    output: &Path,
    json: bool,
    config_path: Option<&Path>,
    overrides: &CliOverrides,
) -> ExitCode {
    let config = match resolve_config(config_path, overrides) {
        Ok(config) => config,
        Err(code) => return code,
    };
    let mut session = match open_session(input, &config) {
        Ok(session) => session,
        Err(code) => return code,
    };

    let summary = match session.repack() {
        Ok(Some(summary)) => summary,
        Ok(None) => return ExitCode::from(EXIT_ERROR),
        Err(e) => {
            eprintln!("Error: Repack failed: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let Some(sheet) = session.sheet() else {
        return ExitCode::from(EXIT_ERROR);
    };
    if let Err(e) = save_png(sheet.image(), output) {
        eprintln!("Error: Failed to save '{}': {}", output.display(), e);
        return ExitCode::from(EXIT_ERROR);
    }

    if json {
        let report = RepackJson {
            cell_width: summary.cell_width,
            cell_height: summary.cell_height,
            frames: &summary.placed,
        };
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::from(EXIT_ERROR);
            }
        }
    } else {
        println!(
            "Saved: {} ({} frames, {}x{} cells)",
            output.display(),
            summary.placed.len(),
            summary.cell_width,
            summary.cell_height
        );
    }
    ExitCode::from(EXIT_SUCCESS)
}
