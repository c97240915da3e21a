//! Animate command implementation

use std::path::Path;
use std::process::ExitCode;

use crate::config::CliOverrides;
use crate::output::render_gif;
use crate::session::loop_frames;

use super::{open_session, resolve_config, SheetArgs, EXIT_ERROR, EXIT_SUCCESS};

/// Execute the animate command - playback loop written as a GIF
pub fn run_animate(
    input: &SheetArgs,
    output: &Path,
    active: Option<usize>,
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
    if let Some(count) = active {
        session.set_active_frame_count(count);
    }

    let frames = match loop_frames(&session) {
        Ok(frames) => frames,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };
    if frames.is_empty() {
        eprintln!("Error: No frames left to animate");
        return ExitCode::from(EXIT_ERROR);
    }

    let fps = session.playback().fps();
    if let Err(e) = render_gif(&frames, fps, output) {
        eprintln!("Error: Failed to save '{}': {}", output.display(), e);
        return ExitCode::from(EXIT_ERROR);
    }
    println!("Saved: {} ({} frames at {} fps)", output.display(), frames.len(), fps);
    ExitCode::from(EXIT_SUCCESS)
}
