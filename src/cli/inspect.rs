//! Bounds command implementation

use serde::Serialize;
use std::path::Path;
use std::process::ExitCode;

use crate::background::BackgroundClassifier;
use crate::bounds::{find_content_bounds, find_content_bounds_sampled, ContentBounds};
use crate::color::format_hex;
use crate::config::CliOverrides;

use super::{open_session, resolve_config, SheetArgs, EXIT_ERROR, EXIT_SUCCESS};

#[derive(Debug, Serialize)]
struct FrameBounds {
    position: usize,
    source_index: usize,
    #[serde(flatten)]
    bounds: ContentBounds,
}

/// Execute the bounds command - content box of every surviving frame
///
/// The background reference is the top-left pixel of the first surviving
/// frame, the same reference repack uses.
pub fn run_bounds(input: &SheetArgs, json: bool, fast: bool, config_path: Option<&Path>) -> ExitCode {
    let config = match resolve_config(config_path, &CliOverrides::default()) {
        Ok(config) => config,
        Err(code) => return code,
    };
    let mut session = match open_session(input, &config) {
        Ok(session) => session,
        Err(code) => return code,
    };

    let mut classifier: Option<BackgroundClassifier> = None;
    let mut results = Vec::new();
    for position in session.frames().live_positions() {
        let image = match session.render_frame(position) {
            Ok(Some(image)) => image,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::from(EXIT_ERROR);
            }
        };
        let classifier = *classifier.get_or_insert_with(|| {
            BackgroundClassifier::from_channel_tolerance(*image.get_pixel(0, 0), config.repack.channel_tolerance)
        });
        let bounds = if fast {
            find_content_bounds_sampled(&image, &classifier, config.repack.margin, config.preview.stride)
        } else {
            find_content_bounds(&image, &classifier, config.repack.margin)
        };
        let source_index = session.frame(position).map_or(position, |r| r.source_index);
        results.push(FrameBounds { position, source_index, bounds });
    }

    if json {
        match serde_json::to_string_pretty(&results) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::from(EXIT_ERROR);
            }
        }
        return ExitCode::from(EXIT_SUCCESS);
    }

    if let Some(classifier) = &classifier {
        println!("background: {}", format_hex(classifier.reference()));
    }
    for entry in &results {
        let b = &entry.bounds;
        if b.has_content {
            println!(
                "frame {} (cell {}): x={} y={} w={} h={}",
                entry.position,
                entry.source_index,
                b.min_x,
                b.min_y,
                b.width(),
                b.height()
            );
        } else {
            println!("frame {} (cell {}): empty", entry.position, entry.source_index);
        }
    }
    ExitCode::from(EXIT_SUCCESS)
}
