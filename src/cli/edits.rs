//! Frame edit flags shared by every sheet subcommand
//!
//! Edits are applied in a fixed order regardless of how they appear on the
//! command line: rotate, scale, flip, delete, swap, override.

use clap::Args;
use std::path::PathBuf;
use thiserror::Error;

use crate::frames::{FramePatch, Rotation};
use crate::output::{load_image, OutputError};
use crate::session::{Session, SessionError};

/// Frame edits given on the command line. Positions are display positions.
#[derive(Args, Debug, Clone, Default)]
pub struct EditArgs {
    /// Rotate a frame: POS:DEG, DEG a multiple of 90 (repeatable)
    #[arg(long, value_name = "POS:DEG", value_parser = parse_rotate)]
    pub rotate: Vec<(usize, Rotation)>,

    /// Scale a frame about its center: POS:FACTOR, clamped to 0.5-2.0 (repeatable)
    #[arg(long, value_name = "POS:FACTOR", value_parser = parse_scale)]
    pub scale: Vec<(usize, f32)>,

    /// Mirror a frame horizontally (repeatable)
    #[arg(long, value_name = "POS")]
    pub flip: Vec<usize>,

    /// Mark a frame deleted (repeatable)
    #[arg(long, value_name = "POS")]
    pub delete: Vec<usize>,

    /// Swap two frames: A:B (repeatable, applied in order)
    #[arg(long, value_name = "A:B", value_parser = parse_swap)]
    pub swap: Vec<(usize, usize)>,

    /// Replace a frame's pixels with an image file: POS:PATH (repeatable)
    #[arg(long = "override", value_name = "POS:PATH", value_parser = parse_override)]
    pub overrides: Vec<(usize, PathBuf)>,
}

/// Error applying command-line edits
#[derive(Debug, Error)]
pub enum EditError {
    #[error("frame position {position} is out of range (sheet has {count} frames)")]
    Position { position: usize, count: usize },
    #[error("cannot read override image '{path}': {source}")]
    Override {
        path: PathBuf,
        #[source]
        source: OutputError,
    },
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl EditArgs {
    pub fn is_empty(&self) -> bool {
        self.rotate.is_empty()
            && self.scale.is_empty()
            && self.flip.is_empty()
            && self.delete.is_empty()
            && self.swap.is_empty()
            && self.overrides.is_empty()
    }

    /// Apply every edit to a loaded session.
    pub fn apply(&self, session: &mut Session) -> Result<(), EditError> {
        let count = session.frames().len();
        let check = |position: usize| {
            if position < count {
                Ok(position)
            } else {
                Err(EditError::Position { position, count })
            }
        };

        for &(position, rotation) in &self.rotate {
            session.update_frame(check(position)?, FramePatch::rotation(rotation))?;
        }
        for &(position, scale) in &self.scale {
            session.update_frame(check(position)?, FramePatch::scale(scale))?;
        }
        for &position in &self.flip {
            session.update_frame(check(position)?, FramePatch::flip(true))?;
        }
        for &position in &self.delete {
            let position = check(position)?;
            if session.frame(position).is_some_and(|r| !r.deleted) {
                session.toggle_deleted(position)?;
            }
        }
        for &(a, b) in &self.swap {
            session.swap_frames(check(a)?, check(b)?)?;
        }
        for (position, path) in &self.overrides {
            let position = check(*position)?;
            let image = load_image(path)
                .map_err(|source| EditError::Override { path: path.clone(), source })?;
            session.apply_override(position, image)?;
        }
        Ok(())
    }
}

fn split_pair(s: &str) -> Result<(&str, &str), String> {
    s.split_once(':')
        .ok_or_else(|| format!("expected two values separated by ':', got '{}'", s))
}

fn parse_position(s: &str) -> Result<usize, String> {
    s.trim()
        .parse()
        .map_err(|_| format!("'{}' is not a frame position", s))
}

fn parse_rotate(s: &str) -> Result<(usize, Rotation), String> {
    let (position, degrees) = split_pair(s)?;
    let degrees: i32 = degrees
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number of degrees", degrees))?;
    let rotation = Rotation::from_degrees(degrees)
        .ok_or_else(|| format!("rotation must be a multiple of 90, got {}", degrees))?;
    Ok((parse_position(position)?, rotation))
}

fn parse_scale(s: &str) -> Result<(usize, f32), String> {
    let (position, factor) = split_pair(s)?;
    let factor: f32 = factor
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a scale factor", factor))?;
    if !factor.is_finite() || factor <= 0.0 {
        return Err(format!("scale must be a positive number, got {}", factor));
    }
    Ok((parse_position(position)?, factor))
}

fn parse_swap(s: &str) -> Result<(usize, usize), String> {
    let (a, b) = split_pair(s)?;
    Ok((parse_position(a)?, parse_position(b)?))
}

fn parse_override(s: &str) -> Result<(usize, PathBuf), String> {
    let (position, path) = split_pair(s)?;
    if path.is_empty() {
        return Err("override needs an image path after ':'".to_string());
    }
    Ok((parse_position(position)?, PathBuf::from(path)))
}
