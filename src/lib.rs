//! Sheetsmith - Library for editing and repacking sprite-sheet frame grids
//!
//! This library provides functionality to:
//! - Split a sheet image into a uniform grid of animation frames
//! - Rotate, scale, flip, reorder, delete and replace frames without touching the source pixels
//! - Export the edited frames as a gap-free sheet
//! - Crop every frame to its content and repack into tighter uniform cells
//! - Preview the animation loop and request redrawn frames from an image generator

pub mod background;
pub mod bounds;
pub mod cli;
pub mod color;
pub mod config;
pub mod export;
pub mod frames;
pub mod grid;
pub mod output;
pub mod playback;
pub mod redraw;
pub mod render;
pub mod repack;
pub mod session;
pub mod sheet;
pub mod surface;
