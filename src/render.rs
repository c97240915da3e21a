//! Frame rendering - the one transform pipeline shared by preview, thumbnail,
//! export and repack
//!
//! The pipeline follows 2D-canvas semantics and the order matters:
//!
//! 1. translate to the destination center
//! 2. rotate by the record's quarter turn
//! 3. scale X by `(flip ? -1 : 1) * scale`, Y by `scale`
//! 4. draw the source (override image or grid cell) centered at cell size
//!
//! Swapping rotate and flip changes the result for content that is not
//! symmetric under 90° turns.

use image::imageops::{self, FilterType};
use image::RgbaImage;

use crate::background::BackgroundClassifier;
use crate::frames::FrameRecord;
use crate::grid::Rect;
use crate::sheet::Sheet;
use crate::surface::{CenteredDraw, Surface, SurfaceError};

/// A warning generated while rendering or editing
#[derive(Debug, Clone, PartialEq)]
pub struct Warning {
    pub message: String,
}

impl Warning {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Allocate a transparent scratch surface sized to one cell of `sheet`.
pub fn cell_surface(sheet: &Sheet) -> Result<Surface, SurfaceError> {
    let (cell_w, cell_h) = sheet.cell_size();
    Surface::new(cell_w, cell_h)
}

/// Render `record` into `scratch`, replacing its previous contents.
///
/// The scratch surface is normally cell-sized; any other size simply centers
/// the cell on it. A record whose `source_index` is outside the grid renders
/// as a cleared surface.
pub fn render_frame(sheet: &Sheet, record: &FrameRecord, scratch: &mut Surface) {
    scratch.clear();

    let (cell_w, cell_h) = sheet.cell_size();
    let (source, rect) = match &record.override_image {
        Some(img) => (img, Rect::new(0, 0, img.width(), img.height())),
        None => match sheet.source_rect(record.source_index) {
            Some(rect) => (sheet.image(), rect),
            None => return,
        },
    };

    let flip = if record.flip_horizontal { -1.0 } else { 1.0 };
    let draw = CenteredDraw {
        cos_sin: record.rotation.cos_sin(),
        scale_x: flip * record.scale,
        scale_y: record.scale,
        width: cell_w,
        height: cell_h,
    };
    scratch.draw_centered(source, rect, &draw);
}

/// Render `record` into a freshly allocated cell-sized image.
pub fn render_frame_image(sheet: &Sheet, record: &FrameRecord) -> Result<RgbaImage, SurfaceError> {
    let mut scratch = cell_surface(sheet)?;
    render_frame(sheet, record, &mut scratch);
    Ok(scratch.into_image())
}

/// Render for live preview, optionally masking a key color to transparency.
pub fn render_preview(
    sheet: &Sheet,
    record: &FrameRecord,
    scratch: &mut Surface,
    mask: Option<&BackgroundClassifier>,
) {
    render_frame(sheet, record, scratch);
    if let Some(classifier) = mask {
        scratch.mask_matching(classifier);
    }
}

/// Render a thumbnail whose longer edge is at most `max_edge` pixels.
///
/// Downscaling uses nearest-neighbour sampling to keep pixel art crisp.
pub fn render_thumbnail(
    sheet: &Sheet,
    record: &FrameRecord,
    max_edge: u32,
) -> Result<RgbaImage, SurfaceError> {
    let full = render_frame_image(sheet, record)?;
    let (w, h) = full.dimensions();
    let longest = w.max(h);
    if max_edge == 0 || longest <= max_edge {
        return Ok(full);
    }

    let ratio = max_edge as f32 / longest as f32;
    let thumb_w = ((w as f32 * ratio).round() as u32).max(1);
    let thumb_h = ((h as f32 * ratio).round() as u32).max(1);
    Ok(imageops::resize(&full, thumb_w, thumb_h, FilterType::Nearest))
}

/// Resize a replacement image to the sheet's cell size.
///
/// Returns the image untouched when it already matches.
pub fn fit_to_cell(sheet: &Sheet, image: RgbaImage) -> RgbaImage {
    let (cell_w, cell_h) = sheet.cell_size();
    if image.dimensions() == (cell_w, cell_h) {
        return image;
    }
    imageops::resize(&image, cell_w, cell_h, FilterType::Triangle)
}
