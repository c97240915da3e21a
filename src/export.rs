//! Final export - gap-free sheet at the original cell size
//!
//! Export only removes deletion gaps and bakes the existing transforms. It
//! never resizes cells or looks at content bounds; that is the job of
//! [`crate::repack`].

use image::{Rgba, RgbaImage};

use crate::background::BackgroundClassifier;
use crate::frames::FrameState;
use crate::grid::Rect;
use crate::render::{cell_surface, render_frame};
use crate::sheet::Sheet;
use crate::surface::{Surface, SurfaceError, TRANSPARENT};

/// Options for [`export_sheet`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportOptions {
    /// Fill for the sheet before frames are drawn, visible in unused cells
    pub background: Rgba<u8>,
    /// When set, pixels matching this classifier become transparent
    pub transparency: Option<BackgroundClassifier>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            background: TRANSPARENT,
            transparency: None,
        }
    }
}

/// Result of an export
#[derive(Debug, Clone, PartialEq)]
pub struct SheetExport {
    pub image: RgbaImage,
    /// Source indices in the order they were placed
    pub placed: Vec<usize>,
}

impl SheetExport {
    pub fn frame_count(&self) -> usize {
        self.placed.len()
    }
}

/// Compose the full sheet from the current frame state.
///
/// Surviving frames are written in display order into consecutive cells of a
/// sheet with the original dimensions. Each frame is rendered into a
/// cell-sized scratch surface first, so scaled-up content is clipped to its
/// own cell.
pub fn export_sheet(
    sheet: &Sheet,
    state: &FrameState,
    options: &ExportOptions,
) -> Result<SheetExport, SurfaceError> {
    let geometry = sheet.geometry();
    let (cell_w, cell_h) = geometry.cell_size();
    let mut canvas = Surface::filled(cell_w * geometry.cols, cell_h * geometry.rows, options.background)?;
    let mut scratch = cell_surface(sheet)?;
    let mut placed = Vec::new();

    for record in state.iter().filter(|r| !r.deleted) {
        let Some(dest) = geometry.source_rect(placed.len()) else {
            break;
        };
        render_frame(sheet, record, &mut scratch);
        canvas.draw_region(scratch.image(), Rect::new(0, 0, cell_w, cell_h), dest.x, dest.y);
        placed.push(record.source_index);
    }

    if let Some(classifier) = &options.transparency {
        canvas.mask_matching(classifier);
    }

    Ok(SheetExport {
        image: canvas.into_image(),
        placed,
    })
}
