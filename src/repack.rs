//! Smart-crop repacking - rebuilds a tight, gap-free, uniform sheet
//!
//! Implements the repack pass over the current frame state:
//!
//! 1. Render every surviving frame through the shared pipeline
//! 2. Sample the background reference from the first surviving render
//! 3. Find each frame's content bounds against that one reference
//! 4. Size a single output cell from the largest content box plus padding
//! 5. Allocate the new sheet filled with the reference color
//! 6. Place frames in display order, skipping deleted and empty ones, each
//!    centered in its cell
//!
//! The caller then adopts the result as the new baseline and resets the
//! frame state, since every transform is now baked into pixels.

use image::{Rgba, RgbaImage};
use serde::Serialize;

use crate::background::{BackgroundClassifier, DEFAULT_CHANNEL_TOLERANCE};
use crate::bounds::{find_content_bounds, ContentBounds, DEFAULT_MARGIN};
use crate::frames::FrameState;
use crate::grid::{GridError, Rect};
use crate::render::{cell_surface, render_frame};
use crate::sheet::Sheet;
use crate::surface::{Surface, SurfaceError, TRANSPARENT};

/// Default padding added on each side of the largest content box
pub const DEFAULT_PADDING: u32 = 2;

/// Tuning for [`repack`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepackOptions {
    /// Extra space on each side of the largest content box
    pub padding: u32,
    /// Outward margin applied to each detected content box
    pub margin: u32,
    /// Background distance threshold in 0-255 channel units
    pub channel_tolerance: f32,
}

impl Default for RepackOptions {
    fn default() -> Self {
        Self {
            padding: DEFAULT_PADDING,
            margin: DEFAULT_MARGIN,
            channel_tolerance: DEFAULT_CHANNEL_TOLERANCE,
        }
    }
}

/// One frame placed into the repacked sheet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedFrame {
    /// Display position in the frame state that was repacked
    pub position: usize,
    pub source_index: usize,
    /// Crop taken from the rendered frame
    pub content: Rect,
    /// Where the crop landed in the new sheet
    pub dest_x: u32,
    pub dest_y: u32,
}

/// Outcome of a repack pass
#[derive(Debug, Clone, PartialEq)]
pub struct RepackReport {
    pub image: RgbaImage,
    pub cell_width: u32,
    pub cell_height: u32,
    pub reference: Rgba<u8>,
    /// Content bounds per display position; `None` for deleted frames
    pub bounds: Vec<Option<ContentBounds>>,
    pub placed: Vec<PlacedFrame>,
}

impl RepackReport {
    /// Adopt the repacked image as a new sheet with the same grid shape.
    pub fn into_sheet(self, rows: u32, cols: u32) -> Result<Sheet, GridError> {
        Sheet::new(self.image, rows, cols)
    }
}

/// Repack the sheet according to `state`.
///
/// Content with no detectable foreground anywhere degrades to placing every
/// surviving frame uncropped.
pub fn repack(
    sheet: &Sheet,
    state: &FrameState,
    options: &RepackOptions,
) -> Result<RepackReport, SurfaceError> {
    let geometry = sheet.geometry();
    let (cell_w, cell_h) = geometry.cell_size();
    let mut scratch = cell_surface(sheet)?;

    // Steps 1-2: render survivors, reference from the first survivor (or frame 0)
    let mut renders: Vec<Option<RgbaImage>> = Vec::with_capacity(state.len());
    for record in state.iter() {
        if record.deleted {
            renders.push(None);
        } else {
            render_frame(sheet, record, &mut scratch);
            renders.push(Some(scratch.image().clone()));
        }
    }
    let reference = match renders.iter().flatten().next() {
        Some(first) => *first.get_pixel(0, 0),
        None => match state.get(0) {
            Some(record) => {
                render_frame(sheet, record, &mut scratch);
                scratch.pixel(0, 0).unwrap_or(TRANSPARENT)
            }
            None => TRANSPARENT,
        },
    };
    let classifier = BackgroundClassifier::from_channel_tolerance(reference, options.channel_tolerance);

    // Step 3: per-frame bounds against the shared reference
    let bounds: Vec<Option<ContentBounds>> = renders
        .iter()
        .map(|render| {
            render
                .as_ref()
                .map(|img| find_content_bounds(img, &classifier, options.margin))
        })
        .collect();

    // Step 4: one output cell size for the whole sheet
    let any_content = bounds.iter().flatten().any(|b| b.has_content);
    let (out_w, out_h) = if any_content {
        let max_w = bounds.iter().flatten().filter(|b| b.has_content).map(|b| b.width()).max().unwrap_or(cell_w);
        let max_h = bounds.iter().flatten().filter(|b| b.has_content).map(|b| b.height()).max().unwrap_or(cell_h);
        (
            (max_w + 2 * options.padding).min(cell_w),
            (max_h + 2 * options.padding).min(cell_h),
        )
    } else {
        (cell_w, cell_h)
    };

    // Step 5: new canvas in the reference color
    let mut canvas = Surface::filled(out_w * geometry.cols, out_h * geometry.rows, reference)?;

    // Step 6: sequential, centered placement
    let mut placed = Vec::new();
    for (position, (record, render)) in state.iter().zip(&renders).enumerate() {
        let (Some(render), Some(frame_bounds)) = (render, bounds[position]) else {
            continue;
        };
        if any_content && !frame_bounds.has_content {
            continue;
        }

        let cursor = placed.len() as u32;
        let cell_x = (cursor % geometry.cols) * out_w;
        let cell_y = (cursor / geometry.cols) * out_h;
        let content = frame_bounds.to_rect();
        let dest_x = cell_x + out_w.saturating_sub(content.w) / 2;
        let dest_y = cell_y + out_h.saturating_sub(content.h) / 2;

        // Never bleed into the neighbouring cell
        let clipped = Rect::new(content.x, content.y, content.w.min(out_w), content.h.min(out_h));
        canvas.draw_region(render, clipped, dest_x, dest_y);

        placed.push(PlacedFrame {
            position,
            source_index: record.source_index,
            content,
            dest_x,
            dest_y,
        });
    }

    tracing::debug!(
        placed = placed.len(),
        cell_width = out_w,
        cell_height = out_h,
        "repacked sheet"
    );

    Ok(RepackReport {
        image: canvas.into_image(),
        cell_width: out_w,
        cell_height: out_h,
        reference,
        bounds,
        placed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::{FramePatch, Rotation};

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const INK: Rgba<u8> = Rgba([10, 10, 10, 255]);

    /// 1xN sheet of `cell`-sized cells, each with a `w × h` ink block at `(x, y)`
    fn sheet_with_blocks(cell: u32, blocks: &[(u32, u32, u32, u32)]) -> Sheet {
        let cols = blocks.len() as u32;
        let mut img = RgbaImage::from_pixel(cell * cols, cell, WHITE);
        for (i, &(x, y, w, h)) in blocks.iter().enumerate() {
            let ox = i as u32 * cell;
            for py in y..y + h {
                for px in x..x + w {
                    img.put_pixel(ox + px, py, INK);
                }
            }
        }
        Sheet::new(img, 1, cols).unwrap()
    }

    fn no_margin() -> RepackOptions {
        RepackOptions { padding: 1, margin: 0, ..Default::default() }
    }

    #[test]
    fn test_cell_shrinks_to_largest_content() {
        let sheet = sheet_with_blocks(40, &[(2, 2, 6, 10), (20, 20, 10, 4)]);
        let state = FrameState::new(1, 2);
        let report = repack(&sheet, &state, &no_margin()).unwrap();

        assert_eq!((report.cell_width, report.cell_height), (12, 12));
        assert_eq!(report.image.dimensions(), (24, 12));
        assert_eq!(report.reference, WHITE);
        assert_eq!(report.placed.len(), 2);
    }

    #[test]
    fn test_content_is_centered() {
        let sheet = sheet_with_blocks(40, &[(0, 0, 4, 4), (30, 30, 8, 8)]);
        let state = FrameState::new(1, 2);
        let report = repack(&sheet, &state, &no_margin()).unwrap();

        // out cell is 10x10; the 4x4 block lands at (3, 3)
        assert_eq!(report.cell_width, 10);
        let first = &report.placed[0];
        assert_eq!((first.dest_x, first.dest_y), (3, 3));
        assert_eq!(*report.image.get_pixel(3, 3), INK);
        assert_eq!(*report.image.get_pixel(2, 2), WHITE);
        assert_eq!(*report.image.get_pixel(7, 7), WHITE);

        let second = &report.placed[1];
        assert_eq!((second.dest_x, second.dest_y), (11, 1));
    }

    #[test]
    fn test_deleted_and_empty_frames_leave_no_gap() {
        let sheet = sheet_with_blocks(20, &[(2, 2, 4, 4), (0, 0, 0, 0), (5, 5, 4, 4), (1, 1, 2, 2)]);
        let mut state = FrameState::new(1, 4);
        state.toggle_deleted(3);
        let report = repack(&sheet, &state, &no_margin()).unwrap();

        let sources: Vec<usize> = report.placed.iter().map(|p| p.source_index).collect();
        assert_eq!(sources, vec![0, 2]);
        assert_eq!(report.bounds[3], None);
        assert!(!report.bounds[1].unwrap().has_content);
        // Second placed frame sits in output cell 1
        assert_eq!(report.placed[1].dest_x, report.cell_width + 1);
    }

    #[test]
    fn test_blank_sheet_keeps_cells_uncropped() {
        let sheet = sheet_with_blocks(8, &[(0, 0, 0, 0), (0, 0, 0, 0)]);
        let state = FrameState::new(1, 2);
        let report = repack(&sheet, &state, &RepackOptions::default()).unwrap();

        assert_eq!((report.cell_width, report.cell_height), (8, 8));
        assert_eq!(report.placed.len(), 2);
        assert_eq!(&report.image, sheet.image());
    }

    #[test]
    fn test_transforms_are_baked_before_bounds() {
        // A wide 12x2 bar rotated 90° becomes a 2x12 bar
        let sheet = sheet_with_blocks(20, &[(4, 9, 12, 2)]);
        let mut state = FrameState::new(1, 1);
        state.update(0, FramePatch::rotation(Rotation::Deg90));
        let report = repack(&sheet, &state, &RepackOptions { padding: 0, margin: 0, ..Default::default() }).unwrap();
        assert_eq!((report.cell_width, report.cell_height), (2, 12));
    }

    #[test]
    fn test_reference_from_first_surviving_frame() {
        let mut img = RgbaImage::from_pixel(8, 4, WHITE);
        for y in 0..4 {
            for x in 4..8 {
                img.put_pixel(x, y, Rgba([0, 200, 0, 255]));
            }
        }
        img.put_pixel(6, 2, INK);
        let sheet = Sheet::new(img, 1, 2).unwrap();
        let mut state = FrameState::new(1, 2);
        state.toggle_deleted(0);

        let report = repack(&sheet, &state, &no_margin()).unwrap();
        assert_eq!(report.reference, Rgba([0, 200, 0, 255]));
        assert_eq!(report.placed.len(), 1);
        assert_eq!(report.placed[0].content, Rect::new(2, 2, 1, 1));
    }

    #[test]
    fn test_into_sheet_keeps_grid_shape() {
        let sheet = sheet_with_blocks(20, &[(2, 2, 4, 4), (5, 5, 4, 4)]);
        let report = repack(&sheet, &FrameState::new(1, 2), &no_margin()).unwrap();
        let next = report.into_sheet(1, 2).unwrap();
        assert_eq!(next.cell_size(), (6, 6));
    }
}
