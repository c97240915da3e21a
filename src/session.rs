//! Editing session - owns the sheet, frame state, scratch surface and playback
//!
//! All mutation goes through `&mut Session` on one thread. Rendering is an
//! explicit call; nothing re-renders on its own. Until an image is loaded,
//! render, export and repack calls return `Ok(None)`.
//!
//! Repack can run deferred: [`Session::begin_repack`] snapshots the state and
//! marks the session busy, the returned [`RepackJob`] can run anywhere, and
//! [`Session::finish_repack`] commits or abandons the result. Edits are
//! refused while busy.

use image::RgbaImage;
use thiserror::Error;

use crate::background::BackgroundClassifier;
use crate::color::BackgroundChoice;
use crate::export::{export_sheet, ExportOptions, SheetExport};
use crate::frames::{FramePatch, FrameRecord, FrameState};
use crate::grid::GridError;
use crate::playback::Playback;
use crate::redraw::{encode_png_base64, request_variations, ImageGenerator, RedrawError, RedrawRequest, VariationSet};
use crate::render::{cell_surface, fit_to_cell, render_frame, render_preview, render_thumbnail};
use crate::repack::{repack, PlacedFrame, RepackOptions, RepackReport};
use crate::sheet::Sheet;
use crate::surface::{Surface, SurfaceError};

/// Error type for session operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    /// A repack is in progress
    #[error("a repack is in progress")]
    Busy,
    #[error("no repack in progress")]
    NotBusy,
    #[error("frame position {0} is out of range")]
    InvalidPosition(usize),
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error(transparent)]
    Surface(#[from] SurfaceError),
    #[error(transparent)]
    Redraw(#[from] RedrawError),
}

/// What a committed repack changed
#[derive(Debug, Clone, PartialEq)]
pub struct RepackSummary {
    pub cell_width: u32,
    pub cell_height: u32,
    pub placed: Vec<PlacedFrame>,
}

/// Snapshot of the work a repack needs, detached from the session.
#[derive(Debug, Clone)]
pub struct RepackJob {
    sheet: Sheet,
    frames: FrameState,
    options: RepackOptions,
}

impl RepackJob {
    pub fn run(&self) -> Result<RepackReport, SurfaceError> {
        repack(&self.sheet, &self.frames, &self.options)
    }
}

/// One editing session over one sheet.
#[derive(Debug, Default)]
pub struct Session {
    sheet: Option<Sheet>,
    frames: FrameState,
    playback: Playback,
    repack_options: RepackOptions,
    scratch: Option<Surface>,
    busy: bool,
}

impl Session {
    pub fn new(repack_options: RepackOptions, playback: Playback) -> Self {
        Self {
            repack_options,
            playback,
            ..Default::default()
        }
    }

    /// Load a new image, discarding all edits.
    pub fn load_image(&mut self, image: RgbaImage, rows: u32, cols: u32) -> Result<(), SessionError> {
        self.ensure_idle()?;
        let sheet = Sheet::new(image, rows, cols)?;
        self.frames.initialize(rows, cols);
        self.sheet = Some(sheet);
        self.scratch = None;
        self.playback.seek(0, &self.frames);
        Ok(())
    }

    /// Change the grid shape.
    ///
    /// Edits survive when the cell count is unchanged; otherwise the frame
    /// state is rebuilt. The playback scope is clamped either way.
    pub fn set_grid(&mut self, rows: u32, cols: u32) -> Result<(), SessionError> {
        self.ensure_idle()?;
        let Some(sheet) = self.sheet.as_mut() else {
            return Ok(());
        };
        let previous = sheet.cell_count();
        sheet.regrid(rows, cols)?;
        self.scratch = None;

        if sheet.cell_count() != previous {
            let active = self.frames.active_frame_count();
            self.frames.initialize(rows, cols);
            self.frames.set_active_frame_count(active);
            tracing::debug!(rows, cols, "grid size changed, frame state reset");
        }
        self.playback.seek(self.playback.cursor(), &self.frames);
        Ok(())
    }

    pub fn sheet(&self) -> Option<&Sheet> {
        self.sheet.as_ref()
    }

    pub fn frames(&self) -> &FrameState {
        &self.frames
    }

    pub fn playback(&self) -> &Playback {
        &self.playback
    }

    pub fn playback_mut(&mut self) -> &mut Playback {
        &mut self.playback
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Merge a partial update into one frame. Override images are fitted to the cell.
    pub fn update_frame(&mut self, position: usize, mut patch: FramePatch) -> Result<(), SessionError> {
        self.ensure_idle()?;
        if let Some(sheet) = &self.sheet {
            patch.override_image = match patch.override_image.take() {
                Some(Some(image)) => Some(Some(fit_to_cell(sheet, image))),
                other => other,
            };
        }
        self.frames.update(position, patch);
        Ok(())
    }

    pub fn swap_frames(&mut self, a: usize, b: usize) -> Result<(), SessionError> {
        self.ensure_idle()?;
        self.frames.swap(a, b);
        Ok(())
    }

    pub fn toggle_deleted(&mut self, position: usize) -> Result<(), SessionError> {
        self.ensure_idle()?;
        self.frames.toggle_deleted(position);
        Ok(())
    }

    pub fn restore_frame(&mut self, position: usize) -> Result<(), SessionError> {
        self.ensure_idle()?;
        self.frames.restore(position);
        Ok(())
    }

    pub fn set_active_frame_count(&mut self, count: usize) {
        self.frames.set_active_frame_count(count);
    }

    /// Replace a frame's pixels with a (redrawn) image, resized to the cell.
    pub fn apply_override(&mut self, position: usize, image: RgbaImage) -> Result<(), SessionError> {
        self.update_frame(position, FramePatch::override_image(Some(image)))
    }

    pub fn clear_override(&mut self, position: usize) -> Result<(), SessionError> {
        self.update_frame(position, FramePatch::override_image(None))
    }

    /// Advance playback to `now_ms`. Returns the number of steps taken.
    pub fn tick(&mut self, now_ms: f64) -> usize {
        if self.sheet.is_none() {
            return 0;
        }
        self.playback.tick(now_ms, &self.frames)
    }

    /// Render the frame at a display position.
    pub fn render_frame(&mut self, position: usize) -> Result<Option<RgbaImage>, SessionError> {
        self.render_preview(position, None)
    }

    /// Render the frame at a display position, optionally masking a key color.
    pub fn render_preview(
        &mut self,
        position: usize,
        mask: Option<&BackgroundClassifier>,
    ) -> Result<Option<RgbaImage>, SessionError> {
        let Some(sheet) = self.sheet.as_ref() else {
            return Ok(None);
        };
        let record = self.frames.get(position).ok_or(SessionError::InvalidPosition(position))?;
        let scratch = acquire_scratch(&mut self.scratch, sheet)?;
        render_preview(sheet, record, scratch, mask);
        Ok(Some(scratch.image().clone()))
    }

    /// Render the frame under the playback cursor.
    pub fn render_current(&mut self) -> Result<Option<RgbaImage>, SessionError> {
        let position = self.playback.cursor();
        self.render_frame(position)
    }

    pub fn thumbnail(&self, position: usize, max_edge: u32) -> Result<Option<RgbaImage>, SessionError> {
        let Some(sheet) = self.sheet.as_ref() else {
            return Ok(None);
        };
        let record = self.frames.get(position).ok_or(SessionError::InvalidPosition(position))?;
        Ok(Some(render_thumbnail(sheet, record, max_edge)?))
    }

    /// Compose the gap-free export sheet.
    pub fn export(&self, options: &ExportOptions) -> Result<Option<SheetExport>, SessionError> {
        match self.sheet.as_ref() {
            Some(sheet) => Ok(Some(export_sheet(sheet, &self.frames, options)?)),
            None => Ok(None),
        }
    }

    /// Snapshot the state for a deferred repack and mark the session busy.
    pub fn begin_repack(&mut self) -> Result<Option<RepackJob>, SessionError> {
        self.ensure_idle()?;
        let Some(sheet) = self.sheet.as_ref() else {
            return Ok(None);
        };
        let job = RepackJob {
            sheet: sheet.clone(),
            frames: self.frames.clone(),
            options: self.repack_options,
        };
        self.busy = true;
        Ok(Some(job))
    }

    /// Commit a finished repack, or clear the busy flag if it failed.
    ///
    /// On success the repacked image becomes the new baseline and every frame
    /// returns to identity.
    pub fn finish_repack(
        &mut self,
        result: Result<RepackReport, SurfaceError>,
    ) -> Result<RepackSummary, SessionError> {
        if !self.busy {
            return Err(SessionError::NotBusy);
        }
        self.busy = false;

        let report = result?;
        let Some(geometry) = self.sheet.as_ref().map(Sheet::geometry) else {
            return Err(SessionError::NotBusy);
        };
        let summary = RepackSummary {
            cell_width: report.cell_width,
            cell_height: report.cell_height,
            placed: report.placed.clone(),
        };

        let sheet = report.into_sheet(geometry.rows, geometry.cols)?;
        let active = self.frames.active_frame_count();
        self.frames.initialize(geometry.rows, geometry.cols);
        self.frames.set_active_frame_count(active);
        self.sheet = Some(sheet);
        self.scratch = None;
        self.playback.seek(0, &self.frames);

        tracing::debug!(
            cell_width = summary.cell_width,
            cell_height = summary.cell_height,
            frames = summary.placed.len(),
            "repack committed as new baseline"
        );
        Ok(summary)
    }

    /// Run a repack synchronously and commit it.
    pub fn repack(&mut self) -> Result<Option<RepackSummary>, SessionError> {
        let Some(job) = self.begin_repack()? else {
            return Ok(None);
        };
        let result = job.run();
        self.finish_repack(result).map(Some)
    }

    /// The rendered frame as base64 PNG, ready to send as a redraw reference.
    pub fn frame_png_base64(&mut self, position: usize) -> Result<Option<String>, SessionError> {
        match self.render_frame(position)? {
            Some(image) => Ok(Some(encode_png_base64(&image)?)),
            None => Ok(None),
        }
    }

    /// Build a redraw request for the frame at `position`.
    pub fn redraw_request(
        &mut self,
        position: usize,
        instruction: &str,
        background: BackgroundChoice,
        model: &str,
    ) -> Result<Option<RedrawRequest>, SessionError> {
        let Some(reference) = self.frame_png_base64(position)? else {
            return Ok(None);
        };
        Ok(Some(RedrawRequest {
            reference_png_base64: reference,
            instruction: instruction.to_string(),
            background,
            model: model.to_string(),
        }))
    }

    /// Ask the generator for `count` redraws of one frame.
    ///
    /// Frame state is not touched; pick a result and pass it to
    /// [`apply_override`](Self::apply_override).
    pub fn request_redraws(
        &mut self,
        generator: &dyn ImageGenerator,
        position: usize,
        instruction: &str,
        background: BackgroundChoice,
        model: &str,
        count: usize,
    ) -> Result<VariationSet, SessionError> {
        match self.redraw_request(position, instruction, background, model)? {
            Some(request) => Ok(request_variations(generator, &request, count)),
            None => Ok(VariationSet::default()),
        }
    }

    /// Record at a display position.
    pub fn frame(&self, position: usize) -> Option<&FrameRecord> {
        self.frames.get(position)
    }

    fn ensure_idle(&self) -> Result<(), SessionError> {
        if self.busy {
            Err(SessionError::Busy)
        } else {
            Ok(())
        }
    }
}

/// Reuse the session scratch surface, reallocating when the cell size changed.
fn acquire_scratch<'a>(slot: &'a mut Option<Surface>, sheet: &Sheet) -> Result<&'a mut Surface, SurfaceError> {
    let (cell_w, cell_h) = sheet.cell_size();
    let surface = match slot.take() {
        Some(surface) if surface.width() == cell_w && surface.height() == cell_h => surface,
        _ => Surface::new(cell_w, cell_h)?,
    };
    Ok(slot.insert(surface))
}

/// Render every live frame of the active loop, in playback order.
pub fn loop_frames(session: &Session) -> Result<Vec<RgbaImage>, SessionError> {
    let Some(sheet) = session.sheet() else {
        return Ok(Vec::new());
    };
    let mut scratch = cell_surface(sheet)?;
    let positions = crate::playback::loop_positions(session.frames(), session.playback().skip_deleted());
    let mut frames = Vec::with_capacity(positions.len());
    for position in positions {
        if let Some(record) = session.frames().get(position) {
            render_frame(sheet, record, &mut scratch);
            frames.push(scratch.image().clone());
        }
    }
    Ok(frames)
}
