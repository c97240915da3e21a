//! Frame state model - per-frame edit records independent of the pixels
//!
//! The sequence is indexed by display position (playback and export order).
//! Each record remembers which grid cell its pixels come from through
//! `source_index`, so reordering never touches the source image.

use image::RgbaImage;
use serde::Serialize;

/// Smallest allowed per-frame scale
pub const MIN_SCALE: f32 = 0.5;

/// Largest allowed per-frame scale
pub const MAX_SCALE: f32 = 2.0;

/// Quarter-turn rotation applied about the cell center
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Parse a rotation from degrees. Accepts any multiple of 90, negative included.
    pub fn from_degrees(degrees: i32) -> Option<Self> {
        if degrees % 90 != 0 {
            return None;
        }
        match degrees.rem_euclid(360) {
            0 => Some(Rotation::Deg0),
            90 => Some(Rotation::Deg90),
            180 => Some(Rotation::Deg180),
            270 => Some(Rotation::Deg270),
            _ => None,
        }
    }

    pub fn degrees(self) -> u32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// Exact `(cos, sin)` of the angle.
    pub(crate) fn cos_sin(self) -> (f32, f32) {
        match self {
            Rotation::Deg0 => (1.0, 0.0),
            Rotation::Deg90 => (0.0, 1.0),
            Rotation::Deg180 => (-1.0, 0.0),
            Rotation::Deg270 => (0.0, -1.0),
        }
    }
}

/// Editable state of one animation frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRecord {
    /// Grid cell the pixels come from. Never changes after creation.
    pub source_index: usize,
    pub rotation: Rotation,
    /// Uniform scale about the cell center, kept within [`MIN_SCALE`, `MAX_SCALE`]
    pub scale: f32,
    pub flip_horizontal: bool,
    pub deleted: bool,
    /// Replacement pixels, already sized to one cell
    pub override_image: Option<RgbaImage>,
}

impl FrameRecord {
    /// Identity record for a grid cell.
    pub fn identity(source_index: usize) -> Self {
        Self {
            source_index,
            rotation: Rotation::Deg0,
            scale: 1.0,
            flip_horizontal: false,
            deleted: false,
            override_image: None,
        }
    }

    /// Whether rendering this record reproduces the source cell untouched.
    pub fn is_identity(&self) -> bool {
        self.rotation == Rotation::Deg0
            && self.scale == 1.0
            && !self.flip_horizontal
            && self.override_image.is_none()
    }

    fn apply(&mut self, patch: FramePatch) {
        if let Some(rotation) = patch.rotation {
            self.rotation = rotation;
        }
        if let Some(scale) = patch.scale {
            self.scale = clamp_scale(scale);
        }
        if let Some(flip) = patch.flip_horizontal {
            self.flip_horizontal = flip;
        }
        if let Some(deleted) = patch.deleted {
            self.deleted = deleted;
        }
        if let Some(override_image) = patch.override_image {
            self.override_image = override_image;
        }
    }
}

/// Partial update merged into a [`FrameRecord`]. `None` leaves a field alone.
#[derive(Debug, Clone, Default)]
pub struct FramePatch {
    pub rotation: Option<Rotation>,
    pub scale: Option<f32>,
    pub flip_horizontal: Option<bool>,
    pub deleted: Option<bool>,
    /// `Some(None)` clears an override, `Some(Some(img))` sets one
    pub override_image: Option<Option<RgbaImage>>,
}

impl FramePatch {
    pub fn rotation(rotation: Rotation) -> Self {
        Self { rotation: Some(rotation), ..Default::default() }
    }

    pub fn scale(scale: f32) -> Self {
        Self { scale: Some(scale), ..Default::default() }
    }

    pub fn flip(flip_horizontal: bool) -> Self {
        Self { flip_horizontal: Some(flip_horizontal), ..Default::default() }
    }

    pub fn override_image(image: Option<RgbaImage>) -> Self {
        Self { override_image: Some(image), ..Default::default() }
    }
}

/// Clamp a scale into the allowed range. NaN collapses to 1.0.
pub fn clamp_scale(scale: f32) -> f32 {
    if scale.is_nan() {
        1.0
    } else {
        scale.clamp(MIN_SCALE, MAX_SCALE)
    }
}

/// Ordered per-frame records for one sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameState {
    records: Vec<FrameRecord>,
    active_frame_count: usize,
}

impl Default for FrameState {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl FrameState {
    /// Fresh identity state for a `rows × cols` grid.
    pub fn new(rows: u32, cols: u32) -> Self {
        let mut state = Self { records: Vec::new(), active_frame_count: 1 };
        state.initialize(rows, cols);
        state
    }

    /// Replace every record with identity records, one per cell.
    ///
    /// Playback scope resets to the whole grid.
    pub fn initialize(&mut self, rows: u32, cols: u32) {
        let count = rows as usize * cols as usize;
        self.records = (0..count).map(FrameRecord::identity).collect();
        self.active_frame_count = count.max(1);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&FrameRecord> {
        self.records.get(position)
    }

    /// Records in display order.
    pub fn records(&self) -> &[FrameRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &FrameRecord> {
        self.records.iter()
    }

    /// Merge `patch` into the record at `position`. Invalid positions are ignored.
    pub fn update(&mut self, position: usize, patch: FramePatch) {
        if let Some(record) = self.records.get_mut(position) {
            record.apply(patch);
        }
    }

    /// Exchange two records wholesale. Invalid positions are ignored.
    pub fn swap(&mut self, a: usize, b: usize) {
        if a < self.records.len() && b < self.records.len() {
            self.records.swap(a, b);
        }
    }

    /// Flip the deleted flag of the record at `position`.
    pub fn toggle_deleted(&mut self, position: usize) {
        if let Some(record) = self.records.get_mut(position) {
            record.deleted = !record.deleted;
        }
    }

    /// Bring a deleted frame back.
    pub fn restore(&mut self, position: usize) {
        if let Some(record) = self.records.get_mut(position) {
            record.deleted = false;
        }
    }

    /// Display positions of frames that are not deleted.
    pub fn live_positions(&self) -> Vec<usize> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| !r.deleted)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn deleted_count(&self) -> usize {
        self.records.iter().filter(|r| r.deleted).count()
    }

    /// Number of leading display positions the playback loop covers.
    pub fn active_frame_count(&self) -> usize {
        self.active_frame_count
    }

    /// Set the playback scope, clamped to `[1, len]`.
    pub fn set_active_frame_count(&mut self, count: usize) {
        self.active_frame_count = count.clamp(1, self.records.len().max(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn source_indices(state: &FrameState) -> Vec<usize> {
        state.iter().map(|r| r.source_index).collect()
    }

    #[test]
    fn test_initialize_identity() {
        let state = FrameState::new(2, 3);
        assert_eq!(state.len(), 6);
        assert_eq!(source_indices(&state), vec![0, 1, 2, 3, 4, 5]);
        assert!(state.iter().all(FrameRecord::is_identity));
        assert_eq!(state.active_frame_count(), 6);
    }

    #[test]
    fn test_update_merges_fields() {
        let mut state = FrameState::new(1, 2);
        state.update(1, FramePatch::rotation(Rotation::Deg90));
        state.update(1, FramePatch::flip(true));

        let record = state.get(1).unwrap();
        assert_eq!(record.rotation, Rotation::Deg90);
        assert!(record.flip_horizontal);
        assert_eq!(record.scale, 1.0);
        assert!(state.get(0).unwrap().is_identity());
    }

    #[test]
    fn test_update_invalid_position_is_noop() {
        let mut state = FrameState::new(1, 2);
        let before = state.clone();
        state.update(7, FramePatch::scale(1.5));
        assert_eq!(state, before);
    }

    #[test]
    fn test_scale_is_clamped() {
        let mut state = FrameState::new(1, 1);
        state.update(0, FramePatch::scale(5.0));
        assert_eq!(state.get(0).unwrap().scale, MAX_SCALE);
        state.update(0, FramePatch::scale(0.1));
        assert_eq!(state.get(0).unwrap().scale, MIN_SCALE);
        state.update(0, FramePatch::scale(f32::NAN));
        assert_eq!(state.get(0).unwrap().scale, 1.0);
    }

    #[test]
    fn test_swap_moves_whole_record() {
        let mut state = FrameState::new(1, 3);
        state.update(0, FramePatch::rotation(Rotation::Deg180));
        state.swap(0, 2);

        assert_eq!(source_indices(&state), vec![2, 1, 0]);
        assert_eq!(state.get(2).unwrap().rotation, Rotation::Deg180);
        assert_eq!(state.get(0).unwrap().rotation, Rotation::Deg0);
    }

    #[test]
    fn test_swap_out_of_range_is_noop() {
        let mut state = FrameState::new(1, 3);
        state.swap(0, 3);
        assert_eq!(source_indices(&state), vec![0, 1, 2]);
    }

    #[test]
    fn test_toggle_and_restore_deleted() {
        let mut state = FrameState::new(2, 2);
        state.toggle_deleted(3);
        state.toggle_deleted(1);
        assert_eq!(state.live_positions(), vec![0, 2]);
        assert_eq!(state.deleted_count(), 2);

        state.toggle_deleted(1);
        state.restore(3);
        assert_eq!(state.live_positions(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_override_set_and_clear() {
        let mut state = FrameState::new(1, 1);
        let img = RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 255]));
        state.update(0, FramePatch::override_image(Some(img)));
        assert!(state.get(0).unwrap().override_image.is_some());
        assert!(!state.get(0).unwrap().is_identity());

        state.update(0, FramePatch::override_image(None));
        assert!(state.get(0).unwrap().override_image.is_none());
    }

    #[test]
    fn test_active_frame_count_clamped() {
        let mut state = FrameState::new(2, 3);
        state.set_active_frame_count(0);
        assert_eq!(state.active_frame_count(), 1);
        state.set_active_frame_count(100);
        assert_eq!(state.active_frame_count(), 6);
        state.set_active_frame_count(4);
        assert_eq!(state.active_frame_count(), 4);
    }

    #[test]
    fn test_rotation_from_degrees() {
        assert_eq!(Rotation::from_degrees(0), Some(Rotation::Deg0));
        assert_eq!(Rotation::from_degrees(450), Some(Rotation::Deg90));
        assert_eq!(Rotation::from_degrees(-90), Some(Rotation::Deg270));
        assert_eq!(Rotation::from_degrees(45), None);
        assert_eq!(Rotation::Deg180.degrees(), 180);
    }
}
