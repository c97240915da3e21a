//! Content bounds detection over a rendered cell
//!
//! Two scans exist on purpose: [`find_content_bounds`] visits every pixel and
//! is the only one allowed on paths whose output is persisted (repack,
//! export). [`find_content_bounds_sampled`] skips pixels and is meant for
//! interactive previews.

use image::RgbaImage;
use serde::Serialize;

use crate::background::BackgroundClassifier;
use crate::grid::Rect;

/// Default outward padding applied to detected bounds, in pixels
pub const DEFAULT_MARGIN: u32 = 4;

/// Inclusive bounding box of non-background pixels within one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContentBounds {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
    /// False when no content pixel was found; the box then covers the whole cell
    pub has_content: bool,
}

impl ContentBounds {
    /// Bounds covering a whole `width × height` cell, flagged as empty.
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            min_x: 0,
            min_y: 0,
            max_x: width.saturating_sub(1),
            max_y: height.saturating_sub(1),
            has_content: false,
        }
    }

    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    pub fn to_rect(&self) -> Rect {
        Rect::new(self.min_x, self.min_y, self.width(), self.height())
    }
}

/// Exhaustively find the content box of `cell`, padded by `margin`.
///
/// # Examples
///
/// ```
/// use image::{Rgba, RgbaImage};
/// use sheetsmith::background::BackgroundClassifier;
/// use sheetsmith::bounds::find_content_bounds;
///
/// let white = Rgba([255, 255, 255, 255]);
/// let mut cell = RgbaImage::from_pixel(20, 20, white);
/// cell.put_pixel(10, 12, Rgba([0, 0, 0, 255]));
///
/// let classifier = BackgroundClassifier::from_channel_tolerance(white, 40.0);
/// let bounds = find_content_bounds(&cell, &classifier, 2);
/// assert!(bounds.has_content);
/// assert_eq!((bounds.min_x, bounds.min_y, bounds.max_x, bounds.max_y), (8, 10, 12, 14));
/// ```
pub fn find_content_bounds(
    cell: &RgbaImage,
    classifier: &BackgroundClassifier,
    margin: u32,
) -> ContentBounds {
    scan(cell, classifier, margin, 1)
}

/// Stride-sampled variant of [`find_content_bounds`] for previews only.
///
/// Only every `stride`-th pixel on each axis is inspected, so thin content can
/// be missed and edges can be off by up to `stride - 1` pixels.
pub fn find_content_bounds_sampled(
    cell: &RgbaImage,
    classifier: &BackgroundClassifier,
    margin: u32,
    stride: u32,
) -> ContentBounds {
    scan(cell, classifier, margin, stride.max(1))
}

fn scan(cell: &RgbaImage, classifier: &BackgroundClassifier, margin: u32, stride: u32) -> ContentBounds {
    let (width, height) = cell.dimensions();
    if width == 0 || height == 0 {
        return ContentBounds::empty(width, height);
    }

    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0;
    let mut max_y = 0;
    let mut found = false;

    for y in (0..height).step_by(stride as usize) {
        for x in (0..width).step_by(stride as usize) {
            if classifier.is_background(*cell.get_pixel(x, y)) {
                continue;
            }
            found = true;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }

    if !found {
        return ContentBounds::empty(width, height);
    }

    ContentBounds {
        min_x: min_x.saturating_sub(margin),
        min_y: min_y.saturating_sub(margin),
        max_x: (max_x + margin).min(width - 1),
        max_y: (max_y + margin).min(height - 1),
        has_content: true,
    }
}
