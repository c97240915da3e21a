//! Grid geometry - maps linear frame indices to sheet rectangles
//!
//! A sprite sheet is addressed as `rows × cols` equal cells in row-major
//! order: `index = row * cols + col`. Every function here is pure; the
//! geometry carries no pixels and no per-frame state.

use serde::Serialize;
use thiserror::Error;

/// Error type for invalid sheet geometry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    /// Rows or columns was zero
    #[error("grid must have at least one row and one column (got {rows}x{cols})")]
    EmptyGrid { rows: u32, cols: u32 },
    /// Image too small for the requested grid
    #[error("image {width}x{height} is too small for a {rows}x{cols} grid")]
    CellTooSmall { width: u32, height: u32, rows: u32, cols: u32 },
}

/// Axis-aligned pixel rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// Whether the point lies inside the rectangle.
    pub fn contains(&self, px: u32, py: u32) -> bool {
        px >= self.x && px < self.x + self.w && py >= self.y && py < self.y + self.h
    }
}

/// Sheet-level geometry: source image dimensions plus grid shape.
///
/// Cell dimensions are `image_width / cols` by `image_height / rows`
/// (integer division); trailing pixels that do not fill a whole cell are
/// never addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridGeometry {
    pub image_width: u32,
    pub image_height: u32,
    pub rows: u32,
    pub cols: u32,
}

impl GridGeometry {
    /// Build a geometry, rejecting grids that would produce empty cells.
    ///
    /// # Examples
    ///
    /// ```
    /// use sheetsmith::grid::GridGeometry;
    ///
    /// let grid = GridGeometry::new(200, 100, 1, 4).unwrap();
    /// assert_eq!(grid.cell_size(), (50, 100));
    /// assert!(GridGeometry::new(3, 3, 1, 4).is_err());
    /// ```
    pub fn new(image_width: u32, image_height: u32, rows: u32, cols: u32) -> Result<Self, GridError> {
        if rows == 0 || cols == 0 {
            return Err(GridError::EmptyGrid { rows, cols });
        }
        if image_width / cols == 0 || image_height / rows == 0 {
            return Err(GridError::CellTooSmall { width: image_width, height: image_height, rows, cols });
        }
        Ok(Self { image_width, image_height, rows, cols })
    }

    /// Number of cells in the grid.
    pub fn cell_count(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    /// Width and height of one cell in pixels.
    pub fn cell_size(&self) -> (u32, u32) {
        (self.image_width / self.cols, self.image_height / self.rows)
    }

    /// Source rectangle of the cell at `index`, or `None` when out of range.
    pub fn source_rect(&self, index: usize) -> Option<Rect> {
        let (row, col) = self.cell_of(index)?;
        let (cell_w, cell_h) = self.cell_size();
        Some(Rect::new(col * cell_w, row * cell_h, cell_w, cell_h))
    }

    /// `(row, col)` of a linear index.
    pub fn cell_of(&self, index: usize) -> Option<(u32, u32)> {
        if index >= self.cell_count() {
            return None;
        }
        let cols = self.cols as usize;
        Some(((index / cols) as u32, (index % cols) as u32))
    }

    /// Linear row-major index of `(row, col)`.
    pub fn index_of(&self, row: u32, col: u32) -> Option<usize> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        Some(row as usize * self.cols as usize + col as usize)
    }

    /// Cell containing the sheet pixel `(x, y)`.
    pub fn cell_at(&self, x: u32, y: u32) -> Option<(u32, u32)> {
        let (cell_w, cell_h) = self.cell_size();
        let (row, col) = (y / cell_h, x / cell_w);
        if row >= self.rows || col >= self.cols {
            return None;
        }
        Some((row, col))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_zero_rows_or_cols() {
        assert_eq!(
            GridGeometry::new(100, 100, 0, 2),
            Err(GridError::EmptyGrid { rows: 0, cols: 2 })
        );
        assert!(GridGeometry::new(100, 100, 2, 0).is_err());
    }

    #[test]
    fn test_rejects_empty_cells() {
        let err = GridGeometry::new(3, 100, 1, 4).unwrap_err();
        assert!(matches!(err, GridError::CellTooSmall { .. }));
    }

    #[test]
    fn test_source_rect_row_major() {
        let grid = GridGeometry::new(300, 200, 2, 3).unwrap();
        assert_eq!(grid.source_rect(0), Some(Rect::new(0, 0, 100, 100)));
        assert_eq!(grid.source_rect(2), Some(Rect::new(200, 0, 100, 100)));
        assert_eq!(grid.source_rect(4), Some(Rect::new(100, 100, 100, 100)));
        assert_eq!(grid.source_rect(6), None);
    }

    #[test]
    fn test_uneven_image_ignores_remainder() {
        // 101 / 2 = 50, the trailing column of pixels is never addressed
        let grid = GridGeometry::new(101, 50, 1, 2).unwrap();
        assert_eq!(grid.cell_size(), (50, 50));
        assert_eq!(grid.source_rect(1), Some(Rect::new(50, 0, 50, 50)));
        assert_eq!(grid.cell_at(100, 0), None);
    }

    #[test]
    fn test_index_and_cell_roundtrip() {
        let grid = GridGeometry::new(64, 48, 3, 4).unwrap();
        for index in 0..grid.cell_count() {
            let (row, col) = grid.cell_of(index).unwrap();
            assert_eq!(grid.index_of(row, col), Some(index));
            let rect = grid.source_rect(index).unwrap();
            assert_eq!(grid.cell_at(rect.x, rect.y), Some((row, col)));
            assert_eq!(grid.cell_at(rect.x + rect.w - 1, rect.y + rect.h - 1), Some((row, col)));
        }
    }

    #[test]
    fn test_index_of_out_of_range() {
        let grid = GridGeometry::new(64, 48, 3, 4).unwrap();
        assert_eq!(grid.index_of(3, 0), None);
        assert_eq!(grid.index_of(0, 4), None);
    }

    #[test]
    fn test_rect_contains() {
        let rect = Rect::new(10, 10, 5, 5);
        assert!(rect.contains(10, 10));
        assert!(rect.contains(14, 14));
        assert!(!rect.contains(15, 10));
    }
}
