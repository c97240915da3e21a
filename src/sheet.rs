//! Sprite sheet: a decoded image paired with the grid geometry in force

use image::RgbaImage;

use crate::grid::{GridError, GridGeometry, Rect};

/// Source image plus its `rows × cols` grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    image: RgbaImage,
    geometry: GridGeometry,
}

impl Sheet {
    /// Pair an image with a grid shape. Fails when the grid has no renderable cells.
    pub fn new(image: RgbaImage, rows: u32, cols: u32) -> Result<Self, GridError> {
        let geometry = GridGeometry::new(image.width(), image.height(), rows, cols)?;
        Ok(Self { image, geometry })
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn geometry(&self) -> GridGeometry {
        self.geometry
    }

    pub fn cell_size(&self) -> (u32, u32) {
        self.geometry.cell_size()
    }

    pub fn cell_count(&self) -> usize {
        self.geometry.cell_count()
    }

    /// Source rectangle of a grid cell.
    pub fn source_rect(&self, source_index: usize) -> Option<Rect> {
        self.geometry.source_rect(source_index)
    }

    /// Change the grid shape over the same image.
    pub fn regrid(&mut self, rows: u32, cols: u32) -> Result<(), GridError> {
        self.geometry = GridGeometry::new(self.image.width(), self.image.height(), rows, cols)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regrid_keeps_image() {
        let mut sheet = Sheet::new(RgbaImage::new(120, 60), 1, 4).unwrap();
        assert_eq!(sheet.cell_size(), (30, 60));
        sheet.regrid(2, 3).unwrap();
        assert_eq!(sheet.cell_size(), (40, 30));
        assert_eq!(sheet.cell_count(), 6);
    }

    #[test]
    fn test_regrid_failure_keeps_previous_geometry() {
        let mut sheet = Sheet::new(RgbaImage::new(8, 8), 2, 2).unwrap();
        assert!(sheet.regrid(0, 2).is_err());
        assert_eq!(sheet.geometry().rows, 2);
    }
}
