//! Raster surface - an owned RGBA bitmap with region and affine-copy operations
//!
//! Every higher layer touches pixels only through [`Surface`]. Scratch
//! surfaces are created by the caller and passed by `&mut`, so there is no
//! shared drawing context between renders.

use image::{Rgba, RgbaImage};
use thiserror::Error;

use crate::background::BackgroundClassifier;
use crate::grid::Rect;

/// Transparent color used for cleared surfaces
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Largest surface edge we are willing to allocate
pub const MAX_SURFACE_EDGE: u32 = 16384;

/// Error type for surface acquisition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    /// Width or height was zero
    #[error("cannot create a {width}x{height} surface")]
    ZeroSized { width: u32, height: u32 },
    /// Requested surface exceeds [`MAX_SURFACE_EDGE`]
    #[error("surface {width}x{height} exceeds the {}px edge limit", MAX_SURFACE_EDGE)]
    TooLarge { width: u32, height: u32 },
}

/// How a source region is drawn centered onto a surface.
///
/// Mirrors a 2D canvas call sequence: translate to the destination center,
/// rotate, scale (negative X for a horizontal flip), then draw the source
/// centered at the new origin at `width × height`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CenteredDraw {
    /// `(cos, sin)` of the rotation angle, clockwise in image space
    pub cos_sin: (f32, f32),
    pub scale_x: f32,
    pub scale_y: f32,
    /// Drawn size of the source before scaling
    pub width: u32,
    pub height: u32,
}

/// Owned RGBA drawing surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    image: RgbaImage,
}

impl Surface {
    /// Allocate a transparent surface.
    pub fn new(width: u32, height: u32) -> Result<Self, SurfaceError> {
        Self::filled(width, height, TRANSPARENT)
    }

    /// Allocate a surface filled with `color`.
    pub fn filled(width: u32, height: u32, color: Rgba<u8>) -> Result<Self, SurfaceError> {
        check_dimensions(width, height)?;
        Ok(Self { image: RgbaImage::from_pixel(width, height, color) })
    }

    /// Wrap an existing image.
    pub fn from_image(image: RgbaImage) -> Result<Self, SurfaceError> {
        check_dimensions(image.width(), image.height())?;
        Ok(Self { image })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Reset every pixel to transparent.
    pub fn clear(&mut self) {
        self.fill(TRANSPARENT);
    }

    pub fn fill(&mut self, color: Rgba<u8>) {
        for pixel in self.image.pixels_mut() {
            *pixel = color;
        }
    }

    /// Read a pixel, `None` outside the surface.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba<u8>> {
        if x < self.width() && y < self.height() {
            Some(*self.image.get_pixel(x, y))
        } else {
            None
        }
    }

    /// Write a pixel. Writes outside the surface are dropped.
    pub fn set_pixel(&mut self, x: u32, y: u32, color: Rgba<u8>) {
        if x < self.width() && y < self.height() {
            self.image.put_pixel(x, y, color);
        }
    }

    /// Composite `src_rect` of `src` source-over at `(x, y)`, clipped to both images.
    pub fn draw_region(&mut self, src: &RgbaImage, src_rect: Rect, x: u32, y: u32) {
        for dy in 0..src_rect.h {
            for dx in 0..src_rect.w {
                let (sx, sy) = (src_rect.x + dx, src_rect.y + dy);
                if sx >= src.width() || sy >= src.height() {
                    continue;
                }
                let (tx, ty) = (x + dx, y + dy);
                if tx < self.width() && ty < self.height() {
                    let under = self.image.get_pixel_mut(tx, ty);
                    *under = blend_over(*src.get_pixel(sx, sy), *under);
                }
            }
        }
    }

    /// Draw `src_rect` of `src` through an affine transform about the surface center.
    ///
    /// Each destination pixel is mapped back through the inverse transform and
    /// sampled nearest-neighbour; pixels that land outside the drawn source are
    /// left untouched. Drawn pixels are composited source-over.
    pub fn draw_centered(&mut self, src: &RgbaImage, src_rect: Rect, draw: &CenteredDraw) {
        if src_rect.w == 0 || src_rect.h == 0 || draw.width == 0 || draw.height == 0 {
            return;
        }
        if draw.scale_x == 0.0 || draw.scale_y == 0.0 {
            return;
        }

        let (cos, sin) = draw.cos_sin;
        let cx = self.width() as f32 / 2.0;
        let cy = self.height() as f32 / 2.0;
        let half_w = draw.width as f32 / 2.0;
        let half_h = draw.height as f32 / 2.0;
        let step_x = src_rect.w as f32 / draw.width as f32;
        let step_y = src_rect.h as f32 / draw.height as f32;

        for py in 0..self.height() {
            for px in 0..self.width() {
                // Destination pixel center, relative to the translated origin
                let x = px as f32 + 0.5 - cx;
                let y = py as f32 + 0.5 - cy;

                // Undo rotation, then undo scale
                let rx = cos * x + sin * y;
                let ry = -sin * x + cos * y;
                let u = rx / draw.scale_x + half_w;
                let v = ry / draw.scale_y + half_h;

                if u < 0.0 || v < 0.0 || u >= draw.width as f32 || v >= draw.height as f32 {
                    continue;
                }

                let sx = src_rect.x + ((u * step_x) as u32).min(src_rect.w - 1);
                let sy = src_rect.y + ((v * step_y) as u32).min(src_rect.h - 1);
                if sx >= src.width() || sy >= src.height() {
                    continue;
                }

                let over = *src.get_pixel(sx, sy);
                let under = self.image.get_pixel_mut(px, py);
                *under = blend_over(over, *under);
            }
        }
    }

    /// Make every pixel matching `classifier` fully transparent.
    ///
    /// Returns the number of pixels cleared.
    pub fn mask_matching(&mut self, classifier: &BackgroundClassifier) -> usize {
        let mut cleared = 0;
        for pixel in self.image.pixels_mut() {
            if pixel[3] != 0 && classifier.matches(*pixel) {
                *pixel = TRANSPARENT;
                cleared += 1;
            }
        }
        cleared
    }
}

fn check_dimensions(width: u32, height: u32) -> Result<(), SurfaceError> {
    if width == 0 || height == 0 {
        return Err(SurfaceError::ZeroSized { width, height });
    }
    if width > MAX_SURFACE_EDGE || height > MAX_SURFACE_EDGE {
        return Err(SurfaceError::TooLarge { width, height });
    }
    Ok(())
}

/// Source-over compositing of straight (non-premultiplied) RGBA.
fn blend_over(src: Rgba<u8>, dst: Rgba<u8>) -> Rgba<u8> {
    let sa = src[3] as u32;
    if sa == 255 || dst[3] == 0 {
        return src;
    }
    if sa == 0 {
        return dst;
    }

    let da = dst[3] as u32;
    // out_a = sa + da * (1 - sa), all in 0..=255 fixed point
    let out_a = sa + da * (255 - sa) / 255;
    if out_a == 0 {
        return TRANSPARENT;
    }

    let mut out = [0u8; 4];
    for c in 0..3 {
        let value = (src[c] as u32 * sa + dst[c] as u32 * da * (255 - sa) / 255) / out_a;
        out[c] = value.min(255) as u8;
    }
    out[3] = out_a.min(255) as u8;
    Rgba(out)
}
