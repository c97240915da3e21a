//! Reading sheets from disk and writing PNG and GIF results

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, RgbaImage};
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for output operations
#[derive(Debug, Error)]
pub enum OutputError {
    /// IO error during file operations
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// Image decoding or encoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Decode any supported image file into RGBA pixels.
pub fn load_image(path: &Path) -> Result<RgbaImage, OutputError> {
    Ok(image::open(path)?.to_rgba8())
}

fn ensure_parent(path: &Path) -> Result<(), OutputError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Save an RGBA image to a PNG file, creating parent directories.
pub fn save_png(image: &RgbaImage, path: &Path) -> Result<(), OutputError> {
    ensure_parent(path)?;
    image.save_with_format(path, image::ImageFormat::Png)?;
    Ok(())
}

/// Path for one sliced frame: `dir/{stem}_{position}.png`, zero-padded to
/// the width of the largest position so files sort in display order.
pub fn frame_output_path(dir: &Path, stem: &str, position: usize, total: usize) -> PathBuf {
    let digits = total.saturating_sub(1).max(1).to_string().len();
    dir.join(format!("{}_{:0width$}.png", stem, position, width = digits))
}

/// Render a sequence of frames as a looping animated GIF.
///
/// An empty sequence writes nothing.
pub fn render_gif(frames: &[RgbaImage], fps: u32, path: &Path) -> Result<(), OutputError> {
    if frames.is_empty() {
        return Ok(());
    }

    ensure_parent(path)?;
    let file = File::create(path)?;
    let mut encoder = GifEncoder::new(BufWriter::new(file));
    encoder.set_repeat(Repeat::Infinite)?;

    let delay = frame_delay(fps);
    for image in frames {
        encoder.encode_frame(Frame::from_parts(image.clone(), 0, 0, delay))?;
    }

    Ok(())
}

/// Per-frame delay for `fps`, rounded to the nearest GIF centisecond.
///
/// The encoder truncates to whole centiseconds, and viewers replace delays
/// under 2cs with 100ms, so the rounding and the floor happen here.
fn frame_delay(fps: u32) -> Delay {
    let fps = fps.max(1);
    let centis = ((200 + fps) / (2 * fps)).max(2);
    Delay::from_numer_denom_ms(centis * 10, 1)
}
