//! AI redraw collaborator - request/response types and variation fan-out
//!
//! The remote image-generation call is behind [`ImageGenerator`]; this crate
//! only builds requests, decodes responses and collects variations. Transport,
//! authentication and retries belong to the implementor.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, RgbaImage};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::color::BackgroundChoice;
use crate::render::Warning;

/// Error type for redraw requests
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RedrawError {
    /// The service answered without image content
    #[error("no image returned: {0}")]
    NoImage(String),
    /// Transport or service failure reported by the generator
    #[error("image service failed: {0}")]
    Service(String),
    #[error("invalid base64 image data: {0}")]
    Base64(String),
    #[error("cannot decode generated image: {0}")]
    Decode(String),
    #[error("cannot encode reference image: {0}")]
    Encode(String),
}

/// One generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedrawRequest {
    /// Reference frame as base64 PNG (no data-URL prefix)
    pub reference_png_base64: String,
    pub instruction: String,
    pub background: BackgroundChoice,
    /// Opaque model selector forwarded to the service
    pub model: String,
}

/// A single generated raster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub data_base64: String,
    pub mime_type: String,
}

/// The image generation service.
///
/// Implementations are called concurrently from a thread pool, one call per
/// requested variation.
pub trait ImageGenerator: Sync {
    fn generate(&self, request: &RedrawRequest) -> Result<GeneratedImage, RedrawError>;
}

/// Collected outcome of [`request_variations`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariationSet {
    /// Decoded images, `images[i]` produced by request `i`
    pub images: Vec<RgbaImage>,
    pub warnings: Vec<Warning>,
}

impl VariationSet {
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Issue `count` independent requests concurrently and collect every result.
///
/// The set is all-or-nothing: if any request fails, no images are returned
/// and the failure is reported as a warning.
pub fn request_variations(
    generator: &dyn ImageGenerator,
    request: &RedrawRequest,
    count: usize,
) -> VariationSet {
    tracing::debug!(count, background = request.background.name(), model = %request.model, "requesting redraw variations");
    let results: Vec<Result<RgbaImage, RedrawError>> = (0..count)
        .into_par_iter()
        .map(|_| generator.generate(request).and_then(|generated| decode_generated(&generated)))
        .collect();

    let mut images = Vec::with_capacity(count);
    let mut warnings = Vec::new();
    for (index, result) in results.into_iter().enumerate() {
        match result {
            Ok(image) => images.push(image),
            Err(e) => {
                tracing::warn!(variation = index, error = %e, "redraw variation failed");
                warnings.push(Warning::new(format!("variation {} failed: {}", index + 1, e)));
            }
        }
    }

    if !warnings.is_empty() {
        images.clear();
    }
    VariationSet { images, warnings }
}

/// Decode a generated raster into RGBA pixels.
///
/// Accepts plain base64 or a `data:<mime>;base64,` URL.
pub fn decode_generated(generated: &GeneratedImage) -> Result<RgbaImage, RedrawError> {
    let data = generated.data_base64.trim();
    if data.is_empty() {
        return Err(RedrawError::NoImage(format!("empty {} payload", generated.mime_type)));
    }
    let payload = match data.split_once(";base64,") {
        Some((_, rest)) if data.starts_with("data:") => rest,
        _ => data,
    };

    let bytes = STANDARD.decode(payload).map_err(|e| RedrawError::Base64(e.to_string()))?;
    let image = image::load_from_memory(&bytes).map_err(|e| RedrawError::Decode(e.to_string()))?;
    Ok(image.to_rgba8())
}

/// Encode an image as base64 PNG for use as a request reference.
pub fn encode_png_base64(image: &RgbaImage) -> Result<String, RedrawError> {
    let mut bytes = Cursor::new(Vec::new());
    PngEncoder::new(&mut bytes)
        .write_image(image.as_raw(), image.width(), image.height(), ColorType::Rgba8)
        .map_err(|e| RedrawError::Encode(e.to_string()))?;
    Ok(STANDARD.encode(bytes.into_inner()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers every call with a solid image whose red channel is the call number
    struct CountingGenerator {
        calls: AtomicUsize,
        fail_on: Option<usize>,
    }

    impl ImageGenerator for CountingGenerator {
        fn generate(&self, _request: &RedrawRequest) -> Result<GeneratedImage, RedrawError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if Some(call) == self.fail_on {
                return Err(RedrawError::NoImage("model refused".to_string()));
            }
            let img = RgbaImage::from_pixel(2, 2, Rgba([call as u8, 0, 0, 255]));
            Ok(GeneratedImage {
                data_base64: encode_png_base64(&img).unwrap(),
                mime_type: "image/png".to_string(),
            })
        }
    }

    fn request() -> RedrawRequest {
        RedrawRequest {
            reference_png_base64: String::new(),
            instruction: "make the cape red".to_string(),
            background: BackgroundChoice::Green,
            model: "test-model".to_string(),
        }
    }

    #[test]
    fn test_all_variations_collected() {
        let generator = CountingGenerator { calls: AtomicUsize::new(0), fail_on: None };
        let set = request_variations(&generator, &request(), 4);
        assert_eq!(set.images.len(), 4);
        assert!(set.warnings.is_empty());
        assert_eq!(generator.calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_any_failure_empties_set() {
        let generator = CountingGenerator { calls: AtomicUsize::new(0), fail_on: Some(1) };
        let set = request_variations(&generator, &request(), 3);
        assert!(set.is_empty());
        assert_eq!(set.warnings.len(), 1);
        assert!(set.warnings[0].message.contains("model refused"));
    }

    #[test]
    fn test_png_roundtrip_through_data_url() {
        let img = RgbaImage::from_pixel(3, 1, Rgba([9, 8, 7, 255]));
        let encoded = encode_png_base64(&img).unwrap();
        let generated = GeneratedImage {
            data_base64: format!("data:image/png;base64,{}", encoded),
            mime_type: "image/png".to_string(),
        };
        assert_eq!(decode_generated(&generated).unwrap(), img);
    }

    #[test]
    fn test_decode_errors() {
        let empty = GeneratedImage { data_base64: "  ".to_string(), mime_type: "image/png".to_string() };
        assert!(matches!(decode_generated(&empty), Err(RedrawError::NoImage(_))));

        let garbage = GeneratedImage { data_base64: "***".to_string(), mime_type: "image/png".to_string() };
        assert!(matches!(decode_generated(&garbage), Err(RedrawError::Base64(_))));

        let not_image = GeneratedImage {
            data_base64: STANDARD.encode(b"hello"),
            mime_type: "image/png".to_string(),
        };
        assert!(matches!(decode_generated(&not_image), Err(RedrawError::Decode(_))));
    }
}
