//! Background classification by RGB color distance
//!
//! Separating "background" from "content" by distance to a single reference
//! color is a best-effort heuristic, not a segmentation. It works well for
//! flat white or green-screen backdrops produced by image generators and
//! degrades on gradients or content that shares the backdrop color. The
//! threshold is therefore always configurable.

use image::Rgba;

/// Largest possible RGB distance, `sqrt(3 * 255²)`
pub const MAX_RGB_DISTANCE: f32 = 441.67;

/// Default per-channel tolerance used when detecting content bounds
pub const DEFAULT_CHANNEL_TOLERANCE: f32 = 40.0;

/// Euclidean distance between two colors in RGB space. Alpha is ignored.
pub fn color_distance(a: Rgba<u8>, b: Rgba<u8>) -> f32 {
    let dr = a[0] as f32 - b[0] as f32;
    let dg = a[1] as f32 - b[1] as f32;
    let db = a[2] as f32 - b[2] as f32;
    (dr * dr + dg * dg + db * db).sqrt()
}

/// Whether `pixel` is within `tolerance_percent` of `reference`.
///
/// The percentage is taken of [`MAX_RGB_DISTANCE`]. A pixel identical to the
/// reference is background at any non-negative tolerance.
///
/// # Examples
///
/// ```
/// use image::Rgba;
/// use sheetsmith::background::is_background;
///
/// let white = Rgba([255, 255, 255, 255]);
/// assert!(is_background(Rgba([250, 250, 248, 255]), white, 15.0));
/// assert!(!is_background(Rgba([0, 0, 0, 255]), white, 15.0));
/// ```
pub fn is_background(pixel: Rgba<u8>, reference: Rgba<u8>, tolerance_percent: f32) -> bool {
    let threshold = percent_to_distance(tolerance_percent);
    pixel == reference || color_distance(pixel, reference) < threshold
}

/// Convert a percent tolerance into an RGB distance threshold.
pub fn percent_to_distance(tolerance_percent: f32) -> f32 {
    tolerance_percent.max(0.0) / 100.0 * MAX_RGB_DISTANCE
}

/// Reusable classifier bound to one reference color and threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackgroundClassifier {
    reference: Rgba<u8>,
    /// Distance threshold in RGB units
    threshold: f32,
}

impl BackgroundClassifier {
    /// Classifier for preview masking, tolerance in percent of the RGB cube diagonal.
    pub fn from_percent(reference: Rgba<u8>, tolerance_percent: f32) -> Self {
        Self { reference, threshold: percent_to_distance(tolerance_percent) }
    }

    /// Classifier for content detection, tolerance in 0-255 channel units.
    ///
    /// The tolerance is used directly as an RGB distance, so 40 means "within
    /// a distance of 40 of the reference".
    pub fn from_channel_tolerance(reference: Rgba<u8>, tolerance: f32) -> Self {
        Self { reference, threshold: tolerance.max(0.0) }
    }

    pub fn reference(&self) -> Rgba<u8> {
        self.reference
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Color-only test, used for transparency masking.
    pub fn matches(&self, pixel: Rgba<u8>) -> bool {
        pixel == self.reference || color_distance(pixel, self.reference) < self.threshold
    }

    /// Content-detection test. Fully transparent pixels never count as content.
    pub fn is_background(&self, pixel: Rgba<u8>) -> bool {
        pixel[3] == 0 || self.matches(pixel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

    #[test]
    fn test_distance_extremes() {
        assert_eq!(color_distance(WHITE, WHITE), 0.0);
        let black = Rgba([0, 0, 0, 255]);
        assert!((color_distance(WHITE, black) - MAX_RGB_DISTANCE).abs() < 0.01);
    }

    #[test]
    fn test_near_white_is_background_at_15_percent() {
        let pixel = Rgba([250, 250, 248, 255]);
        let distance = color_distance(pixel, WHITE);
        // sqrt(5² + 5² + 7²)
        assert!((distance - 9.95).abs() < 0.01, "distance was {}", distance);
        assert!(distance < percent_to_distance(15.0));
        assert!(is_background(pixel, WHITE, 15.0));
    }

    #[test]
    fn test_identical_pixel_at_zero_tolerance() {
        assert!(is_background(WHITE, WHITE, 0.0));
        assert!(!is_background(Rgba([254, 255, 255, 255]), WHITE, 0.0));
    }

    #[test]
    fn test_monotonic_in_tolerance() {
        let pixel = Rgba([200, 180, 160, 255]);
        let mut was_background = false;
        for tolerance in 0..=100 {
            let now = is_background(pixel, WHITE, tolerance as f32);
            assert!(!was_background || now, "truth set shrank at {}", tolerance);
            was_background = now;
        }
        assert!(was_background);
    }

    #[test]
    fn test_channel_classifier_threshold() {
        let classifier = BackgroundClassifier::from_channel_tolerance(WHITE, 40.0);
        assert!(classifier.is_background(Rgba([240, 240, 240, 255])));
        assert!(!classifier.is_background(Rgba([200, 200, 200, 255])));
    }

    #[test]
    fn test_transparent_is_background_only_for_content() {
        let classifier = BackgroundClassifier::from_channel_tolerance(WHITE, 40.0);
        let clear = Rgba([0, 0, 0, 0]);
        assert!(classifier.is_background(clear));
        assert!(!classifier.matches(clear));
    }
}
