//! Binary foreground/background classification in Lab space

use crate::color::{delta_e, image_to_labs, rgb_to_lab, Color, LabColor};
use crate::types::{AlphaMap, ClassificationStats};
use image::RgbaImage;

/// Classifies pixels against a fixed background color
///
/// A pixel whose ΔE76 distance to the background is strictly below the
/// threshold becomes transparent (0.0); every other pixel stays opaque (1.0).
#[derive(Debug, Clone, Copy)]
pub struct Classifier {
    background: LabColor,
    threshold: f64,
}

impl Classifier {
    #[must_use]
    pub fn new(background: Color, threshold: f32) -> Self {
        Self {
            background: rgb_to_lab(background),
            threshold: f64::from(threshold),
        }
    }

    /// True when `lab` is close enough to the background to be removed
    #[must_use]
    pub fn is_background_lab(&self, lab: LabColor) -> bool {
        delta_e(lab, self.background) < self.threshold
    }

    #[must_use]
    pub fn is_background(&self, color: Color) -> bool {
        self.is_background_lab(rgb_to_lab(color))
    }

    /// Build the alpha map for a whole raster
    ///
    /// The raster is converted to Lab in one batch before comparing.
    #[must_use]
    pub fn classify(&self, image: &RgbaImage) -> (AlphaMap, ClassificationStats) {
        let (width, height) = image.dimensions();
        let mut map = AlphaMap::opaque(width, height);
        let mut stats = ClassificationStats::default();

        for (value, lab) in map.values_mut().iter_mut().zip(image_to_labs(image)) {
            if self.is_background_lab(lab) {
                *value = 0.0;
                stats.transparent += 1;
            } else {
                stats.opaque += 1;
            }
        }

        (map, stats)
    }
}

/// Classify every pixel of `image` against `background`
#[must_use]
pub fn classify(image: &RgbaImage, background: Color, threshold: f32) -> AlphaMap {
    classify_with_stats(image, background, threshold).0
}

/// Like [`classify`], also returning the pixel counts
#[must_use]
pub fn classify_with_stats(
    image: &RgbaImage,
    background: Color,
    threshold: f32,
) -> (AlphaMap, ClassificationStats) {
    Classifier::new(background, threshold).classify(image)
}
