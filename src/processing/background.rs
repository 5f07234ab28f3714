//! Background color estimation by corner sampling

use crate::color::Color;
use image::RgbaImage;
use std::collections::HashMap;

/// Largest side of a sampled corner square
const MAX_SAMPLE_SIZE: u32 = 20;

/// Channel quantization step that merges near-identical shades
const QUANTIZATION_STEP: u8 = 8;

/// Side of the square sampled at each corner: `min(20, min(w, h) / 10)`, at least 1
#[must_use]
pub fn corner_sample_size(width: u32, height: u32) -> u32 {
    MAX_SAMPLE_SIZE.min(width.min(height) / 10).max(1)
}

/// Collect corner samples in the fixed order top-left, top-right,
/// bottom-left, bottom-right, row-major inside each square
#[must_use]
pub fn sample_corners(image: &RgbaImage) -> Vec<Color> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let size = corner_sample_size(width, height);
    let corners = [
        (0, 0),
        (width - size, 0),
        (0, height - size),
        (width - size, height - size),
    ];

    let mut samples = Vec::with_capacity((size * size * 4) as usize);
    for (cx, cy) in corners {
        for dy in 0..size {
            for dx in 0..size {
                samples.push(Color::from(image.get_pixel(cx + dx, cy + dy)));
            }
        }
    }
    samples
}

/// Most frequent quantized bucket, represented by its first-seen sample
///
/// Buckets are counted on quantized colors; ties go to the bucket seen first.
#[must_use]
pub fn most_frequent_quantized(samples: &[Color]) -> Option<Color> {
    let mut slots: HashMap<Color, usize> = HashMap::new();
    let mut counts: Vec<(Color, usize)> = Vec::new();

    for sample in samples {
        let quantized = sample.quantize(QUANTIZATION_STEP);
        match slots.get(&quantized) {
            Some(&slot) => {
                if let Some(entry) = counts.get_mut(slot) {
                    entry.1 += 1;
                }
            },
            None => {
                slots.insert(quantized, counts.len());
                counts.push((*sample, 1));
            },
        }
    }

    let mut best: Option<(Color, usize)> = None;
    for (color, count) in counts {
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((color, count));
        }
    }
    best.map(|(color, _)| color)
}

/// Estimate the dominant background color from the four image corners
///
/// Falls back to white for a zero-size image.
#[must_use]
pub fn detect_background_color(image: &RgbaImage) -> Color {
    let samples = sample_corners(image);
    most_frequent_quantized(&samples).unwrap_or(Color::WHITE)
}
