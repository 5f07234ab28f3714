//! Edge-preserving bilateral denoise over RGB channels

use image::RgbaImage;

/// Largest possible intensity difference: three channels of 255
const MAX_INTENSITY_DIFF: usize = 255 * 3;

/// Weight tables for one filter pass
struct BilateralKernel {
    radius: i64,
    /// Row-major `(2r + 1)^2` spatial weights
    spatial: Vec<f64>,
    /// Range weight indexed by the summed absolute channel difference
    range: Vec<f64>,
}

impl BilateralKernel {
    fn new(spatial_sigma: f32, intensity_sigma: f32) -> Self {
        let spatial_sigma = f64::from(spatial_sigma);
        let intensity_sigma = f64::from(intensity_sigma);
        let radius = (2.0 * spatial_sigma).ceil() as i64;
        let side = (2 * radius + 1) as usize;

        let spatial_denom = 2.0 * spatial_sigma * spatial_sigma;
        let mut spatial = Vec::with_capacity(side * side);
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let dist_sq = (dx * dx + dy * dy) as f64;
                spatial.push((-dist_sq / spatial_denom).exp());
            }
        }

        let range_denom = 2.0 * intensity_sigma * intensity_sigma;
        let range = (0..=MAX_INTENSITY_DIFF)
            .map(|diff| {
                let diff = diff as f64;
                (-(diff * diff) / range_denom).exp()
            })
            .collect();

        Self {
            radius,
            spatial,
            range,
        }
    }
}

/// Smooth RGB noise while keeping strong edges, in place
///
/// Neighbors are read from an untouched copy of the input so the result
/// does not depend on scan order. The alpha channel is left as is.
/// Non-positive sigmas leave the image unchanged.
pub fn bilateral_denoise(image: &mut RgbaImage, spatial_sigma: f32, intensity_sigma: f32) {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 || !(spatial_sigma > 0.0) || !(intensity_sigma > 0.0) {
        return;
    }

    let kernel = BilateralKernel::new(spatial_sigma, intensity_sigma);
    let source = image.clone();
    let side = (2 * kernel.radius + 1) as usize;
    let (w, h) = (i64::from(width), i64::from(height));

    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let center = source.get_pixel(x, y);
        let (cx, cy) = (i64::from(x), i64::from(y));
        let mut sums = [0.0f64; 3];
        let mut weight_sum = 0.0f64;

        for dy in -kernel.radius..=kernel.radius {
            let ny = cy + dy;
            if ny < 0 || ny >= h {
                continue;
            }
            let row = (dy + kernel.radius) as usize * side;

            for dx in -kernel.radius..=kernel.radius {
                let nx = cx + dx;
                if nx < 0 || nx >= w {
                    continue;
                }

                let neighbor = source.get_pixel(nx as u32, ny as u32);
                let diff: usize = (0..3)
                    .map(|c| usize::from(center[c].abs_diff(neighbor[c])))
                    .sum();
                let weight = kernel.spatial[row + (dx + kernel.radius) as usize] * kernel.range[diff];

                for (c, sum) in sums.iter_mut().enumerate() {
                    *sum += f64::from(neighbor[c]) * weight;
                }
                weight_sum += weight;
            }
        }

        // The center contributes weight 1, so weight_sum is never zero
        for (c, sum) in sums.iter().enumerate() {
            pixel[c] = (sum / weight_sum).round().clamp(0.0, 255.0) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_uniform_image_is_unchanged() {
        let mut image = RgbaImage::from_pixel(8, 8, Rgba([120, 40, 200, 255]));
        let before = image.clone();
        bilateral_denoise(&mut image, 2.0, 30.0);
        assert_eq!(image, before);
    }

    #[test]
    fn test_alpha_channel_preserved() {
        let mut image = RgbaImage::from_fn(6, 6, |x, y| Rgba([(x * 40) as u8, (y * 40) as u8, 0, (x * 10 + y) as u8]));
        let before = image.clone();
        bilateral_denoise(&mut image, 2.0, 30.0);
        for (a, b) in image.pixels().zip(before.pixels()) {
            assert_eq!(a[3], b[3]);
        }
    }

    #[test]
    fn test_isolated_noise_is_reduced() {
        let mut image = RgbaImage::from_pixel(9, 9, Rgba([100, 100, 100, 255]));
        image.put_pixel(4, 4, Rgba([120, 100, 100, 255]));
        bilateral_denoise(&mut image, 2.0, 30.0);
        let center = image.get_pixel(4, 4);
        assert!(center[0] < 120);
        assert!(center[0] >= 100);
    }

    #[test]
    fn test_strong_edge_is_preserved() {
        let mut image = RgbaImage::from_fn(10, 10, |x, _| {
            if x < 5 {
                Rgba([0, 0, 0, 255])
            } else {
                Rgba([255, 255, 255, 255])
            }
        });
        bilateral_denoise(&mut image, 2.0, 30.0);
        assert_eq!(image.get_pixel(4, 5)[0], 0);
        assert_eq!(image.get_pixel(5, 5)[0], 255);
    }

    #[test]
    fn test_non_positive_sigma_is_noop() {
        let mut image = RgbaImage::from_fn(4, 4, |x, y| Rgba([(x * 60) as u8, (y * 60) as u8, 7, 255]));
        let before = image.clone();
        bilateral_denoise(&mut image, 0.0, 30.0);
        bilateral_denoise(&mut image, 2.0, -1.0);
        assert_eq!(image, before);
    }
}
