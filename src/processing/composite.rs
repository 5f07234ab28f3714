//! Writes alpha weights into the raster's alpha channel

use crate::error::{BgAlphaError, Result};
use crate::types::{alpha_to_byte, AlphaMap};
use image::RgbaImage;

/// Replace the alpha channel of `image` with `alpha`, leaving RGB untouched
///
/// # Errors
/// - `alpha` dimensions differ from the raster
pub fn composite(image: &mut RgbaImage, alpha: &AlphaMap) -> Result<()> {
    if image.dimensions() != alpha.dimensions() {
        let (iw, ih) = image.dimensions();
        let (aw, ah) = alpha.dimensions();
        return Err(BgAlphaError::processing_stage_error(
            "composite",
            &format!("alpha map is {}x{}", aw, ah),
            Some(&format!("{}x{}", iw, ih)),
        ));
    }

    for (pixel, &value) in image.pixels_mut().zip(alpha.values()) {
        pixel[3] = alpha_to_byte(value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_composite_boundaries() {
        let mut image = RgbaImage::from_pixel(3, 1, Rgba([10, 20, 30, 77]));
        let alpha = AlphaMap::from_values(3, 1, vec![0.0, 0.5, 1.0]).unwrap();

        composite(&mut image, &alpha).unwrap();

        assert_eq!(image.get_pixel(0, 0), &Rgba([10, 20, 30, 0]));
        assert_eq!(image.get_pixel(1, 0), &Rgba([10, 20, 30, 128]));
        assert_eq!(image.get_pixel(2, 0), &Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let mut image = RgbaImage::new(4, 4);
        let alpha = AlphaMap::opaque(4, 3);
        let err = composite(&mut image, &alpha).unwrap_err();
        assert!(matches!(err, BgAlphaError::Processing(_)));
        assert!(err.to_string().contains("composite"));
    }
}
