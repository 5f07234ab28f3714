//! End-to-end properties of the single-image pipeline

use bgalpha::{
    alpha_to_byte, classify, composite, detect_background_color, feather, process_image,
    remove_background, AlphaMap, BackgroundSource, Color, Preset, ProcessingConfig,
};
use image::{Rgba, RgbaImage};

fn framed(size: u32, background: [u8; 3], subject: [u8; 3], margin: u32) -> RgbaImage {
    RgbaImage::from_fn(size, size, |x, y| {
        let inside = (margin..size - margin).contains(&x) && (margin..size - margin).contains(&y);
        let [r, g, b] = if inside { subject } else { background };
        Rgba([r, g, b, 255])
    })
}

#[test]
fn test_uniform_image_detects_exact_color() {
    let image = RgbaImage::from_pixel(50, 30, Rgba([101, 202, 33, 255]));
    assert_eq!(detect_background_color(&image), Color::new(101, 202, 33));

    let white = RgbaImage::from_pixel(40, 40, Rgba([255, 255, 255, 255]));
    assert_eq!(detect_background_color(&white), Color::WHITE);
}

#[test]
fn test_auto_removes_uniform_white_with_tight_threshold() {
    let image = RgbaImage::from_pixel(40, 40, Rgba([255, 255, 255, 255]));
    let config = ProcessingConfig::builder()
        .threshold(2.0)
        .smooth(false)
        .feather_radius(0.0)
        .build()
        .unwrap();
    let result = remove_background(image, &config).unwrap();
    assert!(result.image.pixels().all(|p| p[3] == 0));
}

#[test]
fn test_white_preset_on_exact_white_background() {
    let image = RgbaImage::from_fn(20, 20, |x, y| {
        if (8..12).contains(&x) && (8..12).contains(&y) {
            Rgba([0, 0, 0, 255])
        } else {
            Rgba([255, 255, 255, 255])
        }
    });
    let mut config = Preset::White.config();
    config.feather_radius = 0.0;
    let output = process_image(image, &config).unwrap();

    for (x, y, pixel) in output.enumerate_pixels() {
        let foreground = (8..12).contains(&x) && (8..12).contains(&y);
        let expected = if foreground { 255 } else { 0 };
        assert_eq!(pixel[3], expected, "alpha at {}x{}", x, y);
    }
}

#[test]
fn test_red_corners_are_removed_blue_center_kept() {
    let image = RgbaImage::from_fn(40, 40, |x, y| {
        let corner = (x < 10 || x >= 30) && (y < 10 || y >= 30);
        if corner {
            Rgba([255, 0, 0, 255])
        } else {
            Rgba([0, 0, 255, 255])
        }
    });

    let config = ProcessingConfig::builder().feather_radius(0.0).smooth(false).build().unwrap();
    let result = remove_background(image, &config).unwrap();

    assert_eq!(result.background_source, BackgroundSource::Detected);
    assert_eq!(result.background, Color::new(255, 0, 0));
    assert_eq!(result.image.get_pixel(0, 0)[3], 0);
    assert_eq!(result.image.get_pixel(39, 39)[3], 0);
    assert_eq!(result.image.get_pixel(20, 20)[3], 255);
    assert_eq!(result.image.get_pixel(20, 0)[3], 255);
}

#[test]
fn test_classification_output_is_binary() {
    let image = RgbaImage::from_fn(32, 32, |x, y| Rgba([(x * 8) as u8, (y * 8) as u8, 90, 255]));
    let map = classify(&image, Color::new(0, 0, 90), 15.0);
    assert!(map.is_binary());
    assert!(map.transparent_count() > 0);
    assert!(map.transparent_count() < map.len());
}

#[test]
fn test_zero_feather_radius_is_identity() {
    let image = framed(20, [255, 255, 255], [10, 10, 10], 5);
    let map = classify(&image, Color::WHITE, 8.0);
    assert_eq!(feather(&map, 0.0), map);
}

#[test]
fn test_feathered_alpha_stays_in_range() {
    let image = framed(24, [0, 255, 0], [200, 40, 120], 6);
    let map = classify(&image, Color::new(0, 255, 0), 12.0);

    for radius in [0.5_f32, 1.5, 3.0, 6.0] {
        let feathered = feather(&map, radius);
        assert_eq!(feathered.dimensions(), map.dimensions());
        assert!(feathered.values().iter().all(|v| (0.0..=1.0).contains(v)));
    }

    let feathered = feather(&map, 1.5);
    // Far from the subject edge nothing changes
    assert_eq!(feathered.get(0, 0), Some(0.0));
    assert_eq!(feathered.get(12, 12), Some(1.0));
    // The edge picks up intermediate weights
    assert!(!feathered.is_binary());
}

#[test]
fn test_composite_writes_rounded_alpha() {
    let mut image = RgbaImage::from_pixel(2, 1, Rgba([10, 20, 30, 255]));
    let map = AlphaMap::from_values(2, 1, vec![0.5, 0.25]).unwrap();
    composite(&mut image, &map).unwrap();

    assert_eq!(image.get_pixel(0, 0).0, [10, 20, 30, alpha_to_byte(0.5)]);
    assert_eq!(image.get_pixel(0, 0)[3], 128);
    assert_eq!(image.get_pixel(1, 0)[3], 64);
}

#[test]
fn test_full_pipeline_keeps_dimensions_and_subject() {
    let image = framed(48, [0, 0, 255], [240, 200, 40], 12);
    let output = process_image(image, &Preset::Blue.config()).unwrap();

    assert_eq!(output.dimensions(), (48, 48));
    assert_eq!(output.get_pixel(2, 2)[3], 0);
    assert_eq!(output.get_pixel(24, 24)[3], 255);
}

#[test]
fn test_target_color_overrides_detection() {
    // The corners are white but only the green band should go
    let image = RgbaImage::from_fn(30, 30, |x, _| {
        if (10..20).contains(&x) {
            Rgba([0, 255, 0, 255])
        } else {
            Rgba([255, 255, 255, 255])
        }
    });
    let config = ProcessingConfig::builder()
        .target_color(Color::new(0, 255, 0))
        .feather_radius(0.0)
        .build()
        .unwrap();
    let result = remove_background(image, &config).unwrap();

    assert_eq!(result.background_source, BackgroundSource::Target);
    assert_eq!(result.image.get_pixel(15, 15)[3], 0);
    assert_eq!(result.image.get_pixel(0, 0)[3], 255);
}
