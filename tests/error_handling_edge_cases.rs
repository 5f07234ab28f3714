//! Error conditions and boundary cases across the public API

use bgalpha::{
    bilateral_denoise, composite, feather, process_image, remove_background_from_bytes,
    remove_background_from_file, AlphaMap, BatchOptions, BatchOrchestrator, BgAlphaError,
    ConfigOverrides, MemoryImageLoader, Preset, ProcessingConfig,
};
use image::{Rgba, RgbaImage};
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn test_zero_area_raster_is_rejected() {
    for (width, height) in [(0, 0), (0, 5), (5, 0)] {
        let err = process_image(RgbaImage::new(width, height), &ProcessingConfig::default())
            .unwrap_err();
        assert!(matches!(err, BgAlphaError::InvalidImage(_)), "{}x{}", width, height);
    }
}

#[test]
fn test_one_pixel_image_is_fully_removed() {
    let image = RgbaImage::from_pixel(1, 1, Rgba([12, 34, 56, 255]));
    let output = process_image(image, &ProcessingConfig::default()).unwrap();
    assert_eq!(output.get_pixel(0, 0)[3], 0);
}

#[test]
fn test_invalid_configs_are_rejected() {
    let negative = ProcessingConfig {
        threshold: -1.0,
        ..ProcessingConfig::default()
    };
    let err = process_image(RgbaImage::new(2, 2), &negative).unwrap_err();
    assert!(matches!(err, BgAlphaError::InvalidConfig(_)));
    assert!(err.to_string().contains("threshold"));

    let nan_radius = ProcessingConfig {
        feather_radius: f32::NAN,
        ..ProcessingConfig::default()
    };
    assert!(nan_radius.validate().is_err());
}

#[test]
fn test_composite_dimension_mismatch() {
    let mut image = RgbaImage::new(4, 4);
    let err = composite(&mut image, &AlphaMap::opaque(3, 4)).unwrap_err();
    assert!(matches!(err, BgAlphaError::Processing(_)));
    assert!(err.to_string().contains("composite"));
}

#[test]
fn test_non_positive_sigmas_leave_image_untouched() {
    let original = RgbaImage::from_fn(6, 6, |x, y| Rgba([(x * 40) as u8, (y * 40) as u8, 7, 255]));
    for (spatial, intensity) in [(0.0, 30.0), (2.0, 0.0), (-1.0, -1.0)] {
        let mut image = original.clone();
        bilateral_denoise(&mut image, spatial, intensity);
        assert_eq!(image, original);
    }
}

#[test]
fn test_feather_handles_degenerate_maps() {
    let single = AlphaMap::opaque(1, 1);
    assert_eq!(feather(&single, 3.0), single);

    let negative = AlphaMap::filled(3, 3, 0.0);
    assert_eq!(feather(&negative, -2.0), negative);
}

#[test]
fn test_garbage_bytes_fail_to_load() {
    let err = remove_background_from_bytes(b"definitely not a png", &ProcessingConfig::default())
        .unwrap_err();
    assert!(matches!(err, BgAlphaError::LoadFailure(_)));

    let err = remove_background_from_bytes(&[], &ProcessingConfig::default()).unwrap_err();
    assert!(matches!(err, BgAlphaError::LoadFailure(_)));
}

#[tokio::test]
async fn test_missing_file_is_a_load_failure() {
    let dir = TempDir::new().unwrap();
    let err = remove_background_from_file(dir.path().join("nope.png"), &ProcessingConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, BgAlphaError::LoadFailure(_)));
    assert!(err.to_string().contains("nope.png"));
}

#[tokio::test]
async fn test_batch_setup_errors_produce_unsuccessful_results() {
    // No loader wired
    let mut orchestrator = BatchOrchestrator::new();
    let result = orchestrator
        .convert_all(&["a.jpg"], &BatchOptions::default())
        .await;
    assert!(!result.overall_success);
    assert!(result.message.contains("Dependency missing"));
    assert_eq!(result.attempted(), 0);

    let mut orchestrator = BatchOrchestrator::new().with_loader(Arc::new(MemoryImageLoader::new()));

    // No inputs
    let empty: [&str; 0] = [];
    let result = orchestrator.convert_all(&empty, &BatchOptions::default()).await;
    assert!(!result.overall_success);
    assert_eq!(result.message, "No input images to process");

    // Overrides that break validation
    let options = BatchOptions::with_preset(Preset::Red).overrides(ConfigOverrides {
        feather_radius: Some(-3.0),
        ..ConfigOverrides::default()
    });
    let result = orchestrator.convert_all(&["a.jpg"], &options).await;
    assert!(!result.overall_success);
    assert!(result.message.contains("feather radius"));

    let result = orchestrator
        .convert_all(&["a.jpg"], &BatchOptions::default().max_items(0))
        .await;
    assert!(result.message.contains("max items"));
}
