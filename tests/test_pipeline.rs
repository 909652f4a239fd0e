//! Integration tests for the single-image detection pipeline.
//!
//! Tests cover:
//! - Degenerate and isolated-blob inputs
//! - Separation of touching buildings
//! - Determinism, label density, and coverage bounds
//! - Input and configuration errors

mod common;

use footprints::detection::morphology::clean;
use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use std::collections::BTreeSet;

use common::*;

#[test]
fn test_uniform_raster_has_no_buildings() -> anyhow::Result<()> {
    for value in [0u8, 128, 255] {
        let result = detect_default(&blank_raster(40, 30, value));

        assert_eq!(result.building_count, 0);
        assert!(result.buildings.is_empty());
        assert_eq!(result.total_foreground_pixels, 0);
        assert_eq!(result.total_peak_pixels, 0);
        assert_eq!(result.coverage_percentage, 0.0);
        assert_eq!((result.width, result.height), (40, 30));
    }
    Ok(())
}

#[test]
fn test_single_pixel_raster_has_no_foreground() -> anyhow::Result<()> {
    for value in [0u8, 200] {
        let stages = DetectionPipeline::default()
            .run_stages(&DynamicImage::ImageLuma8(blank_raster(1, 1, value)))?;

        assert_eq!(stages.cleaned.get_pixel(0, 0)[0], 0);
        assert_eq!(stages.result.total_foreground_pixels, 0);
        assert_eq!(stages.result.building_count, 0);
        assert_eq!(stages.result.coverage_percentage, 0.0);
    }
    Ok(())
}

#[test]
fn test_large_cleanup_radius_never_fills_image() -> anyhow::Result<()> {
    let config = DetectionConfig {
        cleanup_kernel_size: 5,
        cleanup_iterations: 5,
        ..DetectionConfig::default()
    };
    let stages = DetectionPipeline::new(config)?
        .run_stages(&DynamicImage::ImageLuma8(single_square_raster()))?;

    for (x, y, pixel) in stages.cleaned.enumerate_pixels() {
        if pixel[0] != 0 {
            assert_eq!(stages.binary.get_pixel(x, y)[0], 255);
        }
    }
    assert_eq!(stages.result.total_foreground_pixels, 0);
    assert_eq!(stages.result.building_count, 0);
    Ok(())
}

#[test]
fn test_single_square_is_one_building() -> anyhow::Result<()> {
    let result = detect_default(&single_square_raster());

    assert_eq!(result.building_count, 1);
    assert_eq!(result.buildings.len(), 1);

    let building = &result.buildings[0];
    assert_eq!(building.id, 1);
    assert!(
        SINGLE_SQUARE.contains(building.centroid_x, building.centroid_y),
        "centroid ({}, {}) should lie inside the square",
        building.centroid_x,
        building.centroid_y
    );
    assert!(building.area_pixels > 0);
    assert!(building.area_pixels <= SINGLE_SQUARE.pixel_count());

    // The whole square survives binarization and cleanup.
    assert_eq!(result.total_foreground_pixels, SINGLE_SQUARE.pixel_count() as u64);
    assert_eq!(result.total_peak_pixels, building.area_pixels as u64);
    assert!(result.coverage_percentage > 0.0 && result.coverage_percentage <= 100.0);
    Ok(())
}

#[test]
fn test_bridged_squares_are_separated() -> anyhow::Result<()> {
    let result = detect_default(&bridged_squares_raster());

    assert_eq!(result.building_count, 2);
    let (a, b) = (&result.buildings[0], &result.buildings[1]);
    assert_ne!(a.center(), b.center());

    // Both squares start on the same row, so the left one is met first.
    assert!(LEFT_SQUARE.contains(a.centroid_x, a.centroid_y));
    assert!(RIGHT_SQUARE.contains(b.centroid_x, b.centroid_y));
    Ok(())
}

#[test]
fn test_detection_is_deterministic() -> anyhow::Result<()> {
    let pipeline = DetectionPipeline::default();
    let img = DynamicImage::ImageLuma8(bridged_squares_raster());

    let first = pipeline.run_stages(&img)?;
    let second = pipeline.run_stages(&img)?;

    assert_eq!(first.result, second.result);
    assert_eq!(first.labels, second.labels);
    assert_eq!(first.peaks, second.peaks);
    Ok(())
}

#[test]
fn test_labels_are_dense() -> anyhow::Result<()> {
    let raster = raster_with_squares(
        80,
        60,
        &[
            Square::new(8, 8, 12),
            Square::new(40, 6, 10),
            Square::new(20, 36, 12),
            Square::new(55, 40, 11),
        ],
    );
    let stages = DetectionPipeline::default().run_stages(&DynamicImage::ImageLuma8(raster))?;

    let seen: BTreeSet<u32> = stages.labels.pixels().map(|p| p[0]).filter(|&l| l > 0).collect();
    let expected: BTreeSet<u32> = (1..=stages.result.building_count as u32).collect();
    assert_eq!(seen, expected);

    let ids: Vec<u32> = stages.result.buildings.iter().map(|b| b.id).collect();
    let ordered: Vec<u32> = (1..=stages.result.building_count as u32).collect();
    assert_eq!(ids, ordered);
    Ok(())
}

#[test]
fn test_peaks_stay_inside_cleaned_foreground() -> anyhow::Result<()> {
    let stages = DetectionPipeline::default()
        .run_stages(&DynamicImage::ImageLuma8(bridged_squares_raster()))?;

    for (x, y, label) in stages.labels.enumerate_pixels() {
        if label[0] > 0 {
            assert_eq!(stages.peaks.get_pixel(x, y)[0], 255);
        }
    }
    for (x, y, peak) in stages.peaks.enumerate_pixels() {
        if peak[0] > 0 {
            assert_eq!(stages.cleaned.get_pixel(x, y)[0], 255);
            assert!(stages.distance.get_pixel(x, y)[0] > 0.0);
        }
    }
    Ok(())
}

#[test]
fn test_coverage_is_bounded() -> anyhow::Result<()> {
    let rasters = [
        single_square_raster(),
        bridged_squares_raster(),
        blank_raster(16, 16, 90),
        speckled_mask(48, 48, 7),
    ];
    for raster in rasters {
        let result = detect_default(&raster);
        assert!((0.0..=100.0).contains(&result.coverage_percentage));
        if result.total_foreground_pixels == 0 {
            assert_eq!(result.coverage_percentage, 0.0);
        }
        assert_eq!(result.building_count, result.buildings.len());
    }
    Ok(())
}

#[test]
fn test_stricter_ratio_never_adds_buildings() -> anyhow::Result<()> {
    let img = DynamicImage::ImageLuma8(bridged_squares_raster());
    let mut previous = usize::MAX;

    for ratio in [0.0f32, 0.1, 0.3, 0.5, 0.7, 0.9, 1.0] {
        let config = DetectionConfig {
            peak_threshold_ratio: ratio,
            ..DetectionConfig::default()
        };
        let count = DetectionPipeline::new(config)?.detect(&img)?.building_count;
        assert!(count <= previous, "ratio {} gave {} after {}", ratio, count, previous);
        previous = count;
    }
    Ok(())
}

#[test]
fn test_cleanup_is_idempotent() -> anyhow::Result<()> {
    for seed in [1u32, 42, 2024] {
        let mask = speckled_mask(40, 40, seed);
        let once = clean(&mask, 3, 2);
        let twice = clean(&once, 3, 2);
        assert_eq!(once, twice);
    }

    let stages = DetectionPipeline::default()
        .run_stages(&DynamicImage::ImageLuma8(bridged_squares_raster()))?;
    assert_eq!(clean(&stages.cleaned, 3, 2), stages.cleaned);
    Ok(())
}

#[test]
fn test_bridge_is_removed_by_cleanup() -> anyhow::Result<()> {
    let stages = DetectionPipeline::default()
        .run_stages(&DynamicImage::ImageLuma8(bridged_squares_raster()))?;

    assert_eq!(stages.binary.get_pixel(24, 15)[0], 255);
    assert_eq!(stages.cleaned.get_pixel(24, 15)[0], 0);
    assert_eq!(
        stages.result.total_foreground_pixels,
        (LEFT_SQUARE.pixel_count() + RIGHT_SQUARE.pixel_count()) as u64
    );
    Ok(())
}

#[test]
fn test_color_input_matches_grayscale() -> anyhow::Result<()> {
    let gray = single_square_raster();
    let color = RgbImage::from_fn(gray.width(), gray.height(), |x, y| {
        let v = gray.get_pixel(x, y)[0];
        Rgb([v, v, v])
    });

    let pipeline = DetectionPipeline::default();
    let from_gray = pipeline.detect(&DynamicImage::ImageLuma8(gray))?;
    let from_color = pipeline.detect(&DynamicImage::ImageRgb8(color))?;
    assert_eq!(from_gray, from_color);
    Ok(())
}

#[test]
fn test_empty_raster_is_rejected() {
    let pipeline = DetectionPipeline::default();

    let err = pipeline.detect(&DynamicImage::ImageLuma8(GrayImage::new(0, 0))).unwrap_err();
    assert!(matches!(err, PipelineError::EmptyInput { width: 0, height: 0 }));

    let err = pipeline.run_stages_gray(&GrayImage::new(10, 0)).unwrap_err();
    assert!(matches!(err, PipelineError::EmptyInput { .. }));
}

#[test]
fn test_invalid_config_is_rejected() {
    let invalid = [
        DetectionConfig { block_size: 14, ..DetectionConfig::default() },
        DetectionConfig { block_size: 1, ..DetectionConfig::default() },
        DetectionConfig { cleanup_kernel_size: 0, ..DetectionConfig::default() },
        DetectionConfig { cleanup_iterations: 0, ..DetectionConfig::default() },
        DetectionConfig { cleanup_iterations: 300, ..DetectionConfig::default() },
        DetectionConfig { distance_mask_size: 4, ..DetectionConfig::default() },
        DetectionConfig { peak_kernel_size: 6, ..DetectionConfig::default() },
        DetectionConfig { peak_threshold_ratio: 1.5, ..DetectionConfig::default() },
        DetectionConfig { peak_threshold_ratio: -0.1, ..DetectionConfig::default() },
        DetectionConfig { peak_threshold_ratio: f32::NAN, ..DetectionConfig::default() },
    ];
    for config in invalid {
        let err = DetectionPipeline::new(config.clone()).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidConfig(_)), "accepted {:?}", config);
    }

    assert!(DetectionPipeline::new(DetectionConfig::default()).is_ok());
}
