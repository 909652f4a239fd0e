use image::GrayImage;

use super::labeling::LabelMap;
use super::preprocessing::count_foreground;
use crate::models::{coverage_percentage, BuildingRecord, ImageResult};

#[derive(Default, Clone, Copy)]
struct RegionSums {
    sum_x: u64,
    sum_y: u64,
    count: u64,
}

/// Build the per-building records and image totals.
///
/// Centroids are the truncated mean of member coordinates; the coverage
/// denominator is the foreground of the cleaned mask.
pub fn aggregate(labels: &LabelMap, cleaned: &GrayImage) -> ImageResult {
    let mut regions: Vec<RegionSums> = Vec::new();

    for (x, y, label) in labels.enumerate_pixels() {
        let label = label[0] as usize;
        if label == 0 {
            continue; // Skip background
        }
        if label > regions.len() {
            regions.resize(label, RegionSums::default());
        }
        let region = &mut regions[label - 1];
        region.sum_x += x as u64;
        region.sum_y += y as u64;
        region.count += 1;
    }

    let buildings: Vec<BuildingRecord> = regions
        .iter()
        .enumerate()
        .filter(|(_, r)| r.count > 0)
        .map(|(idx, r)| BuildingRecord {
            id: idx as u32 + 1,
            centroid_x: (r.sum_x / r.count) as u32,
            centroid_y: (r.sum_y / r.count) as u32,
            area_pixels: r.count as u32,
        })
        .collect();

    let total_foreground_pixels = count_foreground(cleaned);
    let total_peak_pixels: u64 = buildings.iter().map(|b| b.area_pixels as u64).sum();
    let (width, height) = labels.dimensions();

    ImageResult {
        building_count: buildings.len(),
        total_foreground_pixels,
        total_peak_pixels,
        coverage_percentage: coverage_percentage(total_peak_pixels, total_foreground_pixels),
        width,
        height,
        buildings,
    }
}
