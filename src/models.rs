use serde::Serialize;

/// One detected building, identified by its peak region.
///
/// `area_pixels` counts the pixels of the peak region left after top-hat
/// thresholding, not the full footprint in the foreground mask, so it
/// underestimates the real building area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildingRecord {
    /// Label of the region in the label map (1-based, scan order).
    pub id: u32,
    pub centroid_x: u32,
    pub centroid_y: u32,
    pub area_pixels: u32,
}

impl BuildingRecord {
    /// Get center coordinates
    pub fn center(&self) -> (u32, u32) {
        (self.centroid_x, self.centroid_y)
    }
}

/// Detection outcome for a single raster.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageResult {
    pub building_count: usize,
    /// Foreground pixels of the cleaned mask.
    pub total_foreground_pixels: u64,
    /// Sum of `area_pixels` over all buildings.
    pub total_peak_pixels: u64,
    pub coverage_percentage: f64,
    pub width: u32,
    pub height: u32,
    /// Ordered by ascending `id`.
    pub buildings: Vec<BuildingRecord>,
}

impl ImageResult {
    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty()
    }
}

/// Peak pixels as a percentage of foreground pixels; 0 without foreground.
pub fn coverage_percentage(total_peak_pixels: u64, total_foreground_pixels: u64) -> f64 {
    if total_foreground_pixels == 0 {
        return 0.0;
    }
    total_peak_pixels as f64 / total_foreground_pixels as f64 * 100.0
}

/// One row of the aggregate results table.
#[derive(Debug, Clone, Serialize)]
pub struct ImageRecord {
    pub image_filename: String,
    pub result: ImageResult,
    /// Annotated overlay file name, `None` when rendering failed.
    pub output_image: Option<String>,
    /// Per-building table file name, `None` when no building was found.
    pub individual_csv: Option<String>,
}

/// Batch-level accumulator, owned by the single result collector.
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub records: Vec<ImageRecord>,
    pub failed: Vec<(String, String)>,
}

impl BatchSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: ImageRecord) {
        self.records.push(record);
    }

    pub fn push_failure(&mut self, image_filename: impl Into<String>, reason: impl Into<String>) {
        self.failed.push((image_filename.into(), reason.into()));
    }

    /// Sort rows by file name so output order does not depend on worker timing.
    pub fn sort(&mut self) {
        self.records.sort_by(|a, b| a.image_filename.cmp(&b.image_filename));
        self.failed.sort();
    }

    pub fn processed(&self) -> usize {
        self.records.len()
    }

    pub fn total_buildings(&self) -> usize {
        self.records.iter().map(|r| r.result.building_count).sum()
    }

    pub fn total_foreground_pixels(&self) -> u64 {
        self.records.iter().map(|r| r.result.total_foreground_pixels).sum()
    }

    pub fn mean_buildings_per_image(&self) -> f64 {
        if self.records.is_empty() {
            return 0.0;
        }
        self.total_buildings() as f64 / self.records.len() as f64
    }
}
