use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::models::{BatchSummary, ImageRecord, ImageResult};

pub const AGGREGATE_HEADER: &str = "image_filename,building_count,total_building_area_pixels,building_centers_area_pixels,coverage_percentage,output_image,individual_csv,image_width,image_height";

pub const BUILDINGS_HEADER: &str = "building_number,center_x,center_y,area_pixels,label_id";

impl ImageRecord {
    /// Export the record as one row of the aggregate table.
    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{},{}",
            escape(&self.image_filename),
            self.result.building_count,
            self.result.total_foreground_pixels,
            self.result.total_peak_pixels,
            self.result.coverage_percentage,
            escape(self.output_image.as_deref().unwrap_or("")),
            escape(self.individual_csv.as_deref().unwrap_or("")),
            self.result.width,
            self.result.height,
        )
    }
}

/// Write the aggregate table, one row per processed image.
pub fn write_aggregate_csv(path: &Path, summary: &BatchSummary) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut out = BufWriter::new(file);

    writeln!(out, "{}", AGGREGATE_HEADER)?;
    for record in &summary.records {
        writeln!(out, "{}", record.to_csv_row())?;
    }
    out.flush()?;
    Ok(())
}

/// Write the per-building table of one image.
///
/// `building_number` restarts at 1 for every image; `label_id` is the
/// region label the number was drawn for.
pub fn write_buildings_csv(path: &Path, result: &ImageResult) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut out = BufWriter::new(file);

    writeln!(out, "{}", BUILDINGS_HEADER)?;
    for (i, building) in result.buildings.iter().enumerate() {
        writeln!(
            out,
            "{},{},{},{},{}",
            i + 1,
            building.centroid_x,
            building.centroid_y,
            building.area_pixels,
            building.id
        )?;
    }
    out.flush()?;
    Ok(())
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
