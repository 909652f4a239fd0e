use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{PipelineError, Result};

/// Largest per-side radius the binary morphology accepts.
const MAX_MORPH_RADIUS: u32 = u8::MAX as u32;

/// Tunable parameters of the detection pipeline.
///
/// The defaults were tuned on 1 m/pixel building label maps and are not
/// expected to transfer unchanged to other resolutions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Side of the square neighborhood used for the local mean (odd).
    pub block_size: u32,
    /// Constant subtracted from the local mean before comparing.
    pub offset: f32,
    /// Side of the square cleanup kernel (odd).
    pub cleanup_kernel_size: u32,
    /// How many times erosion and dilation are applied during cleanup.
    pub cleanup_iterations: u32,
    /// Propagation mask size of the distance transform: 3, 5, or 0 for exact.
    pub distance_mask_size: u32,
    /// Side of the elliptical top-hat element (odd).
    pub peak_kernel_size: u32,
    /// Peaks are kept at or above this fraction of the strongest response.
    pub peak_threshold_ratio: f32,
    pub render: RenderStyle,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            block_size: 15,
            offset: 10.0,
            cleanup_kernel_size: 3,
            cleanup_iterations: 2,
            distance_mask_size: 5,
            peak_kernel_size: 7,
            peak_threshold_ratio: 0.3,
            render: RenderStyle::default(),
        }
    }
}

impl DetectionConfig {
    /// Load a configuration from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.display(), e))?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| anyhow::anyhow!("Failed to parse config {}: {}", path.display(), e))?;
        Ok(config)
    }

    /// Radius of the combined cleanup element (iterations folded into one pass).
    pub fn cleanup_radius(&self) -> u32 {
        self.cleanup_iterations * (self.cleanup_kernel_size / 2)
    }

    pub fn validate(&self) -> Result<()> {
        if self.block_size < 3 || self.block_size % 2 == 0 {
            return Err(invalid(format!(
                "block_size must be odd and at least 3, got {}",
                self.block_size
            )));
        }
        if !self.offset.is_finite() {
            return Err(invalid(format!("offset must be finite, got {}", self.offset)));
        }
        if self.cleanup_kernel_size == 0 || self.cleanup_kernel_size % 2 == 0 {
            return Err(invalid(format!(
                "cleanup_kernel_size must be odd and positive, got {}",
                self.cleanup_kernel_size
            )));
        }
        if self.cleanup_iterations == 0 {
            return Err(invalid("cleanup_iterations must be at least 1".to_string()));
        }
        if self.cleanup_radius() > MAX_MORPH_RADIUS {
            return Err(invalid(format!(
                "cleanup kernel {} with {} iterations exceeds radius {}",
                self.cleanup_kernel_size, self.cleanup_iterations, MAX_MORPH_RADIUS
            )));
        }
        if !matches!(self.distance_mask_size, 0 | 3 | 5) {
            return Err(invalid(format!(
                "distance_mask_size must be 0, 3 or 5, got {}",
                self.distance_mask_size
            )));
        }
        if self.peak_kernel_size == 0 || self.peak_kernel_size % 2 == 0 {
            return Err(invalid(format!(
                "peak_kernel_size must be odd and positive, got {}",
                self.peak_kernel_size
            )));
        }
        if !(0.0..=1.0).contains(&self.peak_threshold_ratio) {
            return Err(invalid(format!(
                "peak_threshold_ratio must be within [0, 1], got {}",
                self.peak_threshold_ratio
            )));
        }
        if self.render.glyph_scale == 0 {
            return Err(invalid("render.glyph_scale must be at least 1".to_string()));
        }
        Ok(())
    }
}

fn invalid(message: String) -> PipelineError {
    PipelineError::InvalidConfig(message)
}

/// Cosmetic settings for the annotated overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderStyle {
    pub marker_radius: u32,
    pub marker_color: [u8; 3],
    pub text_color: [u8; 3],
    pub outline_color: [u8; 3],
    /// Pixel size of one glyph cell.
    pub glyph_scale: u32,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            marker_radius: 3,
            marker_color: [0, 255, 0],
            text_color: [255, 255, 255],
            outline_color: [0, 0, 0],
            glyph_scale: 2,
        }
    }
}
