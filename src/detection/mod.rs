pub mod preprocessing;
pub mod morphology;
pub mod distance;
pub mod peaks;
pub mod labeling;
pub mod metrics;

use image::{DynamicImage, GrayImage};

use crate::config::DetectionConfig;
use crate::error::{PipelineError, Result};
use crate::models::ImageResult;
use distance::DistanceField;
use labeling::LabelMap;

/// Every intermediate buffer of one detection run.
#[derive(Debug, Clone)]
pub struct StageOutputs {
    pub binary: GrayImage,
    pub cleaned: GrayImage,
    pub distance: DistanceField,
    pub peaks: GrayImage,
    pub labels: LabelMap,
    pub result: ImageResult,
}

/// Building detection pipeline for a single raster.
///
/// Holds only validated configuration; every run allocates its own buffers,
/// so one pipeline can be shared across threads.
#[derive(Debug, Clone)]
pub struct DetectionPipeline {
    config: DetectionConfig,
}

impl DetectionPipeline {
    /// Create a pipeline, rejecting out-of-range parameters up front.
    pub fn new(config: DetectionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Run the full detection pipeline on an image
    pub fn detect(&self, img: &DynamicImage) -> Result<ImageResult> {
        Ok(self.run_stages(img)?.result)
    }

    /// Run the pipeline and keep every stage's output.
    pub fn run_stages(&self, img: &DynamicImage) -> Result<StageOutputs> {
        let gray = preprocessing::to_grayscale(img);
        self.run_stages_gray(&gray)
    }

    /// Run the pipeline on an already single-channel raster.
    pub fn run_stages_gray(&self, gray: &GrayImage) -> Result<StageOutputs> {
        let (width, height) = gray.dimensions();
        if width == 0 || height == 0 {
            return Err(PipelineError::EmptyInput { width, height });
        }
        let config = &self.config;

        let binary = preprocessing::binarize(gray, config.block_size, config.offset);
        log::debug!(
            "binarize: {} foreground pixels",
            preprocessing::count_foreground(&binary)
        );

        let cleaned = morphology::clean(
            &binary,
            config.cleanup_kernel_size,
            config.cleanup_iterations,
        );
        log::debug!(
            "cleanup: {} foreground pixels",
            preprocessing::count_foreground(&cleaned)
        );

        let distance = distance::distance_transform(&cleaned);
        log::debug!("distance transform: max {:.2}", distance::max_value(&distance));

        let peaks = peaks::extract_peaks(
            &distance,
            config.peak_kernel_size,
            config.peak_threshold_ratio,
        );
        let (labels, count) = labeling::label(&peaks);
        log::debug!("labeling: {} peak regions", count);

        let result = metrics::aggregate(&labels, &cleaned);
        debug_assert_eq!(result.building_count, count);

        Ok(StageOutputs {
            binary,
            cleaned,
            distance,
            peaks,
            labels,
            result,
        })
    }
}

impl Default for DetectionPipeline {
    fn default() -> Self {
        Self {
            config: DetectionConfig::default(),
        }
    }
}
