//! Batch orchestration around the single-image detection pipeline.
//!
//! Images are decoded and processed on blocking workers; outcomes flow
//! through one channel to a single collector that owns the
//! [`BatchSummary`], so the detection core itself needs no locking.

use anyhow::Result;
use image::{GrayImage, ImageReader, Luma};
use std::collections::{HashMap, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};

use crate::detection::{distance, DetectionPipeline, StageOutputs};
use crate::error::PipelineError;
use crate::models::{BatchSummary, ImageRecord};
use crate::render::render;
use crate::report::{write_aggregate_csv, write_buildings_csv};

/// File extensions picked up when scanning a folder.
pub const SUPPORTED_EXTENSIONS: [&str; 6] = ["tif", "tiff", "jpg", "jpeg", "png", "bmp"];

pub const RESULTS_CSV: &str = "building_detection_results.csv";

/// Debug configuration for pipeline execution
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for debug outputs
    pub output_dir: PathBuf,
}

impl DebugConfig {
    /// Use `output_dir` for stage images. The directory must be empty or non-existent.
    pub fn new(output_dir: PathBuf) -> Result<Self> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                return Err(anyhow::anyhow!(
                    "Debug directory is not empty: {}",
                    output_dir.display()
                ));
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }
        Ok(Self { output_dir })
    }

    /// Save every intermediate stage as `<NN>_<stage>/<stem>.png`.
    pub fn save_stages(&self, stem: &str, gray: &GrayImage, stages: &StageOutputs) -> Result<()> {
        let labels = GrayImage::from_fn(stages.labels.width(), stages.labels.height(), |x, y| {
            match stages.labels.get_pixel(x, y)[0] {
                0 => Luma([0u8]),
                // Spread neighbouring labels over distinct grey levels.
                label => Luma([(55 + (label % 200) * 53 % 200) as u8]),
            }
        });

        let distance_view = distance::to_display(&stages.distance);
        let outputs: [(&str, &GrayImage); 6] = [
            ("input", gray),
            ("binary", &stages.binary),
            ("cleaned", &stages.cleaned),
            ("distance", &distance_view),
            ("peaks", &stages.peaks),
            ("labels", &labels),
        ];

        for (idx, (step_name, image)) in outputs.iter().enumerate() {
            let step_dir = self.output_dir.join(format!("{:02}_{}", idx, step_name));
            std::fs::create_dir_all(&step_dir)?;
            let output_path = step_dir.join(format!("{}.png", stem));
            image
                .save(&output_path)
                .map_err(|e| anyhow::anyhow!("Failed to save debug image: {}", e))?;
            log::debug!("Debug: saved {}", output_path.display());
        }
        Ok(())
    }
}

/// Context shared by all batch workers
#[derive(Clone, Debug)]
pub struct PipelineContext {
    /// Write annotated overlays next to the per-building tables.
    pub render: bool,
    pub debug: Option<DebugConfig>,
}

impl Default for PipelineContext {
    fn default() -> Self {
        Self {
            render: true,
            debug: None,
        }
    }
}

/// List the images to process: the file itself, or the supported images of a folder sorted by name.
pub fn collect_inputs(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        return Err(anyhow::anyhow!("Input path does not exist: {}", path.display()));
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(path)? {
        let entry_path = entry?.path();
        if entry_path.is_file() && is_supported(&entry_path) {
            files.push(entry_path);
        }
    }
    files.sort();
    Ok(files)
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string())
}

/// Output name stem for every input, in input order.
///
/// Inputs sharing a file stem (`tile.png`, `tile.bmp`) keep their extension
/// so their overlays and tables never overwrite each other.
pub fn output_stems(inputs: &[PathBuf]) -> Vec<String> {
    let mut stem_counts: HashMap<String, usize> = HashMap::new();
    for path in inputs {
        *stem_counts.entry(file_stem(path)).or_default() += 1;
    }

    let mut taken = HashSet::new();
    inputs
        .iter()
        .map(|path| {
            let stem = file_stem(path);
            let base = if stem_counts.get(&stem).copied().unwrap_or(0) > 1 {
                file_name(path)
            } else {
                stem
            };
            // Same file name in different folders.
            let mut candidate = base.clone();
            let mut n = 2;
            while !taken.insert(candidate.clone()) {
                candidate = format!("{}_{}", base, n);
                n += 1;
            }
            candidate
        })
        .collect()
}

/// Run `work`, turning a panic into an error for `image_filename`.
fn guarded<T>(image_filename: &str, work: impl FnOnce() -> Result<T>) -> Result<T> {
    match catch_unwind(AssertUnwindSafe(work)) {
        Ok(result) => result,
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(anyhow::anyhow!(
                "Worker panicked while processing {}: {}",
                image_filename,
                reason
            ))
        }
    }
}

struct Outcome {
    image_filename: String,
    result: Result<ImageRecord>,
}

/// Runs the detection pipeline over many images in parallel.
pub struct BatchExecutor {
    pipeline: Arc<DetectionPipeline>,
    context: PipelineContext,
    jobs: usize,
}

impl BatchExecutor {
    pub fn new(pipeline: DetectionPipeline, context: PipelineContext) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            context,
            jobs: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
        }
    }

    /// Limit the number of images processed at once.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Process `inputs`, writing overlays and tables under `output_dir`.
    ///
    /// A failing image is recorded in the summary and does not stop the batch.
    pub async fn run(&self, inputs: Vec<PathBuf>, output_dir: &Path) -> Result<BatchSummary> {
        let images_dir = output_dir.join("images");
        std::fs::create_dir_all(&images_dir)?;

        log::info!("Found {} image files to process", inputs.len());

        let stems = output_stems(&inputs);
        let (sender, mut receiver) = mpsc::channel::<Outcome>(self.jobs * 2);
        let semaphore = Arc::new(Semaphore::new(self.jobs));

        let producer = {
            let pipeline = self.pipeline.clone();
            let context = self.context.clone();
            let images_dir = images_dir.clone();
            tokio::spawn(async move {
                for (path, stem) in inputs.into_iter().zip(stems) {
                    let permit = semaphore.clone().acquire_owned().await?;
                    let sender = sender.clone();
                    let pipeline = pipeline.clone();
                    let context = context.clone();
                    let images_dir = images_dir.clone();

                    tokio::task::spawn_blocking(move || {
                        let _permit = permit;
                        let image_filename = file_name(&path);
                        let result = guarded(&image_filename, || {
                            process_image(&pipeline, &context, &path, &stem, &images_dir)
                        });
                        let outcome = Outcome {
                            image_filename,
                            result,
                        };
                        // The receiver only goes away when the collector has already failed.
                        let _ = sender.blocking_send(outcome);
                    });
                }
                anyhow::Ok(())
            })
        };

        let mut summary = BatchSummary::new();
        while let Some(outcome) = receiver.recv().await {
            match outcome.result {
                Ok(record) => {
                    log::info!(
                        "Completed {}: {} buildings detected",
                        record.image_filename,
                        record.result.building_count
                    );
                    summary.push(record);
                }
                Err(e) => {
                    log::warn!("Failed to process {}: {:#}", outcome.image_filename, e);
                    summary.push_failure(outcome.image_filename, format!("{:#}", e));
                }
            }
        }
        producer.await??;

        summary.sort();
        if !summary.records.is_empty() {
            let csv_path = output_dir.join(RESULTS_CSV);
            write_aggregate_csv(&csv_path, &summary)?;
            log::info!("Results saved to: {}", csv_path.display());
        }

        Ok(summary)
    }
}

/// Decode, detect, and persist the outputs of one image.
///
/// Output files are named after `stem`. Failing debug dumps or overlays are
/// logged and never discard the computed metrics.
pub fn process_image(
    pipeline: &DetectionPipeline,
    context: &PipelineContext,
    path: &Path,
    stem: &str,
    images_dir: &Path,
) -> Result<ImageRecord> {
    let img = ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(PipelineError::from)?;

    let image_filename = file_name(path);

    let gray = crate::detection::preprocessing::to_grayscale(&img);
    let stages = pipeline.run_stages_gray(&gray)?;

    if let Some(debug) = &context.debug {
        if let Err(e) = debug.save_stages(stem, &gray, &stages) {
            log::warn!("Debug output failed for {}: {:#}", image_filename, e);
        }
    }

    // Metrics are final at this point; the overlay can only add a file.
    let output_image = if context.render {
        let output_name = format!("numbered_{}.png", stem);
        let rendered = render(&stages.cleaned, &stages.result.buildings, &pipeline.config().render)
            .and_then(|overlay| {
                overlay
                    .save(images_dir.join(&output_name))
                    .map_err(|e| anyhow::anyhow!("Failed to save overlay: {}", e))
            });
        match rendered {
            Ok(()) => Some(output_name),
            Err(e) => {
                log::warn!("Rendering failed for {}: {:#}", image_filename, e);
                None
            }
        }
    } else {
        None
    };

    let result = stages.result;
    let individual_csv = if result.is_empty() {
        None
    } else {
        let csv_name = format!("{}_buildings.csv", stem);
        write_buildings_csv(&images_dir.join(&csv_name), &result)?;
        Some(csv_name)
    };

    Ok(ImageRecord {
        image_filename,
        result,
        output_image,
        individual_csv,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_stems_keep_extension_only_on_collision() {
        let inputs: Vec<PathBuf> = ["in/tile.png", "in/tile.bmp", "in/road.tif", "other/road.tif"]
            .iter()
            .map(PathBuf::from)
            .collect();
        assert_eq!(
            output_stems(&inputs),
            vec!["tile.png", "tile.bmp", "road.tif", "road.tif_2"]
        );

        let single = vec![PathBuf::from("in/tile.png")];
        assert_eq!(output_stems(&single), vec!["tile"]);
    }

    #[test]
    fn guarded_turns_panic_into_error() {
        let err = guarded::<()>("tile.png", || panic!("bad raster")).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("tile.png"), "{}", message);
        assert!(message.contains("bad raster"), "{}", message);

        assert_eq!(guarded("tile.png", || Ok(3)).unwrap(), 3);
    }
}
