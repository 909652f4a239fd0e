use clap::Parser;
use flexi_logger::Logger;
use std::path::PathBuf;

use footprints::pipeline::collect_inputs;
use footprints::{BatchExecutor, DebugConfig, DetectionConfig, DetectionPipeline, PipelineContext};

#[derive(Parser)]
#[command(name = "footprints")]
#[command(about = "Detect and count building footprints in raster label maps")]
struct Cli {
    /// Image file or folder of images
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output folder for overlays and result tables
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// JSON file with detection parameters
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Adaptive threshold block size (odd)
    #[arg(long)]
    block_size: Option<u32>,

    /// Adaptive threshold offset
    #[arg(long)]
    offset: Option<f32>,

    /// Cleanup kernel size (odd)
    #[arg(long)]
    cleanup_kernel: Option<u32>,

    /// Cleanup iterations
    #[arg(long)]
    cleanup_iterations: Option<u32>,

    /// Peak structuring element size (odd)
    #[arg(long)]
    peak_kernel: Option<u32>,

    /// Peak threshold as a fraction of the strongest response
    #[arg(long)]
    peak_ratio: Option<f32>,

    /// Number of images processed in parallel
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Skip writing annotated overlays
    #[arg(long)]
    no_render: bool,

    /// Save stage outputs to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn detection_config(&self) -> anyhow::Result<DetectionConfig> {
        let mut config = match &self.config {
            Some(path) => DetectionConfig::from_json_file(path)?,
            None => DetectionConfig::default(),
        };
        if let Some(v) = self.block_size {
            config.block_size = v;
        }
        if let Some(v) = self.offset {
            config.offset = v;
        }
        if let Some(v) = self.cleanup_kernel {
            config.cleanup_kernel_size = v;
        }
        if let Some(v) = self.cleanup_iterations {
            config.cleanup_iterations = v;
        }
        if let Some(v) = self.peak_kernel {
            config.peak_kernel_size = v;
        }
        if let Some(v) = self.peak_ratio {
            config.peak_threshold_ratio = v;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let level = if args.verbose { "debug" } else { "info" };
    let _logger = Logger::try_with_env_or_str(level)?.start()?;

    let pipeline = DetectionPipeline::new(args.detection_config()?)?;

    let debug = match &args.debug_out {
        Some(dir) => Some(DebugConfig::new(dir.clone())?),
        None => None,
    };
    let context = PipelineContext {
        render: !args.no_render,
        debug,
    };

    let inputs = collect_inputs(&args.input)?;
    if inputs.is_empty() {
        log::warn!("No image files found in {}", args.input.display());
        return Ok(());
    }

    let mut executor = BatchExecutor::new(pipeline, context);
    if let Some(jobs) = args.jobs {
        executor = executor.with_jobs(jobs);
    }
    let summary = executor.run(inputs, &args.output).await?;

    log::info!("=== SUMMARY ===");
    log::info!("Total images processed: {}", summary.processed());
    log::info!("Failed images: {}", summary.failed.len());
    log::info!("Total buildings detected: {}", summary.total_buildings());
    log::info!("Average buildings per image: {:.2}", summary.mean_buildings_per_image());
    log::info!("Total building area (pixels): {}", summary.total_foreground_pixels());

    if summary.records.is_empty() {
        return Err(anyhow::anyhow!("No images were successfully processed"));
    }
    Ok(())
}
