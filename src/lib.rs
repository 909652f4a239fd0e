pub mod config;
pub mod detection;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod render;
pub mod report;

pub use config::{DetectionConfig, RenderStyle};
pub use detection::{DetectionPipeline, StageOutputs};
pub use error::PipelineError;
pub use models::{BatchSummary, BuildingRecord, ImageRecord, ImageResult};
pub use pipeline::{BatchExecutor, DebugConfig, PipelineContext};
