mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from footprints for tests
pub use footprints::{
    BatchExecutor, BuildingRecord, DebugConfig, DetectionConfig, DetectionPipeline, ImageResult,
    PipelineContext, PipelineError,
};
