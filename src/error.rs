use thiserror::Error;

/// Errors raised by the detection core.
///
/// Degenerate outcomes (no foreground, no peaks) are not errors; they
/// produce an `ImageResult` with `building_count == 0`.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The raster has no pixels.
    #[error("input raster is empty ({width}x{height})")]
    EmptyInput { width: u32, height: u32 },

    /// A configuration value is outside its valid range.
    #[error("invalid detection configuration: {0}")]
    InvalidConfig(String),

    /// Failed to decode an input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
