use image::{GrayImage, Luma};

use super::distance::{max_value, DistanceField};
use super::morphology::{top_hat, StructuringElement};
use super::preprocessing::{BACKGROUND, FOREGROUND};

/// Mark the locally peaked parts of a distance field.
///
/// The top-hat response is kept where it reaches `ratio` times its global
/// maximum. Zero responses are never peaks, so a flat field yields an empty
/// mask rather than a full one.
pub fn extract_peaks(field: &DistanceField, kernel_size: u32, ratio: f32) -> GrayImage {
    let response = top_hat(field, &StructuringElement::ellipse(kernel_size));
    let max_response = max_value(&response);
    let threshold = ratio * max_response;

    log::debug!(
        "top-hat max response {:.3}, peak threshold {:.3}",
        max_response,
        threshold
    );

    let (width, height) = response.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let value = response.get_pixel(x, y)[0];
        if value > 0.0 && value >= threshold {
            Luma([FOREGROUND])
        } else {
            Luma([BACKGROUND])
        }
    })
}
