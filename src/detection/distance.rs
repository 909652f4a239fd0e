use image::{GrayImage, Luma};
use imageproc::definitions::Image;
use imageproc::distance_transform::euclidean_squared_distance_transform;
use imageproc::map::map_colors;

use super::preprocessing::BACKGROUND;

/// Per-pixel distance to the nearest background pixel.
pub type DistanceField = Image<Luma<f32>>;

/// Exact Euclidean distance transform of a binary mask.
///
/// Background pixels hold 0. Pixels outside the image are not background,
/// so a mask without any background pixel has no finite distances; it maps
/// to an all-zero field, which the peak stage treats as flat.
pub fn distance_transform(mask: &GrayImage) -> DistanceField {
    let (width, height) = mask.dimensions();
    if !mask.pixels().any(|p| p[0] == BACKGROUND) {
        log::debug!("mask has no background pixels, distance field is flat");
        return DistanceField::new(width, height);
    }

    // The transform measures distance to non-zero pixels, so background has to be lit.
    let seeds = map_colors(mask, |p| {
        if p[0] == BACKGROUND {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    });
    let squared = euclidean_squared_distance_transform(&seeds);

    map_colors(&squared, |p| Luma([p[0].sqrt() as f32]))
}

/// Largest value of the field, 0 for an empty field.
pub fn max_value(field: &DistanceField) -> f32 {
    field.pixels().map(|p| p[0]).fold(0.0, f32::max)
}

/// Rescale a field to 0..255 for display.
pub fn to_display(field: &DistanceField) -> GrayImage {
    let max = max_value(field);
    if max <= 0.0 {
        let (width, height) = field.dimensions();
        return GrayImage::new(width, height);
    }
    map_colors(field, |p| Luma([(p[0] / max * 255.0).round().clamp(0.0, 255.0) as u8]))
}
