use image::{GrayImage, Luma};
use imageproc::definitions::Image;
use imageproc::region_labelling::{connected_components, Connectivity};

use super::preprocessing::BACKGROUND;

/// Label 0 is background; regions are numbered 1..=count.
pub type LabelMap = Image<Luma<u32>>;

/// Label the 8-connected regions of a peak mask.
///
/// Labels are renumbered so that regions appear in the order their first
/// pixel is met in a row-major scan. Returns the label map and the number
/// of regions.
pub fn label(peaks: &GrayImage) -> (LabelMap, usize) {
    let mut labels = connected_components(peaks, Connectivity::Eight, Luma([BACKGROUND]));

    // Raw label -> scan-order label, 0 meaning not seen yet.
    let mut remap: Vec<u32> = Vec::new();
    let mut next = 0u32;

    for pixel in labels.pixels_mut() {
        let raw = pixel[0] as usize;
        if raw == 0 {
            continue;
        }
        if raw >= remap.len() {
            remap.resize(raw + 1, 0);
        }
        if remap[raw] == 0 {
            next += 1;
            remap[raw] = next;
        }
        pixel[0] = remap[raw];
    }

    (labels, next as usize)
}
