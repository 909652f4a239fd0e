//! Morphological operators used by the cleanup and peak stages.
//!
//! Binary erosion and dilation go through `imageproc`; the grey-level
//! operators work on floating point fields, which `imageproc` does not cover.

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::definitions::Image;
use imageproc::distance_transform::Norm;
use imageproc::morphology;

use super::preprocessing::{count_foreground, BACKGROUND};

/// Flat structuring element for the grey-level operators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuringElement {
    offsets: Vec<(i32, i32)>,
}

impl StructuringElement {
    /// Ellipse inscribed in a `size` x `size` square (odd size).
    pub fn ellipse(size: u32) -> Self {
        let r = (size / 2) as i32;
        if r == 0 {
            return Self { offsets: vec![(0, 0)] };
        }
        // Each row spans round(r * sqrt(1 - (dy / r)^2)) to either side.
        let mut offsets = Vec::new();
        for dy in -r..=r {
            let rows_left = (r * r - dy * dy) as f64 / (r * r) as f64;
            let half = (r as f64 * rows_left.sqrt()).round() as i32;
            for dx in -half..=half {
                offsets.push((dx, dy));
            }
        }
        Self { offsets }
    }

    /// (dx, dy) offsets relative to the center for all active cells, row-major.
    pub fn offsets(&self) -> &[(i32, i32)] {
        &self.offsets
    }
}

/// Binary opening with a square kernel applied `iterations` times.
///
/// Repeating erosion with a square of radius r is the same as a single
/// erosion with radius `iterations * r`, so the passes are folded together.
/// Pixels outside the image never erode the mask. The result is always a
/// subset of `mask`.
pub fn clean(mask: &GrayImage, kernel_size: u32, iterations: u32) -> GrayImage {
    let radius = iterations * (kernel_size / 2);
    if radius == 0 {
        return mask.clone();
    }
    // Radius is bounded by config validation.
    let k = radius.min(u8::MAX as u32) as u8;

    // imageproc dilates an empty image to a full one, so stop here.
    let eroded = morphology::erode(mask, Norm::LInf, k);
    if count_foreground(&eroded) == 0 {
        let (width, height) = mask.dimensions();
        return GrayImage::new(width, height);
    }

    let mut opened = morphology::dilate(&eroded, Norm::LInf, k);
    for (out, src) in opened.pixels_mut().zip(mask.pixels()) {
        if src[0] == BACKGROUND {
            out[0] = BACKGROUND;
        }
    }
    opened
}

/// Grey-level erosion: minimum over the element, ignoring cells past the border.
pub fn erode(field: &Image<Luma<f32>>, element: &StructuringElement) -> Image<Luma<f32>> {
    extremum(field, element.offsets(), f32::min)
}

/// Grey-level dilation: maximum over the element, ignoring cells past the border.
pub fn dilate(field: &Image<Luma<f32>>, element: &StructuringElement) -> Image<Luma<f32>> {
    extremum(field, element.offsets(), f32::max)
}

pub fn opening(field: &Image<Luma<f32>>, element: &StructuringElement) -> Image<Luma<f32>> {
    dilate(&erode(field, element), element)
}

/// White top-hat: the field minus its opening.
///
/// Opening never exceeds the source, so the response is non-negative.
pub fn top_hat(field: &Image<Luma<f32>>, element: &StructuringElement) -> Image<Luma<f32>> {
    let opened = opening(field, element);
    let (width, height) = field.dimensions();
    ImageBuffer::from_fn(width, height, |x, y| {
        let response = field.get_pixel(x, y)[0] - opened.get_pixel(x, y)[0];
        Luma([response.max(0.0)])
    })
}

fn extremum(
    field: &Image<Luma<f32>>,
    offsets: &[(i32, i32)],
    pick: fn(f32, f32) -> f32,
) -> Image<Luma<f32>> {
    let (width, height) = field.dimensions();
    let (w, h) = (width as i32, height as i32);
    ImageBuffer::from_fn(width, height, |x, y| {
        let mut acc = field.get_pixel(x, y)[0];
        for &(dx, dy) in offsets {
            let nx = x as i32 + dx;
            let ny = y as i32 + dy;
            if nx < 0 || ny < 0 || nx >= w || ny >= h {
                continue;
            }
            acc = pick(acc, field.get_pixel(nx as u32, ny as u32)[0]);
        }
        Luma([acc])
    })
}
