use image::{DynamicImage, GrayImage, Luma};
use imageproc::filter::box_filter;

pub const FOREGROUND: u8 = 255;
pub const BACKGROUND: u8 = 0;

/// Convert image to a single intensity channel.
///
/// Color inputs are collapsed with the `image` crate's luma weights; inputs
/// with higher bit depth are scaled down to 8 bits.
pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
    match img {
        DynamicImage::ImageLuma8(gray) => gray.clone(),
        other => other.to_luma8(),
    }
}

/// Inverted adaptive mean threshold.
///
/// A pixel becomes foreground when it is at least `offset` darker than the
/// mean of the `block_size` x `block_size` window around it. The window
/// repeats edge pixels past the image border.
pub fn binarize(gray: &GrayImage, block_size: u32, offset: f32) -> GrayImage {
    let radius = block_size / 2;
    let means = box_filter(gray, radius, radius);

    // Integer offsets round up so fractional values never loosen the test.
    let delta = offset.ceil() as i32;

    let (width, height) = gray.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let value = gray.get_pixel(x, y)[0] as i32;
        let mean = means.get_pixel(x, y)[0] as i32;
        if value - mean <= -delta {
            Luma([FOREGROUND])
        } else {
            Luma([BACKGROUND])
        }
    })
}

pub fn count_foreground(mask: &GrayImage) -> u64 {
    mask.pixels().filter(|p| p[0] != BACKGROUND).count() as u64
}
