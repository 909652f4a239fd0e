use image::{DynamicImage, GrayImage, Luma};
use std::path::{Path, PathBuf};

pub const LIGHT: u8 = 255;
pub const DARK: u8 = 0;

/// Axis-aligned dark square: top-left corner and side length.
#[derive(Debug, Clone, Copy)]
pub struct Square {
    pub x: u32,
    pub y: u32,
    pub side: u32,
}

impl Square {
    pub const fn new(x: u32, y: u32, side: u32) -> Self {
        Self { x, y, side }
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.x + self.side && y >= self.y && y < self.y + self.side
    }

    pub fn pixel_count(&self) -> u32 {
        self.side * self.side
    }
}

/// Uniform raster with no structure at all.
pub fn blank_raster(width: u32, height: u32, value: u8) -> GrayImage {
    GrayImage::from_pixel(width, height, Luma([value]))
}

/// Light raster with dark squares painted on it.
pub fn raster_with_squares(width: u32, height: u32, squares: &[Square]) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        if squares.iter().any(|s| s.contains(x, y)) {
            Luma([DARK])
        } else {
            Luma([LIGHT])
        }
    })
}

pub const SINGLE_SQUARE: Square = Square::new(20, 20, 12);

/// One isolated 12x12 dark square in a 52x52 light raster.
pub fn single_square_raster() -> GrayImage {
    raster_with_squares(52, 52, &[SINGLE_SQUARE])
}

pub const LEFT_SQUARE: Square = Square::new(10, 10, 12);
pub const RIGHT_SQUARE: Square = Square::new(27, 10, 12);

/// Two 12x12 dark squares joined by a one pixel tall dark bridge.
pub fn bridged_squares_raster() -> GrayImage {
    let mut raster = raster_with_squares(50, 32, &[LEFT_SQUARE, RIGHT_SQUARE]);
    for x in 22..27 {
        raster.put_pixel(x, 15, Luma([DARK]));
    }
    raster
}

/// Deterministic speckled mask (about one pixel in three set).
pub fn speckled_mask(width: u32, height: u32, seed: u32) -> GrayImage {
    let mut state = seed;
    GrayImage::from_fn(width, height, |_, _| {
        state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        if (state >> 16) % 3 == 0 {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Save a raster as PNG inside `dir` and return its path.
pub fn save_png(dir: &Path, name: &str, raster: &GrayImage) -> PathBuf {
    let path = dir.join(name);
    DynamicImage::ImageLuma8(raster.clone())
        .save_with_format(&path, image::ImageFormat::Png)
        .expect("Failed to save test image");
    path
}

/// Write a raster as an RGB bitmap under `dir`.
pub fn save_bmp(dir: &Path, name: &str, raster: &GrayImage) -> PathBuf {
    let path = dir.join(name);
    DynamicImage::ImageRgb8(DynamicImage::ImageLuma8(raster.clone()).to_rgb8())
        .save_with_format(&path, image::ImageFormat::Bmp)
        .expect("Failed to save test image");
    path
}

/// Run the default pipeline on a grayscale raster.
pub fn detect_default(raster: &GrayImage) -> footprints::ImageResult {
    footprints::DetectionPipeline::default()
        .detect(&DynamicImage::ImageLuma8(raster.clone()))
        .expect("detection failed")
}
