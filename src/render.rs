//! Annotated overlay for visual checks.
//!
//! Purely cosmetic: callers compute metrics first and treat a rendering
//! error as a warning.

use anyhow::Result;
use image::{GrayImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut};
use imageproc::rect::Rect;

use crate::config::RenderStyle;
use crate::models::BuildingRecord;

const GLYPH_WIDTH: u32 = 3;
const GLYPH_HEIGHT: u32 = 5;

// 3x5 digit bitmaps, one row per entry, high bit on the left.
const DIGITS: [[u8; 5]; 10] = [
    [0b111, 0b101, 0b101, 0b101, 0b111],
    [0b010, 0b110, 0b010, 0b010, 0b111],
    [0b111, 0b001, 0b111, 0b100, 0b111],
    [0b111, 0b001, 0b111, 0b001, 0b111],
    [0b101, 0b101, 0b111, 0b001, 0b001],
    [0b111, 0b100, 0b111, 0b001, 0b111],
    [0b111, 0b100, 0b111, 0b101, 0b111],
    [0b111, 0b001, 0b010, 0b010, 0b010],
    [0b111, 0b101, 0b111, 0b101, 0b111],
    [0b111, 0b101, 0b111, 0b001, 0b111],
];

/// Draw a marker and a sequential number at every building centroid.
///
/// Numbers start at 1 and follow the order of `buildings`.
pub fn render(
    cleaned: &GrayImage,
    buildings: &[BuildingRecord],
    style: &RenderStyle,
) -> Result<RgbImage> {
    let (width, height) = cleaned.dimensions();
    if style.glyph_scale == 0 {
        return Err(anyhow::anyhow!("glyph scale must be at least 1"));
    }

    let mut canvas = RgbImage::from_fn(width, height, |x, y| {
        let v = cleaned.get_pixel(x, y)[0];
        Rgb([v, v, v])
    });

    for (idx, building) in buildings.iter().enumerate() {
        let (cx, cy) = building.center();
        if cx >= width || cy >= height {
            return Err(anyhow::anyhow!(
                "building {} centroid ({}, {}) outside {}x{} image",
                building.id, cx, cy, width, height
            ));
        }

        let label = (idx + 1).to_string();
        let left = cx as i32 + style.marker_radius as i32 + 2;
        let top = cy as i32 - (GLYPH_HEIGHT * style.glyph_scale) as i32 / 2;

        // Outline first so the text stays readable on white blobs.
        let scale = style.glyph_scale;
        draw_text(&mut canvas, &label, left, top, scale, Rgb(style.outline_color), 1);
        draw_text(&mut canvas, &label, left, top, scale, Rgb(style.text_color), 0);

        draw_filled_circle_mut(
            &mut canvas,
            (cx as i32, cy as i32),
            style.marker_radius as i32,
            Rgb(style.marker_color),
        );
    }

    Ok(canvas)
}

fn draw_text(
    canvas: &mut RgbImage,
    text: &str,
    left: i32,
    top: i32,
    scale: u32,
    color: Rgb<u8>,
    grow: u32,
) {
    let advance = ((GLYPH_WIDTH + 1) * scale) as i32;
    for (i, ch) in text.chars().enumerate() {
        let Some(digit) = ch.to_digit(10) else {
            continue;
        };
        let glyph = &DIGITS[digit as usize];
        let x0 = left + i as i32 * advance;
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                    continue;
                }
                let x = x0 + (col * scale) as i32 - grow as i32;
                let y = top + (row as u32 * scale) as i32 - grow as i32;
                let side = scale + 2 * grow;
                draw_filled_rect_mut(canvas, Rect::at(x, y).of_size(side, side), color);
            }
        }
    }
}
