use super::{RenderError, open_image, save_flattened};
use crate::placement::{self, Corner};
use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use std::path::Path;
use tracing::debug;

/// Smallest font size drawn, so tiny images still get legible text.
const MIN_FONT_PX: i64 = 6;

/// Extra pixels between stacked lines.
const LINE_SPACING: u32 = 4;

/// Background box margin around the text, with extra room at the bottom.
const BOX_MARGIN: i32 = 12;
const BOX_EXTRA_BOTTOM: u32 = 8;

pub struct TextStyle<'a> {
    pub font: &'a FontVec,
    pub font_size_pt: i32,
    pub color: Rgba<u8>,
    /// Alpha of the black box behind the text; 0 draws no box.
    pub background_alpha: u8,
    pub anchor: Corner,
    pub h_padding: i32,
    pub v_padding: i32,
}

/// Font size in pixels, scaled by the image's shorter side.
pub fn font_pixel_size(width: u32, height: u32, font_size_pt: i32) -> f32 {
    let shorter = width.min(height) as f64;
    let size = (shorter / 24.0 * font_size_pt as f64 / 40.0) as i64;
    size.max(MIN_FONT_PX) as f32
}

fn line_advance(font: &FontVec, scale: PxScale) -> u32 {
    font.as_scaled(scale).height().ceil() as u32 + LINE_SPACING
}

/// Bounding box of possibly multi-line text.
pub fn measure_text(font: &FontVec, scale: PxScale, text: &str) -> (u32, u32) {
    let lines: Vec<&str> = text.split('\n').collect();
    let advance = line_advance(font, scale);

    let width = lines
        .iter()
        .map(|line| text_size(scale, font, line).0)
        .max()
        .unwrap_or(0);
    let last_height = lines
        .last()
        .map(|line| text_size(scale, font, line).1)
        .unwrap_or(0);

    (width, advance * (lines.len() as u32 - 1) + last_height)
}

/// Draw `text` onto a copy of `image` and return the flattened RGB result.
pub fn render_text(image: &DynamicImage, text: &str, style: &TextStyle<'_>) -> DynamicImage {
    let mut base = image.to_rgba8();
    let (width, height) = base.dimensions();

    let scale = PxScale::from(font_pixel_size(width, height, style.font_size_pt));
    let (text_width, text_height) = measure_text(style.font, scale, text);

    let multiline = text.contains('\n');
    let (h_pad, v_pad) =
        placement::scaled_text_padding(text_height, style.h_padding, style.v_padding, multiline);
    let origin = placement::compute(
        width,
        height,
        text_width,
        text_height,
        style.anchor,
        h_pad,
        v_pad,
    );
    debug!(
        x = origin.x,
        y = origin.y,
        text_width,
        text_height,
        "Placing text watermark"
    );

    // Text goes on a transparent layer first so the box alpha composes once.
    let mut layer = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 0]));

    if style.background_alpha > 0 {
        // Both far edges are part of the box.
        let rect = Rect::at(origin.x - BOX_MARGIN, origin.y - BOX_MARGIN).of_size(
            text_width + 2 * BOX_MARGIN as u32 + 1,
            text_height + 2 * BOX_MARGIN as u32 + BOX_EXTRA_BOTTOM + 1,
        );
        draw_filled_rect_mut(&mut layer, rect, Rgba([0, 0, 0, style.background_alpha]));
    }

    let advance = line_advance(style.font, scale) as i32;
    for (i, line) in text.split('\n').enumerate() {
        draw_text_mut(
            &mut layer,
            style.color,
            origin.x,
            origin.y + advance * i as i32,
            scale,
            style.font,
            line,
        );
    }

    image::imageops::overlay(&mut base, &layer, 0, 0);
    DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(base).to_rgb8())
}

/// Read `source`, stamp the text watermark and write `destination`.
pub fn watermark_text_file(
    source: &Path,
    destination: &Path,
    text: &str,
    style: &TextStyle<'_>,
) -> Result<(), RenderError> {
    let image = open_image(source)?;
    let rendered = render_text(&image, text, style);
    save_flattened(&rendered, destination)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_pixel_size_scales_with_shorter_side() {
        assert_eq!(font_pixel_size(2400, 4800, 40), 100.0);
        assert_eq!(font_pixel_size(4800, 2400, 20), 50.0);
        assert_eq!(font_pixel_size(1000, 1000, 40), 41.0);
    }

    #[test]
    fn test_font_pixel_size_minimum() {
        assert_eq!(font_pixel_size(50, 50, 40), 6.0);
        assert_eq!(font_pixel_size(2400, 2400, 1), 6.0);
    }
}
