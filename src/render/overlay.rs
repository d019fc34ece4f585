use super::{RenderError, open_image, save_flattened};
use crate::placement::{self, Corner};
use image::{DynamicImage, GenericImageView, imageops::FilterType};
use std::path::Path;

pub struct OverlayStyle {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub anchor: Corner,
    /// Raw pixel paddings; the image path does not scale them.
    pub h_padding: i32,
    pub v_padding: i32,
}

/// Final watermark size on a `canvas` sized image.
///
/// A single requested dimension derives the other from the watermark's
/// aspect ratio. When both are requested but the watermark or the requested
/// size exceeds the canvas, the watermark keeps its own size.
pub fn fit_watermark(
    watermark: (u32, u32),
    canvas: (u32, u32),
    width: Option<u32>,
    height: Option<u32>,
) -> (u32, u32) {
    let (wm_w, wm_h) = watermark;
    let (canvas_w, canvas_h) = canvas;

    match (width, height) {
        (Some(w), Some(h)) => {
            let fits = wm_w < canvas_w && wm_h < canvas_h && w <= canvas_w && h <= canvas_h;
            if fits { (w, h) } else { watermark }
        }
        (None, Some(h)) => (((wm_w as u64 * h as u64) / wm_h.max(1) as u64) as u32, h),
        (Some(w), None) => (w, ((wm_h as u64 * w as u64) / wm_w.max(1) as u64) as u32),
        (None, None) => watermark,
    }
}

/// Paste `watermark` onto `image` using the watermark's alpha as the mask.
pub fn render_image(
    image: &DynamicImage,
    watermark: &DynamicImage,
    style: &OverlayStyle,
) -> DynamicImage {
    let mut base = image.to_rgba8();
    let (width, height) = base.dimensions();

    let (wm_w, wm_h) = fit_watermark(
        watermark.dimensions(),
        (width, height),
        style.width,
        style.height,
    );
    let mark = if (wm_w, wm_h) == watermark.dimensions() {
        watermark.to_rgba8()
    } else {
        image::imageops::resize(
            &watermark.to_rgba8(),
            wm_w.max(1),
            wm_h.max(1),
            FilterType::CatmullRom,
        )
    };

    let origin = placement::compute(
        width,
        height,
        mark.width(),
        mark.height(),
        style.anchor,
        style.h_padding,
        style.v_padding,
    );
    image::imageops::overlay(&mut base, &mark, origin.x as i64, origin.y as i64);

    DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(base).to_rgb8())
}

pub fn watermark_image_file(
    source: &Path,
    destination: &Path,
    watermark: &DynamicImage,
    style: &OverlayStyle,
) -> Result<(), RenderError> {
    let image = open_image(source)?;
    let rendered = render_image(&image, watermark, style);
    save_flattened(&rendered, destination)
}
