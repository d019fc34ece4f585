use super::filter::FilterBuilder;
use super::{Engine, EngineCommand};
use crate::color::to_engine_color;
use crate::placement::{self, Corner};
use image::Rgba;
use std::path::Path;

/// Vertical padding factor that lines video text up with still images.
const VIDEO_TEXT_VERTICAL_SCALE: f64 = 0.7;

/// Engine font size relative to the configured point size.
const VIDEO_FONT_SCALE: f64 = 0.8;

/// Share of the watermark image's own size used when no size is requested.
const VIDEO_DEFAULT_WATERMARK_SCALE: f64 = 0.4;

pub struct TextOverlay<'a> {
    pub text: &'a str,
    pub font_file: &'a Path,
    pub font_size_pt: i32,
    pub color: Rgba<u8>,
    pub anchor: Corner,
    pub h_padding: i32,
    pub v_padding: i32,
}

pub struct ImageOverlay<'a> {
    pub image: &'a Path,
    pub image_size: (u32, u32),
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub anchor: Corner,
    pub h_padding: i32,
    pub v_padding: i32,
}

/// Position expressions evaluated by the engine, which knows the text box size.
pub fn text_position_expressions(anchor: Corner, h_padding: i32, v_padding: i32) -> (String, String) {
    let v_padding = (v_padding as f64 * VIDEO_TEXT_VERTICAL_SCALE) as i32;

    let left = h_padding.to_string();
    let right = format!("(w-text_w)-{}", h_padding);
    let top = v_padding.to_string();
    let bottom = format!("(h-text_h)-{}", v_padding);

    match anchor {
        Corner::BottomLeft => (left, bottom),
        Corner::BottomRight => (right, bottom),
        Corner::TopLeft => (left, top),
        Corner::TopRight => (right, top),
    }
}

pub fn drawtext_filter(overlay: &TextOverlay<'_>) -> String {
    let (x, y) = text_position_expressions(overlay.anchor, overlay.h_padding, overlay.v_padding);
    let font_size = (overlay.font_size_pt as f64 * VIDEO_FONT_SCALE) as i32;

    FilterBuilder::new("drawtext")
        .literal("fontfile", &overlay.font_file.to_string_lossy())
        .literal("text", overlay.text)
        .raw("expansion", "none")
        .raw("fontsize", font_size.max(1))
        .raw("fontcolor", to_engine_color(&overlay.color))
        .raw("box", 1)
        .raw("boxcolor", "black@0")
        .raw("boxborderw", 5)
        .raw("x", x)
        .raw("y", y)
        .build()
}

/// Burn text into a video; the audio stream is copied untouched.
pub fn text_watermark_command(
    engine: &Engine,
    source: &Path,
    destination: &Path,
    overlay: &TextOverlay<'_>,
) -> EngineCommand {
    engine
        .transcode()
        .arg("-i")
        .arg(source)
        .arg("-vf")
        .arg(drawtext_filter(overlay))
        .args(["-c:a", "copy"])
        .arg(destination)
}

/// Size the watermark image is scaled to on video.
pub fn video_overlay_size(
    image_size: (u32, u32),
    width: Option<u32>,
    height: Option<u32>,
) -> (u32, u32) {
    let (wm_w, wm_h) = image_size;
    match (width, height) {
        (Some(w), Some(h)) => (w, h),
        (None, Some(h)) => (((wm_w as u64 * h as u64) / wm_h.max(1) as u64) as u32, h),
        (Some(w), None) => (w, ((wm_h as u64 * w as u64) / wm_w.max(1) as u64) as u32),
        (None, None) => (
            (wm_w as f64 * VIDEO_DEFAULT_WATERMARK_SCALE) as u32,
            (wm_h as f64 * VIDEO_DEFAULT_WATERMARK_SCALE) as u32,
        ),
    }
}

pub fn overlay_filter(overlay: &ImageOverlay<'_>, video_size: (u32, u32)) -> String {
    let (w, h) = video_overlay_size(overlay.image_size, overlay.width, overlay.height);
    let origin = placement::compute(
        video_size.0,
        video_size.1,
        w,
        h,
        overlay.anchor,
        overlay.h_padding,
        overlay.v_padding,
    );
    format!(
        "[1:v]scale={}:{}[wm];[0:v][wm]overlay={}:{}",
        w.max(1),
        h.max(1),
        origin.x,
        origin.y
    )
}

/// Composite a watermark image onto a video of the given pixel size.
pub fn image_watermark_command(
    engine: &Engine,
    source: &Path,
    destination: &Path,
    overlay: &ImageOverlay<'_>,
    video_size: (u32, u32),
) -> EngineCommand {
    engine
        .transcode()
        .arg("-i")
        .arg(source)
        .arg("-i")
        .arg(overlay.image)
        .arg("-filter_complex")
        .arg(overlay_filter(overlay, video_size))
        .args(["-c:a", "copy"])
        .arg(destination)
}
