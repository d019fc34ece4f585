use ab_glyph::PxScale;
use batchmark::{
    Config,
    batch::{self, JobState},
    fonts,
    job::{BatchJob, JobMode, WatermarkSpec},
    log_sink::{MemorySink, Severity},
    placement::{self, Corner},
    render::{TextStyle, font_pixel_size, measure_text, render_text},
    timestamp::DateFormat,
};
use image::{DynamicImage, Rgb, RgbImage, Rgba};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:/Windows/Fonts/arial.ttf",
];

/// First font found on this machine; tests that draw text skip without one.
fn system_font() -> Option<PathBuf> {
    FONT_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.is_file())
}

fn solid(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
}

fn style(font: &ab_glyph::FontVec, anchor: Corner, background_alpha: u8) -> TextStyle<'_> {
    TextStyle {
        font,
        font_size_pt: 40,
        color: Rgba([255, 255, 255, 255]),
        background_alpha,
        anchor,
        h_padding: 20,
        v_padding: 40,
    }
}

fn bright_pixels(image: &RgbImage, x0: u32, y0: u32, x1: u32, y1: u32) -> usize {
    let mut count = 0;
    for y in y0..y1.min(image.height()) {
        for x in x0..x1.min(image.width()) {
            if image.get_pixel(x, y).0.iter().all(|&c| c > 128) {
                count += 1;
            }
        }
    }
    count
}

#[test]
fn test_text_lands_in_chosen_corner() {
    let Some(font_path) = system_font() else {
        eprintln!("Skipping: no system font found");
        return;
    };
    let font = fonts::load(&font_path).unwrap();
    let base = solid(480, 360, [0, 0, 0]);

    let out = render_text(&base, "Watermark", &style(&font, Corner::BottomLeft, 0)).to_rgb8();
    assert_eq!(out.dimensions(), (480, 360));
    assert!(bright_pixels(&out, 0, 180, 240, 360) > 0);
    assert_eq!(bright_pixels(&out, 0, 0, 480, 180), 0);
    assert_eq!(bright_pixels(&out, 240, 0, 480, 360), 0);

    let out = render_text(&base, "Watermark", &style(&font, Corner::TopRight, 0)).to_rgb8();
    assert!(bright_pixels(&out, 240, 0, 480, 180) > 0);
    assert_eq!(bright_pixels(&out, 0, 180, 480, 360), 0);
}

#[test]
fn test_background_box_surrounds_text() {
    let Some(font_path) = system_font() else {
        eprintln!("Skipping: no system font found");
        return;
    };
    let font = fonts::load(&font_path).unwrap();
    let base = solid(480, 360, [255, 255, 255]);
    let text = "Box";

    let scale = PxScale::from(font_pixel_size(480, 360, 40));
    let (tw, th) = measure_text(&font, scale, text);
    let (h_pad, v_pad) = placement::scaled_text_padding(th, 200, 200, false);
    let origin = placement::compute(480, 360, tw, th, Corner::TopLeft, h_pad, v_pad);
    assert!(origin.x > 12 && origin.y > 12);

    let padded = |background_alpha| TextStyle {
        h_padding: 200,
        v_padding: 200,
        ..style(&font, Corner::TopLeft, background_alpha)
    };

    let out = render_text(&base, text, &padded(255)).to_rgb8();
    // inside the 12px margin, left of and above the glyphs
    let probe = out.get_pixel((origin.x - 6) as u32, (origin.y - 6) as u32);
    assert_eq!(probe.0, [0, 0, 0]);

    // invisible box leaves the margin untouched
    let out = render_text(&base, text, &padded(0)).to_rgb8();
    let probe = out.get_pixel((origin.x - 6) as u32, (origin.y - 6) as u32);
    assert_eq!(probe.0, [255, 255, 255]);
}

#[test]
fn test_two_lines_measure_taller() {
    let Some(font_path) = system_font() else {
        eprintln!("Skipping: no system font found");
        return;
    };
    let font = fonts::load(&font_path).unwrap();
    let scale = PxScale::from(32.0);

    let (w1, h1) = measure_text(&font, scale, "2024-05-01");
    let (w2, h2) = measure_text(&font, scale, "2024-05-01\nA");
    assert_eq!(w1, w2);
    assert!(h2 > h1 + 20);
}

#[test]
fn test_text_watermark_batch() {
    let Some(font_path) = system_font() else {
        eprintln!("Skipping: no system font found");
        return;
    };
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("北京");
    std::fs::create_dir_all(&input).unwrap();
    solid(320, 240, [20, 20, 20])
        .save(input.join("street.png"))
        .unwrap();

    let mut config = Config::default();
    config.fonts.directory = font_path.parent().unwrap_or(Path::new("/")).to_path_buf();
    let font_name = font_path.file_name().unwrap().to_string_lossy().into_owned();

    let output = temp.path().join("out");
    let job = BatchJob {
        input_root: input.clone(),
        output_root: output.clone(),
        rename_template: Some("bj".to_string()),
        process_video: false,
        date_format: DateFormat::YmdCn,
        mode: JobMode::Watermark(WatermarkSpec {
            text_template: Some("Beijing".to_string()),
            font_reference: font_name,
            font_size_pt: 100,
            ..Default::default()
        }),
    };

    let sink = MemorySink::new();
    let report = batch::run_job(&job, &config, &sink);
    assert_eq!(report.state, JobState::Completed);
    assert_eq!((report.processed, report.failed), (1, 0));

    let stamped = image::open(output.join("bj_1.png")).unwrap().to_rgb8();
    assert_eq!(stamped.dimensions(), (320, 240));
    assert!(bright_pixels(&stamped, 0, 120, 160, 240) > 0);
}

#[test]
fn test_text_mark_on_video_without_engine() {
    let Some(font_path) = system_font() else {
        eprintln!("Skipping: no system font found");
        return;
    };
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("北京");
    std::fs::create_dir_all(&input).unwrap();
    std::fs::write(input.join("a.mp4"), b"fake video bytes").unwrap();
    solid(320, 240, [20, 20, 20])
        .save(input.join("b.png"))
        .unwrap();

    let mut config = Config::default();
    config.fonts.directory = font_path.parent().unwrap_or(Path::new("/")).to_path_buf();
    config.engine.ffmpeg = temp.path().join("no-such-ffmpeg");
    config.engine.ffprobe = temp.path().join("no-such-ffprobe");
    let font_name = font_path.file_name().unwrap().to_string_lossy().into_owned();

    let output = temp.path().join("out");
    let job = BatchJob {
        input_root: input.clone(),
        output_root: output.clone(),
        rename_template: Some("v".to_string()),
        process_video: true,
        date_format: DateFormat::YmdCn,
        mode: JobMode::Watermark(WatermarkSpec {
            font_reference: font_name,
            font_size_pt: 100,
            ..Default::default()
        }),
    };

    let sink = MemorySink::new();
    let report = batch::run_job(&job, &config, &sink);
    assert_eq!(report.state, JobState::Completed);
    assert_eq!((report.processed, report.failed), (1, 1));

    let mut outputs: Vec<_> = std::fs::read_dir(&output)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    outputs.sort();
    assert_eq!(outputs, vec!["v_1.png"]);

    let errors = sink.with_severity(Severity::Error);
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].message,
        format!("处理失败: {}", input.join("a.mp4").display())
    );
}

#[test]
fn test_background_box_edges() {
    let Some(font_path) = system_font() else {
        eprintln!("Skipping: no system font found");
        return;
    };
    let font = fonts::load(&font_path).unwrap();
    let base = solid(1200, 900, [255, 255, 255]);
    let text = "Box";

    let scale = PxScale::from(font_pixel_size(1200, 900, 40));
    let (tw, th) = measure_text(&font, scale, text);
    let (h_pad, v_pad) = placement::scaled_text_padding(th, 40, 40, false);
    let origin = placement::compute(1200, 900, tw, th, Corner::TopLeft, h_pad, v_pad);
    assert!(origin.x > 13 && origin.y > 13);

    let out = render_text(
        &base,
        text,
        &TextStyle {
            h_padding: 40,
            v_padding: 40,
            ..style(&font, Corner::TopLeft, 255)
        },
    )
    .to_rgb8();

    let left = origin.x - 12;
    let top = origin.y - 12;
    let right = origin.x + tw as i32 + 12;
    let bottom = origin.y + th as i32 + 20;
    let at = |x: i32, y: i32| out.get_pixel(x as u32, y as u32).0;

    assert_eq!(at(left, top), [0, 0, 0]);
    assert_eq!(at(right, bottom), [0, 0, 0]);
    assert_eq!(at(left - 1, top), [255, 255, 255]);
    assert_eq!(at(left, top - 1), [255, 255, 255]);
    assert_eq!(at(right + 1, bottom), [255, 255, 255]);
    assert_eq!(at(right, bottom + 1), [255, 255, 255]);
}
