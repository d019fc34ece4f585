//! Raw parameter bundles as collected by a front end, and their
//! normalization into an immutable [`BatchJob`].

use crate::engine::compress::{CompressSpec, CropAnchor, PhotoFormat, Sizing, VideoFormat};
use crate::job::{BatchJob, JobMode, WatermarkKind, WatermarkSpec, default_output_root};
use crate::placement::Corner;
use crate::timestamp::DateFormat;
use std::path::PathBuf;

/// Placeholder shown in an empty rename field.
pub const RENAME_PLACEHOLDER: &str = "默认使用原文件名";
/// Placeholder shown in an empty watermark text field.
pub const WATERMARK_PLACEHOLDER: &str = "默认使用文件夹名称";

const DEFAULT_FONT_SIZE: i32 = 40;
const DEFAULT_H_PADDING: i32 = 20;
const DEFAULT_V_PADDING: i32 = 40;
const MAX_PADDING: i32 = 200;

#[derive(Debug, Clone, Default)]
pub struct CommonParams {
    pub input_root: String,
    pub output_root: String,
    pub rename_template: String,
    pub process_video: bool,
}

#[derive(Debug, Clone)]
pub struct WatermarkParams {
    pub common: CommonParams,
    pub kind: WatermarkKind,
    pub text: String,
    pub font: String,
    pub font_size: i32,
    pub anchor: Corner,
    pub h_padding: i32,
    pub v_padding: i32,
    pub text_color: String,
    pub background_alpha: u8,
    pub date_format: DateFormat,
    pub image_path: String,
    pub image_width: u32,
    pub image_height: u32,
}

impl Default for WatermarkParams {
    fn default() -> Self {
        let spec = WatermarkSpec::default();
        Self {
            common: CommonParams::default(),
            kind: spec.kind,
            text: String::new(),
            font: spec.font_reference,
            font_size: spec.font_size_pt,
            anchor: spec.anchor,
            h_padding: spec.horizontal_padding,
            v_padding: spec.vertical_padding,
            text_color: spec.text_color,
            background_alpha: spec.background_alpha,
            date_format: DateFormat::default(),
            image_path: String::new(),
            image_width: 0,
            image_height: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SizeMode {
    #[default]
    Original,
    Scale,
    Specify,
    Crop,
}

#[derive(Debug, Clone)]
pub struct CompressParams {
    pub common: CommonParams,
    pub quality: i32,
    pub photo_format: Option<PhotoFormat>,
    pub video_format: Option<VideoFormat>,
    pub size_mode: SizeMode,
    pub scale_percent: i32,
    pub width: u32,
    pub height: u32,
    pub crop_anchor: CropAnchor,
    pub crop_width: u32,
    pub crop_height: u32,
}

impl Default for CompressParams {
    fn default() -> Self {
        Self {
            common: CommonParams::default(),
            quality: 75,
            photo_format: None,
            video_format: None,
            size_mode: SizeMode::Original,
            scale_percent: 80,
            width: 1080,
            height: 1920,
            crop_anchor: CropAnchor::Center,
            crop_width: 720,
            crop_height: 720,
        }
    }
}

fn non_placeholder(value: &str, placeholder: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value == placeholder {
        None
    } else {
        Some(value.to_string())
    }
}

fn in_range_or(value: i32, min: i32, max: i32, default: i32) -> i32 {
    if (min..=max).contains(&value) {
        value
    } else {
        default
    }
}

fn non_zero(value: u32) -> Option<u32> {
    (value > 0).then_some(value)
}

impl CommonParams {
    fn roots(&self) -> (PathBuf, PathBuf) {
        let input = PathBuf::from(self.input_root.trim());
        let output = match self.output_root.trim() {
            "" if input.as_os_str().is_empty() => PathBuf::new(),
            "" => default_output_root(&input),
            other => PathBuf::from(other),
        };
        (input, output)
    }

    fn rename_template(&self) -> Option<String> {
        non_placeholder(&self.rename_template, RENAME_PLACEHOLDER)
    }
}

impl WatermarkParams {
    pub fn into_job(self) -> BatchJob {
        let (input_root, output_root) = self.common.roots();
        let rename_template = self.common.rename_template();

        // Range checks only apply to text; image paddings are raw pixels.
        let (font_size_pt, horizontal_padding, vertical_padding) = match self.kind {
            WatermarkKind::Text => (
                in_range_or(self.font_size, 1, 100, DEFAULT_FONT_SIZE),
                in_range_or(self.h_padding, 0, MAX_PADDING, DEFAULT_H_PADDING),
                in_range_or(self.v_padding, 0, MAX_PADDING, DEFAULT_V_PADDING),
            ),
            WatermarkKind::Image => (self.font_size, self.h_padding.max(0), self.v_padding.max(0)),
        };

        let image_path = match self.image_path.trim() {
            "" => None,
            path => Some(PathBuf::from(path)),
        };

        let spec = WatermarkSpec {
            kind: self.kind,
            text_template: non_placeholder(&self.text, WATERMARK_PLACEHOLDER),
            font_reference: self.font.trim().to_string(),
            font_size_pt,
            anchor: self.anchor,
            horizontal_padding,
            vertical_padding,
            text_color: self.text_color.trim().to_string(),
            background_alpha: self.background_alpha,
            image_path,
            image_width: non_zero(self.image_width),
            image_height: non_zero(self.image_height),
        };

        BatchJob {
            input_root,
            output_root,
            rename_template,
            process_video: self.common.process_video,
            date_format: self.date_format,
            mode: JobMode::Watermark(spec),
        }
    }
}

impl CompressParams {
    pub fn into_job(self) -> BatchJob {
        let (input_root, output_root) = self.common.roots();
        let rename_template = self.common.rename_template();

        let sizing = match self.size_mode {
            SizeMode::Original => Sizing::Original,
            SizeMode::Scale => Sizing::Scale {
                percent: in_range_or(self.scale_percent, 1, 100, 100) as u32,
            },
            SizeMode::Specify => Sizing::Exact {
                width: self.width.max(1),
                height: self.height.max(1),
            },
            SizeMode::Crop => Sizing::Crop {
                width: self.crop_width.max(1),
                height: self.crop_height.max(1),
                anchor: self.crop_anchor,
            },
        };

        BatchJob {
            input_root,
            output_root,
            rename_template,
            process_video: self.common.process_video,
            date_format: DateFormat::default(),
            mode: JobMode::Compress(CompressSpec {
                quality: self.quality,
                photo_format: self.photo_format,
                video_format: self.video_format,
                sizing,
            }),
        }
    }
}
