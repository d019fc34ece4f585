use crate::engine::compress::CompressSpec;
use crate::placement::Corner;
use crate::timestamp::DateFormat;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WatermarkKind {
    #[default]
    Text,
    Image,
}

/// Watermark settings for one run. Built once, never mutated while running.
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkSpec {
    pub kind: WatermarkKind,
    /// Literal text; `None` derives the text from folder names and dates.
    pub text_template: Option<String>,
    pub font_reference: String,
    pub font_size_pt: i32,
    pub anchor: Corner,
    pub horizontal_padding: i32,
    pub vertical_padding: i32,
    /// Hex color as entered (`#RRGGBB`, `AARRGGBB`, ...).
    pub text_color: String,
    pub background_alpha: u8,
    pub image_path: Option<PathBuf>,
    pub image_width: Option<u32>,
    pub image_height: Option<u32>,
}

impl Default for WatermarkSpec {
    fn default() -> Self {
        Self {
            kind: WatermarkKind::Text,
            text_template: None,
            font_reference: crate::fonts::DEFAULT_FONT.to_string(),
            font_size_pt: 40,
            anchor: Corner::BottomLeft,
            horizontal_padding: 20,
            vertical_padding: 40,
            text_color: "#FFFFFFFF".to_string(),
            background_alpha: 0,
            image_path: None,
            image_width: None,
            image_height: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobMode {
    Watermark(WatermarkSpec),
    Compress(CompressSpec),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchJob {
    pub input_root: PathBuf,
    pub output_root: PathBuf,
    /// Outputs become `{template}_{n}{ext}` when set.
    pub rename_template: Option<String>,
    /// Transcode videos; otherwise they are copied byte for byte.
    pub process_video: bool,
    pub date_format: DateFormat,
    pub mode: JobMode,
}

impl BatchJob {
    pub fn watermark_spec(&self) -> Option<&WatermarkSpec> {
        match &self.mode {
            JobMode::Watermark(spec) => Some(spec),
            JobMode::Compress(_) => None,
        }
    }

    pub fn is_compress(&self) -> bool {
        matches!(self.mode, JobMode::Compress(_))
    }
}

/// Output root used when none is given: a sibling named `{input}_out`.
pub fn default_output_root(input_root: &std::path::Path) -> PathBuf {
    let normalized: PathBuf = input_root.components().collect();
    let mut name = normalized.into_os_string();
    name.push("_out");
    PathBuf::from(name)
}
