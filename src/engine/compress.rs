use super::{Engine, EngineCommand};
use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_IMAGE_QUALITY: i32 = 75;
const DEFAULT_VIDEO_QUALITY: i32 = 80;

const VIDEO_BITRATE: &str = "500k";
const VIDEO_FRAME_RATE: &str = "24";
const AUDIO_BITRATE: &str = "128k";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PhotoFormat {
    Png,
    Jpeg,
    Webp,
}

impl PhotoFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            PhotoFormat::Png => "png",
            PhotoFormat::Jpeg => "jpeg",
            PhotoFormat::Webp => "webp",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum VideoFormat {
    Mp4,
    Avi,
    Mov,
    Flv,
    Wmv,
    Mpeg,
    Mpg,
}

impl VideoFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            VideoFormat::Mp4 => "mp4",
            VideoFormat::Avi => "avi",
            VideoFormat::Mov => "mov",
            VideoFormat::Flv => "flv",
            VideoFormat::Wmv => "wmv",
            VideoFormat::Mpeg => "mpeg",
            VideoFormat::Mpg => "mpg",
        }
    }
}

/// Reference point a fixed-size crop is taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CropAnchor {
    #[default]
    Center,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sizing {
    #[default]
    Original,
    /// Uniform scale, in percent of the source size.
    Scale { percent: u32 },
    /// Exact output size; aspect ratio is not preserved.
    Exact { width: u32, height: u32 },
    Crop {
        width: u32,
        height: u32,
        anchor: CropAnchor,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompressSpec {
    pub quality: i32,
    pub photo_format: Option<PhotoFormat>,
    pub video_format: Option<VideoFormat>,
    pub sizing: Sizing,
}

impl Default for CompressSpec {
    fn default() -> Self {
        Self {
            quality: DEFAULT_IMAGE_QUALITY,
            photo_format: None,
            video_format: None,
            sizing: Sizing::Original,
        }
    }
}

/// Map a quality percentage to the image `-q:v` scale (1 best, 32 worst).
pub fn image_quality(percent: i32) -> u32 {
    let percent = if (0..=100).contains(&percent) {
        percent
    } else {
        DEFAULT_IMAGE_QUALITY
    };
    (32.0 - percent as f64 / 100.0 * 31.0).round_ties_even() as u32
}

/// Map a quality percentage to a video CRF (18 best, 49 worst).
pub fn video_crf(percent: i32) -> u32 {
    let percent = if (0..=100).contains(&percent) {
        percent
    } else {
        DEFAULT_VIDEO_QUALITY
    };
    (18.0 + (100 - percent) as f64 / 100.0 * 31.0).round_ties_even() as u32
}

pub fn sizing_filter(sizing: &Sizing) -> Option<String> {
    match *sizing {
        Sizing::Original => None,
        Sizing::Scale { percent } => {
            let factor = percent as f64 / 100.0;
            Some(format!("scale=iw*{}:ih*{}", factor, factor))
        }
        Sizing::Exact { width, height } => Some(format!("scale={}:{}", width, height)),
        Sizing::Crop {
            width,
            height,
            anchor,
        } => {
            // Never ask for more than the source has.
            let w = format!("min(in_w\\,{})", width);
            let h = format!("min(in_h\\,{})", height);
            let (x, y) = match anchor {
                CropAnchor::Center => (format!("(in_w-{})/2", w), format!("(in_h-{})/2", h)),
                CropAnchor::TopLeft => ("0".to_string(), "0".to_string()),
                CropAnchor::TopRight => (format!("(in_w-{})", w), "0".to_string()),
                CropAnchor::BottomLeft => ("0".to_string(), format!("(in_h-{})", h)),
                CropAnchor::BottomRight => (format!("(in_w-{})", w), format!("(in_h-{})", h)),
            };
            Some(format!("crop={}:{}:{}:{}", w, h, x, y))
        }
    }
}

pub fn image_command(
    engine: &Engine,
    source: &Path,
    destination: &Path,
    spec: &CompressSpec,
) -> EngineCommand {
    let mut command = engine.transcode().arg("-i").arg(source);
    if let Some(filter) = sizing_filter(&spec.sizing) {
        command = command.arg("-vf").arg(filter);
    }
    command
        .arg("-q:v")
        .arg(image_quality(spec.quality).to_string())
        .args(["-update", "1"])
        .arg(destination)
}

pub fn video_command(
    engine: &Engine,
    source: &Path,
    destination: &Path,
    spec: &CompressSpec,
) -> EngineCommand {
    engine
        .transcode()
        .arg("-i")
        .arg(source)
        .arg("-crf")
        .arg(video_crf(spec.quality).to_string())
        .args(["-b:v", VIDEO_BITRATE, "-r", VIDEO_FRAME_RATE, "-b:a", AUDIO_BITRATE])
        .arg(destination)
}
