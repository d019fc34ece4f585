use crate::engine::{Engine, EngineError};
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, error, trace};

/// EXIF datetime format: "2005:07:30 07:22:46"
const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Offset video creation times are shown in (Asia/Shanghai, no DST).
const TARGET_UTC_OFFSET_SECS: i32 = 8 * 3600;

/// How a resolved capture date is rendered into the watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DateFormat {
    /// 2024年05月01日
    #[default]
    YmdCn,
    /// 2024-05-01
    IsoDash,
    /// 2024/05/01
    IsoSlash,
}

impl DateFormat {
    pub fn pattern(&self) -> &'static str {
        match self {
            DateFormat::YmdCn => "%Y年%m月%d日",
            DateFormat::IsoDash => "%Y-%m-%d",
            DateFormat::IsoSlash => "%Y/%m/%d",
        }
    }
}

#[derive(Debug, Error)]
pub enum TimestampError {
    #[error("no EXIF data: {0}")]
    NoExif(String),

    #[error("EXIF DateTime field missing")]
    MissingDateTime,

    #[error("unparseable timestamp '{0}'")]
    Unparseable(String),

    #[error("probe failed: {0}")]
    Probe(#[from] EngineError),
}

/// Read the EXIF `DateTime` field of an image and format it.
pub fn read_image_date(path: &Path, format: DateFormat) -> Result<String, TimestampError> {
    let exif = rexif::parse_file(path).map_err(|e| TimestampError::NoExif(e.to_string()))?;

    let entry = exif
        .entries
        .iter()
        .find(|e| e.tag == rexif::ExifTag::DateTime)
        .ok_or(TimestampError::MissingDateTime)?;

    format_exif_datetime(&entry.value_more_readable, format)
}

pub fn format_exif_datetime(value: &str, format: DateFormat) -> Result<String, TimestampError> {
    let value = value.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    let parsed = NaiveDateTime::parse_from_str(value, EXIF_DATETIME_FORMAT)
        .map_err(|_| TimestampError::Unparseable(value.to_string()))?;
    Ok(parsed.format(format.pattern()).to_string())
}

/// Capture date of an image, or `None` when it has no usable EXIF date.
pub fn resolve_image(path: &Path, format: DateFormat) -> Option<String> {
    match read_image_date(path, format) {
        Ok(date) => {
            debug!(path = %path.display(), date = %date, "Resolved image capture date");
            Some(date)
        }
        Err(e) => {
            trace!(path = %path.display(), error = %e, "No capture date for image");
            None
        }
    }
}

/// Read the first video stream's creation time and format it in UTC+8.
pub fn read_video_date(
    engine: &Engine,
    path: &Path,
    format: DateFormat,
) -> Result<String, TimestampError> {
    let raw = engine.probe_creation_time(path)?;
    format_creation_time(&raw, format)
}

/// Convert an ISO-8601 UTC creation tag to the target offset and format it.
pub fn format_creation_time(value: &str, format: DateFormat) -> Result<String, TimestampError> {
    let value = value.trim();
    let utc = DateTime::parse_from_rfc3339(value)
        .map_err(|_| TimestampError::Unparseable(value.to_string()))?;

    let offset = FixedOffset::east_opt(TARGET_UTC_OFFSET_SECS)
        .ok_or_else(|| TimestampError::Unparseable(value.to_string()))?;

    Ok(utc.with_timezone(&offset).format(format.pattern()).to_string())
}

/// Creation date of a video, or `None` (logged) when probing fails.
pub fn resolve_video(engine: &Engine, path: &Path, format: DateFormat) -> Option<String> {
    match read_video_date(engine, path, format) {
        Ok(date) => {
            debug!(path = %path.display(), date = %date, "Resolved video creation date");
            Some(date)
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "Failed to read video creation date");
            None
        }
    }
}
