use crate::color;
use crate::fonts::{self, FontError};
use crate::job::{BatchJob, JobMode, WatermarkKind, WatermarkSpec};
use image::{ColorType, DynamicImage};
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

/// Largest accepted watermark image file.
pub const MAX_WATERMARK_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("错误: 请选择根目录和输出目录")]
    MissingDirectory,

    #[error("导出与导入目录不能一致")]
    SameDirectory,

    #[error("错误: 字体颜色不合法")]
    InvalidColor(#[source] color::ColorError),

    #[error("提示: 系统没有安装该字体")]
    FontUnavailable(#[source] FontError),

    #[error("水印图片路径为空或者图片有误。")]
    InvalidWatermarkImage(#[source] WatermarkImageError),
}

#[derive(Debug, Error)]
pub enum WatermarkImageError {
    #[error("no watermark image given")]
    Missing,

    #[error("file does not exist: {0:?}")]
    NotFound(std::path::PathBuf),

    #[error("file too large: {0:.2} MB")]
    TooLarge(f64),

    #[error("not a valid image file: {0}")]
    Unreadable(#[from] image::ImageError),

    #[error("invalid image size: {0}x{1}")]
    EmptyImage(u32, u32),

    #[error("unsupported image mode: {0:?}")]
    UnsupportedMode(ColorType),

    #[error("failed to read file metadata: {0}")]
    Io(#[from] std::io::Error),
}

/// Checks that pass before any file is touched.
pub struct ValidatedJob<'a> {
    pub job: &'a BatchJob,
    /// Resolved font file for text watermarks.
    pub font_file: Option<std::path::PathBuf>,
    /// Decoded watermark image for image watermarks.
    pub watermark_image: Option<DynamicImage>,
}

fn same_location(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Load and check a watermark image: present, at most 5 MB, decodable,
/// non-empty and RGB(A).
pub fn check_watermark_image(path: &Path) -> Result<DynamicImage, WatermarkImageError> {
    if !path.is_file() {
        return Err(WatermarkImageError::NotFound(path.to_path_buf()));
    }

    let size = std::fs::metadata(path)?.len();
    if size > MAX_WATERMARK_BYTES {
        return Err(WatermarkImageError::TooLarge(size as f64 / (1024.0 * 1024.0)));
    }

    let image = image::open(path)?;
    if image.width() == 0 || image.height() == 0 {
        return Err(WatermarkImageError::EmptyImage(image.width(), image.height()));
    }

    match image.color() {
        ColorType::Rgb8
        | ColorType::Rgba8
        | ColorType::Rgb16
        | ColorType::Rgba16
        | ColorType::Rgb32F
        | ColorType::Rgba32F => Ok(image),
        other => Err(WatermarkImageError::UnsupportedMode(other)),
    }
}

fn validate_watermark<'a>(
    job: &'a BatchJob,
    spec: &WatermarkSpec,
    font_dir: &Path,
) -> Result<ValidatedJob<'a>, ValidationError> {
    match spec.kind {
        WatermarkKind::Text => {
            color::parse_hex(&spec.text_color).map_err(ValidationError::InvalidColor)?;
            let font_file = fonts::resolve(&spec.font_reference, font_dir)
                .map_err(ValidationError::FontUnavailable)?;
            info!("Using font {:?}", font_file);
            Ok(ValidatedJob {
                job,
                font_file: Some(font_file),
                watermark_image: None,
            })
        }
        WatermarkKind::Image => {
            let path = spec
                .image_path
                .as_deref()
                .ok_or(ValidationError::InvalidWatermarkImage(
                    WatermarkImageError::Missing,
                ))?;
            let image =
                check_watermark_image(path).map_err(ValidationError::InvalidWatermarkImage)?;
            info!(
                "Watermark image {:?} is {}x{}",
                path,
                image.width(),
                image.height()
            );
            Ok(ValidatedJob {
                job,
                font_file: None,
                watermark_image: Some(image),
            })
        }
    }
}

/// Check a job before it runs. Nothing on disk is modified.
pub fn validate_job<'a>(
    job: &'a BatchJob,
    font_dir: &Path,
) -> Result<ValidatedJob<'a>, ValidationError> {
    info!("Validating batch job...");

    if job.input_root.as_os_str().is_empty() || job.output_root.as_os_str().is_empty() {
        return Err(ValidationError::MissingDirectory);
    }

    if same_location(&job.input_root, &job.output_root) {
        return Err(ValidationError::SameDirectory);
    }

    if !job.input_root.is_dir() {
        warn!("Input directory does not exist: {:?}", job.input_root);
    }

    match &job.mode {
        JobMode::Watermark(spec) => validate_watermark(job, spec, font_dir),
        JobMode::Compress(_) => Ok(ValidatedJob {
            job,
            font_file: None,
            watermark_image: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::compress::CompressSpec;
    use crate::job::WatermarkSpec;
    use crate::timestamp::DateFormat;
    use image::{GrayImage, Luma, Rgba, RgbaImage};
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn job(input: &Path, output: &Path, mode: JobMode) -> BatchJob {
        BatchJob {
            input_root: input.to_path_buf(),
            output_root: output.to_path_buf(),
            rename_template: None,
            process_video: false,
            date_format: DateFormat::default(),
            mode,
        }
    }

    #[test]
    fn test_rejects_empty_and_equal_roots() {
        let dir = TempDir::new().unwrap();
        let compress = JobMode::Compress(CompressSpec::default());

        let empty = job(Path::new(""), dir.path(), compress.clone());
        assert!(matches!(
            validate_job(&empty, dir.path()),
            Err(ValidationError::MissingDirectory)
        ));

        let same = job(dir.path(), dir.path(), compress.clone());
        assert!(matches!(
            validate_job(&same, dir.path()),
            Err(ValidationError::SameDirectory)
        ));

        let dotted = dir.path().join(".");
        let same = job(dir.path(), &dotted, compress);
        assert!(matches!(
            validate_job(&same, dir.path()),
            Err(ValidationError::SameDirectory)
        ));
    }

    #[test]
    fn test_text_mode_checks_color_then_font() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");

        let bad_color = job(
            dir.path(),
            &out,
            JobMode::Watermark(WatermarkSpec {
                text_color: "#12345".to_string(),
                ..Default::default()
            }),
        );
        let err = validate_job(&bad_color, dir.path()).err().unwrap();
        assert!(matches!(err, ValidationError::InvalidColor(_)));
        assert_eq!(err.to_string(), "错误: 字体颜色不合法");

        let no_font = job(dir.path(), &out, JobMode::Watermark(WatermarkSpec::default()));
        assert!(matches!(
            validate_job(&no_font, dir.path()),
            Err(ValidationError::FontUnavailable(_))
        ));

        std::fs::write(dir.path().join("simsun.ttc"), b"stub").unwrap();
        let validated = validate_job(&no_font, dir.path()).unwrap();
        assert_eq!(validated.font_file, Some(dir.path().join("simsun.ttc")));
    }

    #[test]
    fn test_watermark_image_checks() {
        let dir = TempDir::new().unwrap();

        assert!(matches!(
            check_watermark_image(&dir.path().join("missing.png")),
            Err(WatermarkImageError::NotFound(_))
        ));

        let garbage = dir.path().join("garbage.png");
        std::fs::write(&garbage, b"not an image").unwrap();
        assert!(matches!(
            check_watermark_image(&garbage),
            Err(WatermarkImageError::Unreadable(_))
        ));

        let gray = dir.path().join("gray.png");
        GrayImage::from_pixel(4, 4, Luma([128])).save(&gray).unwrap();
        assert!(matches!(
            check_watermark_image(&gray),
            Err(WatermarkImageError::UnsupportedMode(ColorType::L8))
        ));

        let big = dir.path().join("big.png");
        std::fs::write(&big, vec![0u8; MAX_WATERMARK_BYTES as usize + 1]).unwrap();
        assert!(matches!(
            check_watermark_image(&big),
            Err(WatermarkImageError::TooLarge(_))
        ));

        let logo = dir.path().join("logo.png");
        RgbaImage::from_pixel(8, 4, Rgba([255, 0, 0, 128]))
            .save(&logo)
            .unwrap();
        let image = check_watermark_image(&logo).unwrap();
        assert_eq!((image.width(), image.height()), (8, 4));
    }

    #[test]
    fn test_image_mode_requires_path() {
        let dir = TempDir::new().unwrap();
        let spec = WatermarkSpec {
            kind: WatermarkKind::Image,
            image_path: None,
            ..Default::default()
        };
        let job = job(dir.path(), &PathBuf::from("elsewhere"), JobMode::Watermark(spec));
        let err = validate_job(&job, dir.path()).err().unwrap();
        assert!(matches!(
            err,
            ValidationError::InvalidWatermarkImage(WatermarkImageError::Missing)
        ));
        assert_eq!(err.to_string(), "水印图片路径为空或者图片有误。");
    }
}
