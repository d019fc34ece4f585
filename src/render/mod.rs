// Render module - still-image watermark composition
mod overlay;
mod text;

pub use overlay::{OverlayStyle, fit_watermark, render_image, watermark_image_file};
pub use text::{TextStyle, font_pixel_size, measure_text, render_text, watermark_text_file};

use image::DynamicImage;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to decode {path:?}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to write {path:?}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

pub(crate) fn open_image(path: &Path) -> Result<DynamicImage, RenderError> {
    image::open(path).map_err(|source| RenderError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

/// Flatten to opaque RGB and write; the format follows the extension.
pub(crate) fn save_flattened(image: &DynamicImage, path: &Path) -> Result<(), RenderError> {
    let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
    rgb.save(path).map_err(|source| RenderError::Encode {
        path: path.to_path_buf(),
        source,
    })
}
