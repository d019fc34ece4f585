use super::{FileTask, MediaClass, ProcessError};
use crate::color;
use crate::engine::compress::{self, CompressSpec};
use crate::engine::video::{self, ImageOverlay, TextOverlay};
use crate::engine::{Engine, EngineCommand};
use crate::fonts::{self, FontError};
use crate::job::WatermarkSpec;
use crate::render::{self, OverlayStyle, TextStyle};
use crate::validation::{ValidatedJob, ValidationError};
use ab_glyph::FontVec;
use image::{DynamicImage, GenericImageView, Rgba};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Turns one classified input file into its output file.
///
/// Videos that are only copied never reach a processor.
pub trait FileProcessor: Send + Sync {
    /// Target extension appended to the output file name.
    fn output_extension(&self, _task: &FileTask) -> Option<&'static str> {
        None
    }

    fn process(&self, task: &FileTask, destination: &Path) -> Result<(), ProcessError>;
}

enum Mark {
    Text {
        font: FontVec,
        font_file: PathBuf,
        color: Rgba<u8>,
    },
    Image {
        image: DynamicImage,
        path: PathBuf,
    },
}

pub struct WatermarkProcessor {
    spec: WatermarkSpec,
    mark: Mark,
    engine: Engine,
    video_fallback: (u32, u32),
}

impl WatermarkProcessor {
    /// Build from a validated job, loading the font once for the whole run.
    pub fn new(
        validated: ValidatedJob<'_>,
        engine: Engine,
        video_fallback: (u32, u32),
    ) -> Result<Self, ValidationError> {
        let spec = validated
            .job
            .watermark_spec()
            .cloned()
            .unwrap_or_default();

        let mark = match (validated.font_file, validated.watermark_image) {
            (_, Some(image)) => Mark::Image {
                image,
                path: spec.image_path.clone().unwrap_or_default(),
            },
            (Some(font_file), None) => {
                let font = fonts::load(&font_file).map_err(ValidationError::FontUnavailable)?;
                let color = color::parse_rgba(&color::encode(&spec.text_color))
                    .unwrap_or(Rgba([255, 255, 255, 255]));
                Mark::Text {
                    font,
                    font_file,
                    color,
                }
            }
            (None, None) => {
                return Err(ValidationError::FontUnavailable(FontError::NotInstalled(
                    spec.font_reference.clone(),
                    PathBuf::new(),
                )));
            }
        };

        Ok(Self {
            spec,
            mark,
            engine,
            video_fallback,
        })
    }

    fn process_image(&self, task: &FileTask, destination: &Path) -> Result<(), ProcessError> {
        match &self.mark {
            Mark::Text { font, color, .. } => {
                let style = TextStyle {
                    font,
                    font_size_pt: self.spec.font_size_pt,
                    color: *color,
                    background_alpha: self.spec.background_alpha,
                    anchor: self.spec.anchor,
                    h_padding: self.spec.horizontal_padding,
                    v_padding: self.spec.vertical_padding,
                };
                render::watermark_text_file(&task.source_path, destination, &task.derived_text, &style)?;
            }
            Mark::Image { image, .. } => {
                let style = OverlayStyle {
                    width: self.spec.image_width,
                    height: self.spec.image_height,
                    anchor: self.spec.anchor,
                    h_padding: self.spec.horizontal_padding,
                    v_padding: self.spec.vertical_padding,
                };
                render::watermark_image_file(&task.source_path, destination, image, &style)?;
            }
        }
        Ok(())
    }

    /// Engine command that stamps this processor's mark onto a video.
    pub fn video_command(&self, task: &FileTask, destination: &Path) -> EngineCommand {
        match &self.mark {
            Mark::Text {
                font_file, color, ..
            } => {
                let overlay = TextOverlay {
                    text: &task.derived_text,
                    font_file,
                    font_size_pt: self.spec.font_size_pt,
                    color: *color,
                    anchor: self.spec.anchor,
                    h_padding: self.spec.horizontal_padding,
                    v_padding: self.spec.vertical_padding,
                };
                video::text_watermark_command(&self.engine, &task.source_path, destination, &overlay)
            }
            Mark::Image { image, path } => {
                let video_size = self
                    .engine
                    .video_dimensions(&task.source_path, self.video_fallback);
                debug!(
                    path = %task.source_path.display(),
                    width = video_size.0,
                    height = video_size.1,
                    "Overlaying watermark image on video"
                );
                let overlay = ImageOverlay {
                    image: path,
                    image_size: image.dimensions(),
                    width: self.spec.image_width,
                    height: self.spec.image_height,
                    anchor: self.spec.anchor,
                    h_padding: self.spec.horizontal_padding,
                    v_padding: self.spec.vertical_padding,
                };
                video::image_watermark_command(
                    &self.engine,
                    &task.source_path,
                    destination,
                    &overlay,
                    video_size,
                )
            }
        }
    }
}

impl FileProcessor for WatermarkProcessor {
    fn process(&self, task: &FileTask, destination: &Path) -> Result<(), ProcessError> {
        match task.media_class {
            MediaClass::Image => self.process_image(task, destination),
            MediaClass::Video => {
                self.engine.run(&self.video_command(task, destination))?;
                Ok(())
            }
            MediaClass::Unsupported => Err(ProcessError::Unsupported(task.source_path.clone())),
        }
    }
}

pub struct CompressProcessor {
    spec: CompressSpec,
    engine: Engine,
}

impl CompressProcessor {
    pub fn new(spec: CompressSpec, engine: Engine) -> Self {
        Self { spec, engine }
    }
}

impl FileProcessor for CompressProcessor {
    fn output_extension(&self, task: &FileTask) -> Option<&'static str> {
        match task.media_class {
            MediaClass::Image => self.spec.photo_format.map(|f| f.extension()),
            MediaClass::Video => self.spec.video_format.map(|f| f.extension()),
            MediaClass::Unsupported => None,
        }
    }

    fn process(&self, task: &FileTask, destination: &Path) -> Result<(), ProcessError> {
        let command = match task.media_class {
            MediaClass::Image => {
                compress::image_command(&self.engine, &task.source_path, destination, &self.spec)
            }
            MediaClass::Video => {
                compress::video_command(&self.engine, &task.source_path, destination, &self.spec)
            }
            MediaClass::Unsupported => {
                return Err(ProcessError::Unsupported(task.source_path.clone()));
            }
        };
        self.engine.run(&command)?;
        Ok(())
    }
}
