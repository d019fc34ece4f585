// Batch module - walks the input tree and dispatches files
mod error;
mod processor;

pub use error::ProcessError;
pub use processor::{CompressProcessor, FileProcessor, WatermarkProcessor};

use crate::Config;
use crate::engine::Engine;
use crate::job::{BatchJob, JobMode, WatermarkKind};
use crate::log_sink::{BANNER_END, BANNER_START, LogEvent, LogSink};
use crate::timestamp;
use crate::validation::{self, ValidatedJob, ValidationError};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];
const COMPRESS_IMAGE_EXTENSIONS: &[&str] = &["webp"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4"];
const COMPRESS_VIDEO_EXTENSIONS: &[&str] = &["avi", "mov", "flv", "wmv", "mpeg", "mpg"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaClass {
    Image,
    Video,
    Unsupported,
}

impl MediaClass {
    /// Classify by extension (case-insensitive). Compress mode accepts more formats.
    pub fn classify(path: &Path, compress: bool) -> Self {
        let Some(ext) = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
        else {
            return MediaClass::Unsupported;
        };
        let ext = ext.as_str();

        if IMAGE_EXTENSIONS.contains(&ext) || (compress && COMPRESS_IMAGE_EXTENSIONS.contains(&ext))
        {
            MediaClass::Image
        } else if VIDEO_EXTENSIONS.contains(&ext)
            || (compress && COMPRESS_VIDEO_EXTENSIONS.contains(&ext))
        {
            MediaClass::Video
        } else {
            MediaClass::Unsupported
        }
    }
}

/// One input file, resolved for processing.
#[derive(Debug, Clone, PartialEq)]
pub struct FileTask {
    pub source_path: PathBuf,
    /// Directory of the file relative to the input root.
    pub relative_dir: PathBuf,
    pub sequence_index: u32,
    /// Watermark text for this file; empty in compress mode.
    pub derived_text: String,
    pub media_class: MediaClass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Idle,
    Validating,
    Running,
    Completed,
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub state: JobState,
    pub processed: usize,
    pub failed: usize,
}

/// Keep only characters in the CJK Unified Ideographs block.
pub fn cjk_filter(name: &str) -> String {
    name.chars()
        .filter(|c| ('\u{4e00}'..='\u{9fff}').contains(c))
        .collect()
}

/// Watermark text: a literal, or folder label with an optional date stacked above it.
pub fn compose_mark_text(literal: Option<&str>, label: &str, date: Option<&str>) -> String {
    if let Some(text) = literal {
        return text.to_string();
    }
    match date {
        Some(date) if label.is_empty() => date.to_string(),
        Some(date) => format!("{}\n{}", date, label),
        None => label.to_string(),
    }
}

/// Output file name: `{template}_{n}.{ext}` when renaming, else the source name.
///
/// A target format is appended to that name rather than replacing its
/// extension, so `a.jpg` and `a.png` never meet at the same `a.webp`.
pub fn output_file_name(
    source: &Path,
    rename_template: Option<&str>,
    sequence_index: u32,
    target_extension: Option<&str>,
) -> PathBuf {
    let mut name = match rename_template {
        Some(template) => match source.extension() {
            Some(ext) => format!("{}_{}.{}", template, sequence_index, ext.to_string_lossy()),
            None => format!("{}_{}", template, sequence_index),
        },
        None => source
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };
    if let Some(ext) = target_extension {
        name.push('.');
        name.push_str(ext);
    }
    PathBuf::from(name)
}

pub struct Orchestrator<'a> {
    job: &'a BatchJob,
    engine: Engine,
    sink: &'a dyn LogSink,
    state: JobState,
    /// Next sequence number per relative output directory.
    counters: HashMap<PathBuf, u32>,
    labels: HashMap<PathBuf, String>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(job: &'a BatchJob, engine: Engine, sink: &'a dyn LogSink) -> Self {
        Self {
            job,
            engine,
            sink,
            state: JobState::Idle,
            counters: HashMap::new(),
            labels: HashMap::new(),
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Run the pre-flight checks. A failure aborts the job with one error event.
    pub fn validate(&mut self, font_dir: &Path) -> Result<ValidatedJob<'a>, ValidationError> {
        self.state = JobState::Validating;
        validation::validate_job(self.job, font_dir).inspect_err(|e| self.abort(e))
    }

    /// Move to `Aborted`, reporting `error` to the sink.
    pub fn abort(&mut self, error: &ValidationError) {
        warn!("Batch aborted: {:?}", error);
        self.state = JobState::Aborted;
        self.sink.emit(LogEvent::error(error.to_string()));
    }

    fn report(&self, processed: usize, failed: usize) -> BatchReport {
        BatchReport {
            state: self.state,
            processed,
            failed,
        }
    }

    /// Folder label for a relative directory: its own CJK characters, or the
    /// nearest ancestor's up to and including the input root.
    fn folder_label(&mut self, relative_dir: &Path) -> String {
        if let Some(label) = self.labels.get(relative_dir) {
            return label.clone();
        }

        let mut label = String::new();
        let mut current = Some(self.job.input_root.join(relative_dir));
        while let Some(dir) = current {
            let name = dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            label = cjk_filter(&name);
            if !label.is_empty() || dir == self.job.input_root {
                break;
            }
            current = dir.parent().map(Path::to_path_buf);
        }

        self.labels.insert(relative_dir.to_path_buf(), label.clone());
        label
    }

    fn derive_text(&mut self, source: &Path, relative_dir: &Path, media_class: MediaClass) -> String {
        let job = self.job;
        let JobMode::Watermark(spec) = &job.mode else {
            return String::new();
        };
        if let Some(literal) = spec.text_template.as_deref() {
            return compose_mark_text(Some(literal), "", None);
        }

        let wants_date = spec.kind == WatermarkKind::Text;
        let label = self.folder_label(relative_dir);
        let date = match media_class {
            MediaClass::Image if wants_date => timestamp::resolve_image(source, job.date_format),
            MediaClass::Video if wants_date && job.process_video => {
                timestamp::resolve_video(&self.engine, source, job.date_format)
            }
            _ => None,
        };
        compose_mark_text(None, &label, date.as_deref())
    }

    /// Output directory to leave out of the walk when it sits inside the input.
    fn nested_output_root(&self) -> Option<PathBuf> {
        let input = self.job.input_root.canonicalize().ok()?;
        let output = self.job.output_root.canonicalize().ok()?;
        output.starts_with(&input).then_some(output)
    }

    fn process_file(
        &mut self,
        source: &Path,
        processor: &dyn FileProcessor,
    ) -> Option<Result<PathBuf, ProcessError>> {
        let media_class = MediaClass::classify(source, self.job.is_compress());
        if media_class == MediaClass::Unsupported {
            debug!("Skipping unsupported file {:?}", source);
            return None;
        }

        let relative_dir = source
            .parent()
            .and_then(|p| p.strip_prefix(&self.job.input_root).ok())
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let sequence_index = *self.counters.entry(relative_dir.clone()).or_insert(1);
        let derived_text = self.derive_text(source, &relative_dir, media_class);

        let task = FileTask {
            source_path: source.to_path_buf(),
            relative_dir,
            sequence_index,
            derived_text,
            media_class,
        };

        let copy_only = media_class == MediaClass::Video && !self.job.process_video;
        let extension = if copy_only {
            None
        } else {
            processor.output_extension(&task)
        };
        let output_dir = self.job.output_root.join(&task.relative_dir);
        let destination = output_dir.join(output_file_name(
            source,
            self.job.rename_template.as_deref(),
            task.sequence_index,
            extension,
        ));

        let result = std::fs::create_dir_all(&output_dir)
            .map_err(|e| ProcessError::io(&output_dir, e))
            .and_then(|_| {
                if copy_only {
                    std::fs::copy(source, &destination)
                        .map(|_| ())
                        .map_err(|e| ProcessError::io(source, e))
                } else {
                    processor.process(&task, &destination)
                }
            });

        if result.is_ok()
            && let Some(counter) = self.counters.get_mut(&task.relative_dir)
        {
            *counter += 1;
        }
        Some(result.map(|_| destination))
    }

    /// Walk the input tree and process every supported file in name order.
    ///
    /// A failing file is logged and skipped; only validation can stop a job.
    pub fn execute(&mut self, processor: &dyn FileProcessor) -> BatchReport {
        self.state = JobState::Running;
        self.sink.banner(BANNER_START);
        info!(
            "Processing {:?} into {:?}",
            self.job.input_root, self.job.output_root
        );

        let start_time = std::time::Instant::now();
        // Created up front so a nested output root can be recognized and skipped.
        if let Err(e) = std::fs::create_dir_all(&self.job.output_root) {
            warn!("Failed to create output root {:?}: {}", self.job.output_root, e);
        }
        let skip = self.nested_output_root();
        let mut processed = 0;
        let mut failed = 0;

        let walker = WalkDir::new(&self.job.input_root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| match &skip {
                Some(output) if entry.file_type().is_dir() => entry
                    .path()
                    .canonicalize()
                    .map(|p| p != *output)
                    .unwrap_or(true),
                _ => true,
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Failed to read directory entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let source = entry.path();
            match self.process_file(source, processor) {
                None => {}
                Some(Ok(destination)) => {
                    processed += 1;
                    self.sink.emit(LogEvent::processed(source, &destination));
                }
                Some(Err(e)) => {
                    failed += 1;
                    warn!(path = %source.display(), error = %e, "File failed");
                    self.sink.emit(LogEvent::failed(source));
                }
            }
        }

        self.state = JobState::Completed;
        self.sink.banner(BANNER_END);
        info!(
            "Batch completed: {} processed, {} failed in {:.2}s",
            processed,
            failed,
            start_time.elapsed().as_secs_f64()
        );
        self.report(processed, failed)
    }
}

/// Validate `job`, then run it to completion with the processor its mode calls for.
pub fn run_job(job: &BatchJob, config: &Config, sink: &dyn LogSink) -> BatchReport {
    let engine = Engine::from_config(&config.engine);
    let mut orchestrator = Orchestrator::new(job, engine.clone(), sink);

    let validated = match orchestrator.validate(&config.fonts.directory) {
        Ok(validated) => validated,
        Err(_) => return orchestrator.report(0, 0),
    };

    let processor: Box<dyn FileProcessor> = match &job.mode {
        JobMode::Watermark(_) => {
            match WatermarkProcessor::new(validated, engine, config.video.fallback_size()) {
                Ok(processor) => Box::new(processor),
                Err(e) => {
                    orchestrator.abort(&e);
                    return orchestrator.report(0, 0);
                }
            }
        }
        JobMode::Compress(spec) => Box::new(CompressProcessor::new(spec.clone(), engine)),
    };

    orchestrator.execute(processor.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(MediaClass::classify(Path::new("a.JPG"), false), MediaClass::Image);
        assert_eq!(MediaClass::classify(Path::new("a.png"), false), MediaClass::Image);
        assert_eq!(MediaClass::classify(Path::new("a.webp"), false), MediaClass::Unsupported);
        assert_eq!(MediaClass::classify(Path::new("a.webp"), true), MediaClass::Image);
        assert_eq!(MediaClass::classify(Path::new("a.mp4"), false), MediaClass::Video);
        assert_eq!(MediaClass::classify(Path::new("a.mov"), false), MediaClass::Unsupported);
        assert_eq!(MediaClass::classify(Path::new("a.mov"), true), MediaClass::Video);
        assert_eq!(MediaClass::classify(Path::new("README"), true), MediaClass::Unsupported);
    }

    #[test]
    fn test_cjk_filter() {
        assert_eq!(cjk_filter("上海旅行2024"), "上海旅行");
        assert_eq!(cjk_filter("Day1"), "");
        assert_eq!(cjk_filter("2023_杭州-西湖"), "杭州西湖");
    }

    #[test]
    fn test_compose_mark_text() {
        assert_eq!(compose_mark_text(Some("© me"), "上海", Some("2024-05-01")), "© me");
        assert_eq!(compose_mark_text(None, "上海", Some("2024-05-01")), "2024-05-01\n上海");
        assert_eq!(compose_mark_text(None, "上海", None), "上海");
        assert_eq!(compose_mark_text(None, "", Some("2024-05-01")), "2024-05-01");
    }

    #[test]
    fn test_output_file_name() {
        let src = Path::new("/in/IMG_0001.JPG");
        assert_eq!(output_file_name(src, None, 3, None), PathBuf::from("IMG_0001.JPG"));
        assert_eq!(output_file_name(src, Some("out"), 3, None), PathBuf::from("out_3.JPG"));
        assert_eq!(
            output_file_name(src, Some("out"), 1, Some("webp")),
            PathBuf::from("out_1.JPG.webp")
        );
        assert_eq!(
            output_file_name(Path::new("clip.mp4"), None, 1, Some("mov")),
            PathBuf::from("clip.mp4.mov")
        );
        assert_ne!(
            output_file_name(Path::new("a.jpg"), None, 1, Some("webp")),
            output_file_name(Path::new("a.png"), None, 1, Some("webp"))
        );
    }
}
