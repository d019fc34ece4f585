use crate::engine::EngineError;
use crate::render::RenderError;
use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single file. Logged and skipped; the batch carries on.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported media: {0:?}")]
    Unsupported(PathBuf),
}

impl ProcessError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
