use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::sync::mpsc::UnboundedSender;

pub const BANNER_RULE: &str = "==================================";
pub const BANNER_START: &str = "      处理已经开始，请稍候...";
pub const BANNER_END: &str = "              处理完成";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Error,
    Header,
}

/// One user-facing line of batch progress.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEvent {
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<PathBuf>,
}

impl LogEvent {
    pub fn header(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Header,
            message: message.into(),
            source: None,
            destination: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            source: None,
            destination: None,
        }
    }

    pub fn processed(source: &Path, destination: &Path) -> Self {
        Self {
            severity: Severity::Info,
            message: format!("已处理: {} -> {}", source.display(), destination.display()),
            source: Some(source.to_path_buf()),
            destination: Some(destination.to_path_buf()),
        }
    }

    pub fn failed(source: &Path) -> Self {
        Self {
            severity: Severity::Error,
            message: format!("处理失败: {}", source.display()),
            source: Some(source.to_path_buf()),
            destination: None,
        }
    }
}

/// Receiver of batch progress events.
pub trait LogSink: Send + Sync {
    fn emit(&self, event: LogEvent);

    fn banner(&self, line: &str) {
        self.emit(LogEvent::header(BANNER_RULE));
        self.emit(LogEvent::header(line));
        self.emit(LogEvent::header(BANNER_RULE));
    }
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn emit(&self, event: LogEvent) {
        match event.severity {
            Severity::Error => tracing::error!(
                source = ?event.source,
                "{}",
                event.message
            ),
            Severity::Info => tracing::info!(
                source = ?event.source,
                destination = ?event.destination,
                "{}",
                event.message
            ),
            Severity::Header => tracing::info!("{}", event.message),
        }
    }
}

/// Hands events to another thread or task over an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: UnboundedSender<LogEvent>,
}

impl ChannelSink {
    pub fn new(sender: UnboundedSender<LogEvent>) -> Self {
        Self { sender }
    }
}

impl LogSink for ChannelSink {
    fn emit(&self, event: LogEvent) {
        // The receiver going away only means nobody is watching anymore.
        if self.sender.send(event).is_err() {
            tracing::debug!("Log receiver dropped, event discarded");
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<LogEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LogEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn with_severity(&self, severity: Severity) -> Vec<LogEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.severity == severity)
            .collect()
    }
}

impl LogSink for MemorySink {
    fn emit(&self, event: LogEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl<S: LogSink + ?Sized> LogSink for std::sync::Arc<S> {
    fn emit(&self, event: LogEvent) {
        (**self).emit(event)
    }
}
