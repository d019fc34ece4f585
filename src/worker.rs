use crate::Config;
use crate::batch::{self, BatchReport};
use crate::job::BatchJob;
use crate::log_sink::{ChannelSink, LogEvent};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;

/// A batch running on the blocking pool.
pub struct BatchHandle {
    /// Events in emission order; closes when the batch finishes.
    pub events: UnboundedReceiver<LogEvent>,
    pub task: JoinHandle<BatchReport>,
}

/// Run `job` on a single background worker and stream its log events back.
///
/// Files are processed sequentially; engine calls block the worker, never the
/// caller's runtime.
pub fn spawn_batch(job: BatchJob, config: Config) -> BatchHandle {
    let (sender, events) = mpsc::unbounded_channel();
    let task = tokio::task::spawn_blocking(move || {
        let sink = ChannelSink::new(sender);
        batch::run_job(&job, &config, &sink)
    });
    BatchHandle { events, task }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::JobState;
    use crate::engine::compress::CompressSpec;
    use crate::job::JobMode;
    use crate::log_sink::Severity;
    use crate::timestamp::DateFormat;

    #[tokio::test]
    async fn test_validation_failure_streams_one_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let job = BatchJob {
            input_root: dir.path().to_path_buf(),
            output_root: dir.path().to_path_buf(),
            rename_template: None,
            process_video: false,
            date_format: DateFormat::default(),
            mode: JobMode::Compress(CompressSpec::default()),
        };

        let BatchHandle { mut events, task } = spawn_batch(job, Config::default());
        let mut received = Vec::new();
        while let Some(event) = events.recv().await {
            received.push(event);
        }
        let report = task.await.unwrap();

        assert_eq!(report.state, JobState::Aborted);
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].severity, Severity::Error);
        assert_eq!(received[0].message, "导出与导入目录不能一致");
    }
}
