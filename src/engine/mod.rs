// Engine module - external transcoder/prober invocation
pub mod compress;
pub mod filter;
pub mod video;

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to start {program:?}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("engine exited with status {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },

    #[error("engine produced no output")]
    EmptyOutput,

    #[error("malformed engine output: {0}")]
    Malformed(String),
}

/// A program plus its argument vector. Arguments are passed verbatim to the
/// process, never through a shell.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl EngineCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Arguments as display strings, for logging and assertions.
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    /// Value following the first occurrence of `flag`.
    pub fn flag_value(&self, flag: &str) -> Option<String> {
        let args = self.args_lossy();
        let index = args.iter().position(|a| a == flag)?;
        args.get(index + 1).cloned()
    }

    fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            command.creation_flags(CREATE_NO_WINDOW);
        }

        command
    }
}

/// Handle to the external transcoding (`ffmpeg`) and probing (`ffprobe`) tools.
#[derive(Debug, Clone)]
pub struct Engine {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl Engine {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    pub fn from_config(config: &crate::EngineConfig) -> Self {
        Self::new(config.ffmpeg.clone(), config.ffprobe.clone())
    }

    /// Transcoder invocation that overwrites its output and only reports errors.
    pub fn transcode(&self) -> EngineCommand {
        EngineCommand::new(&self.ffmpeg).args(["-y", "-hide_banner", "-loglevel", "error"])
    }

    pub fn prober(&self) -> EngineCommand {
        EngineCommand::new(&self.ffprobe)
    }

    /// Run to completion; only exit status 0 counts as success.
    pub fn run(&self, command: &EngineCommand) -> Result<(), EngineError> {
        debug!(program = %command.program.display(), args = ?command.args_lossy(), "Running engine");

        let output = command
            .to_command()
            .output()
            .map_err(|source| EngineError::Spawn {
                program: command.program.clone(),
                source,
            })?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(code = ?output.status.code(), stderr = %stderr, "Engine command failed");
            Err(EngineError::Failed {
                code: output.status.code(),
                stderr,
            })
        }
    }

    /// Run a probe and return its trimmed stdout.
    pub fn probe(&self, command: &EngineCommand) -> Result<String, EngineError> {
        debug!(program = %command.program.display(), args = ?command.args_lossy(), "Running probe");

        let output = command
            .to_command()
            .output()
            .map_err(|source| EngineError::Spawn {
                program: command.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(EngineError::Failed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if stdout.is_empty() {
            Err(EngineError::EmptyOutput)
        } else {
            Ok(stdout)
        }
    }

    pub fn creation_time_probe(&self, path: &Path) -> EngineCommand {
        self.prober()
            .args([
                "-v",
                "quiet",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream_tags=creation_time",
                "-of",
                "default=nw=1:nk=1",
            ])
            .arg(path)
    }

    pub fn dimensions_probe(&self, path: &Path) -> EngineCommand {
        self.prober()
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height",
                "-of",
                "csv=p=0:s=x",
            ])
            .arg(path)
    }

    /// Raw creation-time tag of the first video stream.
    pub fn probe_creation_time(&self, path: &Path) -> Result<String, EngineError> {
        let raw = self.probe(&self.creation_time_probe(path))?;
        raw.lines()
            .next()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .ok_or(EngineError::EmptyOutput)
    }

    pub fn probe_dimensions(&self, path: &Path) -> Result<(u32, u32), EngineError> {
        let raw = self.probe(&self.dimensions_probe(path))?;
        parse_dimensions(&raw)
    }

    /// Pixel size of a video, or `fallback` when probing fails.
    pub fn video_dimensions(&self, path: &Path, fallback: (u32, u32)) -> (u32, u32) {
        match self.probe_dimensions(path) {
            Ok(dimensions) => dimensions,
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Could not probe video size, assuming {}x{}",
                    fallback.0,
                    fallback.1
                );
                fallback
            }
        }
    }
}

/// Parse `WIDTHxHEIGHT` as printed by the dimensions probe.
pub fn parse_dimensions(raw: &str) -> Result<(u32, u32), EngineError> {
    let line = raw.lines().next().unwrap_or_default().trim();
    let malformed = || EngineError::Malformed(line.to_string());

    let (w, h) = line.split_once('x').ok_or_else(malformed)?;
    let width = w.trim().parse::<u32>().map_err(|_| malformed())?;
    let height = h.trim().trim_end_matches('x').parse::<u32>().map_err(|_| malformed())?;

    if width == 0 || height == 0 {
        return Err(malformed());
    }
    Ok((width, height))
}
