//! Beat sources: an external tracker command or a precomputed beat file.

use async_trait::async_trait;
use bounce_align::{parse_timestamp_list, TimestampList};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{stderr_tail, MediaError, MediaResult};
use crate::workspace::Workspace;

/// File name the tracker writes into the workspace.
const BEATS_FILE: &str = "beats.txt";

/// Beat timestamps plus the tracker's tempo estimate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BeatTrack {
    /// Beat times in seconds, ascending
    pub beats: Vec<f64>,
    /// Tempo reported by the tracker
    pub tempo_bpm: Option<f64>,
}

impl From<TimestampList> for BeatTrack {
    fn from(list: TimestampList) -> Self {
        let mut beats = list.timestamps;
        beats.sort_by(f64::total_cmp);
        Self {
            beats,
            tempo_bpm: list.tempo_bpm,
        }
    }
}

/// Something that finds beats in an audio file.
#[async_trait]
pub trait BeatSource: Send + Sync {
    async fn track(&self, audio: &Path, workspace: &Workspace) -> MediaResult<BeatTrack>;
}

/// Beats read from an existing timestamp list.
#[derive(Debug, Clone)]
pub struct BeatFile {
    path: PathBuf,
}

impl BeatFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read and parse the file.
    pub async fn load(&self) -> MediaResult<BeatTrack> {
        read_beat_file(&self.path).await
    }
}

#[async_trait]
impl BeatSource for BeatFile {
    async fn track(&self, _audio: &Path, _workspace: &Workspace) -> MediaResult<BeatTrack> {
        self.load().await
    }
}

/// External beat tracker run as `<program> <args…> <audio> <out_file>`.
///
/// The program must write a timestamp list to `out_file`.
#[derive(Debug, Clone)]
pub struct CommandBeatTracker {
    program: String,
    args: Vec<String>,
    timeout_secs: Option<u64>,
}

impl CommandBeatTracker {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout_secs: None,
        }
    }

    /// Arguments placed before the audio path.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Full argument list for one run.
    pub fn build_args(&self, audio: &Path, out_file: &Path) -> Vec<String> {
        let mut args = self.args.clone();
        args.push(audio.to_string_lossy().to_string());
        args.push(out_file.to_string_lossy().to_string());
        args
    }
}

#[async_trait]
impl BeatSource for CommandBeatTracker {
    async fn track(&self, audio: &Path, workspace: &Workspace) -> MediaResult<BeatTrack> {
        if !audio.exists() {
            return Err(MediaError::FileNotFound(audio.to_path_buf()));
        }
        let program = which::which(&self.program)
            .map_err(|_| MediaError::ToolNotFound(self.program.clone()))?;

        let out_file = workspace.file(BEATS_FILE);
        let args = self.build_args(audio, &out_file);
        debug!("Running beat tracker: {} {}", self.program, args.join(" "));

        let output = Command::new(program)
            .args(&args)
            .current_dir(workspace.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match self.timeout_secs {
            Some(secs) => match tokio::time::timeout(Duration::from_secs(secs), output).await {
                Ok(result) => result?,
                Err(_) => {
                    warn!(program = %self.program, "Beat tracker timed out after {} seconds", secs);
                    return Err(MediaError::Timeout(secs));
                }
            },
            None => output.await?,
        };

        if !output.status.success() {
            return Err(MediaError::tool_failed(
                &self.program,
                "exited with non-zero status",
                stderr_tail(&output.stderr, 5),
                output.status.code(),
            ));
        }
        if !out_file.exists() {
            return Err(MediaError::tool_failed(
                &self.program,
                format!("did not write {}", out_file.display()),
                None,
                output.status.code(),
            ));
        }

        let track = read_beat_file(&out_file).await?;
        info!(
            beats = track.beats.len(),
            tempo_bpm = track.tempo_bpm,
            "Beat tracking finished"
        );
        Ok(track)
    }
}

async fn read_beat_file(path: &Path) -> MediaResult<BeatTrack> {
    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }
    let text = tokio::fs::read_to_string(path).await?;
    Ok(parse_timestamp_list(&text).into())
}
