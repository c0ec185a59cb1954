//! FFmpeg command builder and runner.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{stderr_tail, MediaError, MediaResult};

/// Histogram of FFmpeg wall time, labelled by stage.
pub const FFMPEG_DURATION_SECONDS: &str = "bounce_ffmpeg_duration_seconds";

/// Stderr lines kept on failure.
const STDERR_TAIL_LINES: usize = 5;

/// One `-i` input and the arguments placed before it.
#[derive(Debug, Clone)]
struct FfmpegInput {
    args: Vec<String>,
    path: PathBuf,
}

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Inputs in `-i` order
    inputs: Vec<FfmpegInput>,
    /// Output file path, `-` for the null muxer
    output: PathBuf,
    /// Output arguments (after the last -i)
    output_args: Vec<String>,
    /// Whether to overwrite output
    overwrite: bool,
    /// Log level
    log_level: String,
    /// Stage name for logs and metrics
    label: &'static str,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command writing to `output`.
    pub fn new(output: impl AsRef<Path>) -> Self {
        Self {
            inputs: Vec::new(),
            output: output.as_ref().to_path_buf(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
            label: "ffmpeg",
        }
    }

    /// Decode-only command that discards its output (`-f null -`).
    pub fn null_output() -> Self {
        Self::new("-").output_arg("-f").output_arg("null")
    }

    /// Add an input.
    pub fn input(self, path: impl AsRef<Path>) -> Self {
        self.input_with_args(std::iter::empty::<String>(), path)
    }

    /// Add an input with arguments placed before its `-i`.
    pub fn input_with_args<I, S>(mut self, args: I, path: impl AsRef<Path>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs.push(FfmpegInput {
            args: args.into_iter().map(Into::into).collect(),
            path: path.as_ref().to_path_buf(),
        });
        self
    }

    /// Add an output argument.
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Add multiple output arguments.
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Output-side seek (frame accurate).
    pub fn seek(self, seconds: f64) -> Self {
        self.output_arg("-ss").output_arg(format!("{:.6}", seconds))
    }

    /// Limit output duration.
    pub fn duration(self, seconds: f64) -> Self {
        self.output_arg("-t").output_arg(format!("{:.6}", seconds))
    }

    /// Set video filter.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    /// Map a stream from an input.
    pub fn map(self, spec: impl Into<String>) -> Self {
        self.output_arg("-map").output_arg(spec)
    }

    /// Drop audio.
    pub fn no_audio(self) -> Self {
        self.output_arg("-an")
    }

    /// Set log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Set the stage label used in logs and metrics.
    pub fn label(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }
        args.push("-hide_banner".to_string());
        args.push("-v".to_string());
        args.push(self.log_level.clone());

        for input in &self.inputs {
            args.extend(input.args.iter().cloned());
            args.push("-i".to_string());
            args.push(input.path.to_string_lossy().to_string());
        }

        args.extend(self.output_args.iter().cloned());
        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Runner for FFmpeg commands with an optional timeout.
#[derive(Debug, Clone, Default)]
pub struct FfmpegRunner {
    /// Timeout in seconds
    timeout_secs: Option<u64>,
}

impl FfmpegRunner {
    /// Create a new runner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Run an FFmpeg command and return its stderr.
    ///
    /// The child is killed if the timeout elapses.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<String> {
        check_ffmpeg()?;

        let args = cmd.build_args();
        debug!(stage = cmd.label, "Running FFmpeg: ffmpeg {}", args.join(" "));

        let started = Instant::now();
        let output = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match self.timeout_secs {
            Some(secs) => match tokio::time::timeout(Duration::from_secs(secs), output).await {
                Ok(result) => result?,
                Err(_) => {
                    warn!(stage = cmd.label, "FFmpeg timed out after {} seconds, killing process", secs);
                    return Err(MediaError::Timeout(secs));
                }
            },
            None => output.await?,
        };

        let elapsed = started.elapsed().as_secs_f64();
        metrics::histogram!(FFMPEG_DURATION_SECONDS, "stage" => cmd.label).record(elapsed);

        if !output.status.success() {
            return Err(MediaError::ffmpeg_failed(
                format!("{} exited with non-zero status", cmd.label),
                stderr_tail(&output.stderr, STDERR_TAIL_LINES),
                output.status.code(),
            ));
        }

        debug!(stage = cmd.label, elapsed_secs = elapsed, "FFmpeg finished");
        Ok(String::from_utf8_lossy(&output.stderr).into_owned())
    }
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Check if FFprobe is available.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_builder() {
        let cmd = FfmpegCommand::new("output.mp4")
            .input_with_args(["-ss", "5.000000"], "input.mp4")
            .seek(1.5)
            .duration(30.0)
            .no_audio();

        let args = cmd.build_args();
        assert_eq!(&args[..4], &["-y", "-hide_banner", "-v", "error"]);
        let input_at = args.iter().position(|a| a == "input.mp4").unwrap();
        assert_eq!(&args[input_at - 3..input_at], &["-ss", "5.000000", "-i"]);
        assert!(args.contains(&"1.500000".to_string()));
        assert!(args.contains(&"30.000000".to_string()));
        assert_eq!(args.last().unwrap(), "output.mp4");
    }

    #[test]
    fn test_multiple_inputs_in_order() {
        let args = FfmpegCommand::new("out.mp4")
            .input("video.mp4")
            .input("audio.mp3")
            .map("0:v:0")
            .map("1:a:0")
            .build_args();

        let video = args.iter().position(|a| a == "video.mp4").unwrap();
        let audio = args.iter().position(|a| a == "audio.mp3").unwrap();
        let map = args.iter().position(|a| a == "-map").unwrap();
        assert!(video < audio && audio < map);
    }

    #[test]
    fn test_null_output() {
        let args = FfmpegCommand::null_output()
            .input("in.mp4")
            .log_level("info")
            .build_args();
        assert!(args.ends_with(&["-f".to_string(), "null".to_string(), "-".to_string()]));
        assert!(args.contains(&"info".to_string()));
    }
}
