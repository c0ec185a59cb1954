//! FFprobe duration lookup.

use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::command::check_ffprobe;
use crate::error::{stderr_tail, MediaError, MediaResult};

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

/// Container duration of a media file, in seconds.
pub async fn probe_duration(path: impl AsRef<Path>) -> MediaResult<f64> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    check_ffprobe()?;

    let output = Command::new("ffprobe")
        .args(["-v", "error", "-show_entries", "format=duration", "-of", "json"])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: format!("FFprobe failed on {}", path.display()),
            stderr: stderr_tail(&output.stderr, 5),
        });
    }

    let duration = parse_duration_json(&output.stdout)?;
    debug!(path = %path.display(), duration, "Probed duration");
    Ok(duration)
}

/// Read `format.duration` from FFprobe's JSON output.
fn parse_duration_json(json: &[u8]) -> MediaResult<f64> {
    let probe: FfprobeOutput = serde_json::from_slice(json)?;
    probe
        .format
        .duration
        .as_deref()
        .and_then(|d| d.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .ok_or_else(|| MediaError::invalid_media("FFprobe reported no usable duration"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_json() {
        let json = br#"{"format": {"duration": "183.520000"}}"#;
        assert!((parse_duration_json(json).unwrap() - 183.52).abs() < 1e-9);
    }

    #[test]
    fn test_parse_duration_missing() {
        assert!(matches!(
            parse_duration_json(br#"{"format": {}}"#),
            Err(MediaError::InvalidMedia(_))
        ));
        assert!(matches!(
            parse_duration_json(br#"{"format": {"duration": "N/A"}}"#),
            Err(MediaError::InvalidMedia(_))
        ));
        assert!(matches!(
            parse_duration_json(b"not json"),
            Err(MediaError::JsonParse(_))
        ));
    }

    #[tokio::test]
    async fn test_probe_missing_file() {
        let err = probe_duration("/nonexistent/bounce/input.mp4").await.unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }
}
