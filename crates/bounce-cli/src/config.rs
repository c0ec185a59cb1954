//! Pipeline configuration.

use bounce_align::DEFAULT_MIN_SCENE_GAP;
use bounce_models::EncodingConfig;
use std::path::PathBuf;

/// Beat tracker used when none is configured.
pub const DEFAULT_BEAT_TRACKER: &str = "python3";

/// Arguments for the default beat tracker.
pub const DEFAULT_BEAT_TRACKER_ARGS: &str = "detect_beats.py";

/// Environment-level settings shared by every subcommand.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Parent directory for run workspaces (system temp dir when unset)
    pub work_dir: Option<PathBuf>,
    /// Kill FFmpeg and the beat tracker after this many seconds
    pub ffmpeg_timeout_secs: Option<u64>,
    /// Beat tracker program
    pub beat_tracker: String,
    /// Arguments placed before the audio path
    pub beat_tracker_args: Vec<String>,
    /// Minimum spacing between detected scene cuts, seconds
    pub scene_min_gap: f64,
    /// Trim and mux encoding
    pub encoding: EncodingConfig,
    /// Emit JSON logs
    pub log_json: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            work_dir: None,
            ffmpeg_timeout_secs: None,
            beat_tracker: DEFAULT_BEAT_TRACKER.to_string(),
            beat_tracker_args: split_args(DEFAULT_BEAT_TRACKER_ARGS),
            scene_min_gap: DEFAULT_MIN_SCENE_GAP,
            encoding: EncodingConfig::default(),
            log_json: false,
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Create config from any variable lookup.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            work_dir: var("BOUNCE_WORK_DIR")
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            ffmpeg_timeout_secs: var("BOUNCE_FFMPEG_TIMEOUT_SECS")
                .and_then(|s| s.trim().parse().ok())
                .filter(|secs: &u64| *secs > 0),
            beat_tracker: var("BOUNCE_BEAT_TRACKER")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.beat_tracker),
            beat_tracker_args: var("BOUNCE_BEAT_TRACKER_ARGS")
                .map(|s| split_args(&s))
                .unwrap_or(defaults.beat_tracker_args),
            scene_min_gap: var("BOUNCE_SCENE_MIN_GAP")
                .and_then(|s| s.trim().parse().ok())
                .filter(|gap: &f64| gap.is_finite() && *gap >= 0.0)
                .unwrap_or(defaults.scene_min_gap),
            encoding: encoding_from_vars(&var, defaults.encoding),
            log_json: var("LOG_FORMAT")
                .map(|v| v.to_lowercase() == "json")
                .unwrap_or(false),
        }
    }
}

fn encoding_from_vars(
    var: &impl Fn(&str) -> Option<String>,
    mut encoding: EncodingConfig,
) -> EncodingConfig {
    if let Some(preset) = var("BOUNCE_PRESET").filter(|s| !s.trim().is_empty()) {
        encoding = encoding.with_preset(preset.trim());
    }
    if let Some(crf) = var("BOUNCE_CRF").and_then(|s| s.trim().parse().ok()) {
        encoding = encoding.with_crf(crf);
    }
    encoding
}

fn split_args(args: &str) -> Vec<String> {
    args.split_whitespace().map(str::to_string).collect()
}
