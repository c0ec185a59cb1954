//! Scene change detection with FFmpeg's `scene` score.
//!
//! The `select` filter passes frames whose scene score exceeds the threshold
//! and `showinfo` logs their `pts_time` on stderr. When a threshold finds
//! too few cuts the detector retries with more sensitive ones.

use async_trait::async_trait;
use bounce_align::{scenes_from_cuts, DEFAULT_MIN_SCENE_GAP};
use bounce_models::{Scene, DEFAULT_SCENE_THRESHOLD};
use std::path::Path;
use tracing::{debug, info};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;
use crate::probe::probe_duration;

/// Cuts at or before this time are ignored.
pub const MIN_CUT_TIME: f64 = 0.1;

/// Retry with a lower threshold while fewer cuts than this are found.
const MIN_CUTS_BEFORE_FALLBACK: usize = 3;

/// Scale applied to the threshold for the first retry.
const FALLBACK_SCALE: f64 = 0.6;

/// Most sensitive threshold tried.
const SENSITIVE_THRESHOLD: f64 = 0.15;

/// Something that partitions a video into scenes.
#[async_trait]
pub trait SceneSource: Send + Sync {
    /// Contiguous scenes covering the whole video.
    async fn detect(&self, video: &Path) -> MediaResult<Vec<Scene>>;
}

/// Scene detection through FFmpeg's `select='gt(scene,T)'` filter.
#[derive(Debug, Clone)]
pub struct FfmpegSceneDetector {
    threshold: f64,
    min_gap: f64,
    runner: FfmpegRunner,
}

impl Default for FfmpegSceneDetector {
    fn default() -> Self {
        Self::new(DEFAULT_SCENE_THRESHOLD)
    }
}

impl FfmpegSceneDetector {
    /// Create a detector; lower thresholds find more cuts.
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            min_gap: DEFAULT_MIN_SCENE_GAP,
            runner: FfmpegRunner::new(),
        }
    }

    /// Minimum spacing between kept cuts, seconds.
    pub fn with_min_gap(mut self, min_gap: f64) -> Self {
        self.min_gap = min_gap;
        self
    }

    /// Runner used for FFmpeg invocations.
    pub fn with_runner(mut self, runner: FfmpegRunner) -> Self {
        self.runner = runner;
        self
    }

    /// Raw cut times for one threshold.
    pub async fn detect_cuts(&self, video: &Path, threshold: f64) -> MediaResult<Vec<f64>> {
        let cmd = FfmpegCommand::null_output()
            .input(video)
            .video_filter(scene_filter(threshold))
            .output_args(["-vsync", "vfr"])
            .log_level("info")
            .label("scene_detect");

        let stderr = self.runner.run(&cmd).await?;
        let cuts = parse_showinfo_cuts(&stderr);
        debug!(threshold, cuts = cuts.len(), "Scene pass finished");
        Ok(cuts)
    }
}

#[async_trait]
impl SceneSource for FfmpegSceneDetector {
    async fn detect(&self, video: &Path) -> MediaResult<Vec<Scene>> {
        let duration = probe_duration(video).await?;

        let mut cuts = Vec::new();
        for threshold in threshold_ladder(self.threshold) {
            cuts = self.detect_cuts(video, threshold).await?;
            if cuts.len() >= MIN_CUTS_BEFORE_FALLBACK {
                break;
            }
            debug!(threshold, cuts = cuts.len(), "Few scene changes, trying a lower threshold");
        }

        let scenes = scenes_from_cuts(&cuts, duration, self.min_gap);
        info!(
            video = %video.display(),
            duration,
            scenes = scenes.len(),
            "Detected scenes"
        );
        Ok(scenes)
    }
}

/// `select` + `showinfo` filter for a threshold.
pub fn scene_filter(threshold: f64) -> String {
    format!("select='gt(scene,{})',showinfo", threshold)
}

/// Thresholds to try in order: the requested one, then more sensitive ones.
fn threshold_ladder(threshold: f64) -> Vec<f64> {
    let mut ladder = vec![threshold];
    for next in [threshold * FALLBACK_SCALE, SENSITIVE_THRESHOLD] {
        if next < ladder[ladder.len() - 1] {
            ladder.push(next);
        }
    }
    ladder
}

/// Extract cut times from `showinfo` lines on FFmpeg's stderr.
///
/// Returns sorted, deduplicated times after [`MIN_CUT_TIME`].
pub fn parse_showinfo_cuts(stderr: &str) -> Vec<f64> {
    let mut cuts: Vec<f64> = stderr
        .lines()
        .filter(|line| line.contains("Parsed_showinfo"))
        .filter_map(|line| {
            let (_, rest) = line.split_once("pts_time:")?;
            rest.split_whitespace().next()?.parse::<f64>().ok()
        })
        .filter(|t| t.is_finite() && *t > MIN_CUT_TIME)
        .collect();

    cuts.sort_by(f64::total_cmp);
    cuts.dedup();
    cuts
}
