//! Stage orchestration.
//!
//! ```text
//! audio ──► beats ──► measures ─┐
//!                               ├──► align ──► plan ──► assemble ──► output
//! video ──► scenes ─────────────┘
//! ```
//!
//! Stages run one after another; each stage's output is the next one's
//! input. The first failing stage aborts the run.

use anyhow::{Context, Result};
use bounce_align::{
    align, estimate_tempo, filter_measures, parse_timestamp_list, read_plan, time_scale,
    write_plan, write_timestamp_list, AlignOptions, Alignment,
};
use bounce_media::{
    assemble, probe_duration, AssemblyRequest, BeatFile, BeatSource, BeatTrack,
    CommandBeatTracker, FfmpegRunner, FfmpegSceneDetector, SceneSource, Workspace,
};
use bounce_models::{AlignConfig, CutPlan};
use std::path::{Path, PathBuf};
use tracing::{info, Instrument};

use crate::config::PipelineConfig;
use crate::logging::StageLogger;

const RUN_STAGES: usize = 5;

/// Inputs for a full run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub audio: PathBuf,
    pub video: PathBuf,
    pub output: PathBuf,
    pub align: AlignConfig,
    /// Precomputed beats; the beat tracker runs when unset
    pub beats_file: Option<PathBuf>,
    pub keep_workspace: bool,
}

/// What a full run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub output: PathBuf,
    pub segments: usize,
    pub warnings: usize,
    pub time_scale: Option<f64>,
    /// Kept workspace, when requested
    pub workspace: Option<PathBuf>,
}

/// Runs pipeline stages with shared configuration.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    runner: FfmpegRunner,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        let runner = match config.ffmpeg_timeout_secs {
            Some(secs) => FfmpegRunner::new().with_timeout(secs),
            None => FfmpegRunner::new(),
        };
        Self { config, runner }
    }

    fn workspace(&self) -> Result<Workspace> {
        let workspace = match &self.config.work_dir {
            Some(dir) => Workspace::new_in(dir),
            None => Workspace::new(),
        };
        workspace.context("Failed to create workspace")
    }

    fn beat_source(&self, beats_file: Option<&Path>) -> Box<dyn BeatSource> {
        match beats_file {
            Some(path) => Box::new(BeatFile::new(path)),
            None => {
                let tracker = CommandBeatTracker::new(&self.config.beat_tracker)
                    .with_args(self.config.beat_tracker_args.iter().cloned());
                match self.config.ffmpeg_timeout_secs {
                    Some(secs) => Box::new(tracker.with_timeout(secs)),
                    None => Box::new(tracker),
                }
            }
        }
    }

    fn scene_detector(&self, threshold: f64) -> FfmpegSceneDetector {
        FfmpegSceneDetector::new(threshold)
            .with_min_gap(self.config.scene_min_gap)
            .with_runner(self.runner.clone())
    }

    /// Beats, measures, scenes, alignment and assembly in one go.
    pub async fn run(&self, request: &RunRequest) -> Result<RunSummary> {
        request.align.validate().context("Invalid alignment settings")?;
        ensure_exists(&request.audio, "Audio file")?;
        ensure_exists(&request.video, "Video file")?;

        let workspace = self.workspace()?;
        info!(
            workspace = %workspace.path().display(),
            audio = %request.audio.display(),
            video = %request.video.display(),
            "Starting run"
        );

        let beats = self
            .beat_stage(request.beats_file.as_deref(), &request.audio, &workspace)
            .await?;

        let measures = {
            let logger = StageLogger::new("measures", 2, RUN_STAGES);
            logger.log_start("filtering beats to measures");
            let measures = logger
                .create_span()
                .in_scope(|| measures_from_beats(&beats, request.align.beats_per_measure))?;
            let text = measures_text(&measures, request.align.beats_per_measure, &request.audio);
            tokio::fs::write(workspace.file("measures.txt"), text).await?;
            logger.log_completion(&format!("{} measures", measures.len()));
            measures
        };

        let scenes = {
            let logger = StageLogger::new("scenes", 3, RUN_STAGES);
            logger.log_start("detecting scene changes");
            let scenes = self
                .scene_detector(request.align.scene_threshold)
                .detect(&request.video)
                .instrument(logger.create_span())
                .await
                .context("Scene detection failed")?;
            logger.log_completion(&format!("{} scenes", scenes.len()));
            scenes
        };

        let alignment = {
            let logger = StageLogger::new("align", 4, RUN_STAGES);
            logger.log_start("aligning scenes to measures");
            let audio_duration = probe_duration(&request.audio)
                .instrument(logger.create_span())
                .await
                .context("Failed to probe audio duration")?;
            let options = AlignOptions::from_config(&request.align, Some(audio_duration))?;
            let alignment = logger
                .create_span()
                .in_scope(|| align(&scenes, &measures, &options))?;
            report_warnings(&logger, &alignment);
            tokio::fs::write(workspace.file("scene_plan.txt"), write_plan(&alignment.plan)).await?;
            logger.log_completion(&format!("{} segments", alignment.plan.len()));
            alignment
        };

        let scale = time_scale(&alignment.plan);
        {
            let logger = StageLogger::new("assemble", 5, RUN_STAGES);
            logger.log_start("assembling final video");
            let assembly = AssemblyRequest::new(
                &request.video,
                &request.audio,
                alignment.plan.clone(),
                &request.output,
            )
            .with_time_scale(scale)
            .with_encoding(self.config.encoding.clone());
            assemble(&assembly, &workspace, &self.runner)
                .instrument(logger.create_span())
                .await
                .context("Assembly failed")?;
            logger.log_completion(&request.output.display().to_string());
        }

        let kept = request.keep_workspace.then(|| workspace.keep());
        if let Some(path) = &kept {
            info!(path = %path.display(), "Workspace kept");
        }

        Ok(RunSummary {
            output: request.output.clone(),
            segments: alignment.plan.len(),
            warnings: alignment.diagnostics.warnings.len(),
            time_scale: scale,
            workspace: kept,
        })
    }

    async fn beat_stage(
        &self,
        beats_file: Option<&Path>,
        audio: &Path,
        workspace: &Workspace,
    ) -> Result<BeatTrack> {
        let logger = StageLogger::new("beats", 1, RUN_STAGES);
        logger.log_start("detecting beats");
        let track = self
            .beat_source(beats_file)
            .track(audio, workspace)
            .instrument(logger.create_span())
            .await
            .context("Beat detection failed")?;
        if track.beats.is_empty() {
            logger.log_warning("no beats found, cuts will not be snapped");
        }
        logger.log_completion(&format!("{} beats", track.beats.len()));
        Ok(track)
    }

    /// `bounce measures`: filter a beat list and write the measure list.
    pub async fn measures(&self, beats: &Path, output: &Path, beats_per_measure: u32) -> Result<usize> {
        let track = BeatFile::new(beats)
            .load()
            .await
            .with_context(|| format!("Failed to read beats from {}", beats.display()))?;
        let measures = measures_from_beats(&track, beats_per_measure)?;
        tokio::fs::write(output, measures_text(&measures, beats_per_measure, beats))
            .await
            .with_context(|| format!("Failed to write {}", output.display()))?;
        info!(measures = measures.len(), output = %output.display(), "Wrote measures");
        Ok(measures.len())
    }

    /// `bounce plan`: detect scenes and align them to a measure list.
    pub async fn plan(
        &self,
        video: &Path,
        measures: &Path,
        output: &Path,
        config: &AlignConfig,
        audio_duration: Option<f64>,
    ) -> Result<Alignment> {
        config.validate().context("Invalid alignment settings")?;
        ensure_exists(video, "Video file")?;
        let measures = load_measures(measures).await?;

        let scenes = self
            .scene_detector(config.scene_threshold)
            .detect(video)
            .await
            .context("Scene detection failed")?;

        let options = AlignOptions::from_config(config, audio_duration)?;
        let alignment = align(&scenes, &measures, &options)?;
        report_warnings(&StageLogger::new("align", 1, 1), &alignment);

        tokio::fs::write(output, write_plan(&alignment.plan))
            .await
            .with_context(|| format!("Failed to write {}", output.display()))?;
        info!(segments = alignment.plan.len(), output = %output.display(), "Wrote cut plan");
        Ok(alignment)
    }

    /// `bounce assemble`: render a plan file with an audio track.
    pub async fn assemble(&self, video: &Path, plan: &Path, audio: &Path, output: &Path) -> Result<PathBuf> {
        let plan = load_plan(plan).await?;
        let workspace = self.workspace()?;
        let scale = time_scale(&plan);
        let request = AssemblyRequest::new(video, audio, plan, output)
            .with_time_scale(scale)
            .with_encoding(self.config.encoding.clone());
        let output = assemble(&request, &workspace, &self.runner)
            .await
            .context("Assembly failed")?;
        Ok(output)
    }
}

/// Read a plan file.
pub async fn load_plan(path: &Path) -> Result<CutPlan> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read plan {}", path.display()))?;
    read_plan(&text).with_context(|| format!("Invalid plan {}", path.display()))
}

/// Read a measure list, sorted for the aligner's binary searches.
pub async fn load_measures(path: &Path) -> Result<Vec<f64>> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read measures from {}", path.display()))?;
    let mut measures = parse_timestamp_list(&text).timestamps;
    measures.sort_by(f64::total_cmp);
    Ok(measures)
}

fn measures_from_beats(track: &BeatTrack, beats_per_measure: u32) -> Result<Vec<f64>> {
    let measures = filter_measures(&track.beats, beats_per_measure)?;
    if let Some(tempo) = estimate_tempo(&measures, beats_per_measure) {
        info!(
            bpm = tempo.bpm,
            measure_secs = tempo.measure_duration,
            tracker_bpm = track.tempo_bpm,
            "Estimated tempo"
        );
    }
    Ok(measures)
}

fn measures_text(measures: &[f64], beats_per_measure: u32, source: &Path) -> String {
    let mut header = vec![
        format!("Measure timestamps from: {}", source.display()),
        format!("Beats per measure: {}", beats_per_measure),
    ];
    if let Some(tempo) = estimate_tempo(measures, beats_per_measure) {
        header.push(format!("Estimated tempo: {:.1} BPM", tempo.bpm));
    }
    write_timestamp_list(measures, &header)
}

fn report_warnings(logger: &StageLogger, alignment: &Alignment) {
    for warning in &alignment.diagnostics.warnings {
        logger.log_warning(&warning.to_string());
    }
    info!(
        scenes = alignment.diagnostics.scenes_in,
        split = alignment.diagnostics.scenes_split,
        elided = alignment.diagnostics.segments_elided,
        max_snap_shift = alignment.diagnostics.max_snap_shift,
        mean_snap_shift = alignment.diagnostics.mean_snap_shift,
        "Alignment diagnostics"
    );
}

fn ensure_exists(path: &Path, what: &str) -> Result<()> {
    anyhow::ensure!(path.exists(), "{} not found: {}", what, path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bounce_models::Scene;

    #[test]
    fn test_measures_text_round_trips() {
        let track = BeatTrack {
            beats: (0..16).map(|i| i as f64 * 0.5).collect(),
            tempo_bpm: Some(120.0),
        };
        let measures = measures_from_beats(&track, 4).unwrap();
        assert_eq!(measures, vec![0.0, 2.0, 4.0, 6.0]);

        let text = measures_text(&measures, 4, Path::new("song.mp3"));
        let parsed = parse_timestamp_list(&text);
        assert_eq!(parsed.timestamps, measures);
        assert_eq!(parsed.tempo_bpm, Some(120.0));
    }

    #[test]
    fn test_invalid_beats_per_measure() {
        let track = BeatTrack::default();
        assert!(measures_from_beats(&track, 0).is_err());
    }

    #[tokio::test]
    async fn test_measures_command() {
        let dir = tempfile::tempdir().unwrap();
        let beats = dir.path().join("beats.txt");
        let output = dir.path().join("measures.txt");
        std::fs::write(&beats, "# Detected 8 beats at 120.0 BPM\n1, 0.0\n2, 0.5\n3, 1.0\n4, 1.5\n5, 2.0\n6, 2.5\n7, 3.0\n8, 3.5\n").unwrap();

        let pipeline = Pipeline::new(PipelineConfig::default());
        let count = pipeline.measures(&beats, &output, 4).await.unwrap();
        assert_eq!(count, 2);

        let written = std::fs::read_to_string(&output).unwrap();
        assert_eq!(parse_timestamp_list(&written).timestamps, vec![0.0, 2.0]);
    }

    #[tokio::test]
    async fn test_hand_edited_measures_are_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("measures.txt");
        std::fs::write(&path, "1, 0.0\n2, 9.0\n3, 3.0\n4, 6.0\n5, 12.0\n").unwrap();

        let measures = load_measures(&path).await.unwrap();
        assert_eq!(measures, vec![0.0, 3.0, 6.0, 9.0, 12.0]);

        let scenes = [Scene::new(0.0, 10.0), Scene::new(10.0, 14.0)];
        let plan = align(&scenes, &measures, &AlignOptions::new()).unwrap().plan;
        assert_eq!(plan.segments[0].end, 9.0);
    }

    #[tokio::test]
    async fn test_load_plan_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.txt");
        std::fs::write(&path, "0 2\n1 3\n").unwrap();

        let err = load_plan(&path).await.unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));
    }

    #[tokio::test]
    async fn test_run_rejects_bad_config_first() {
        let pipeline = Pipeline::new(PipelineConfig::default());
        let request = RunRequest {
            audio: PathBuf::from("/nonexistent/song.mp3"),
            video: PathBuf::from("/nonexistent/video.mp4"),
            output: PathBuf::from("out.mp4"),
            align: AlignConfig::default().with_max_scene_measures(Some(0)),
            beats_file: None,
            keep_workspace: false,
        };
        let err = pipeline.run(&request).await.unwrap_err();
        assert!(err.to_string().contains("Invalid alignment settings"));
    }
}
