//! Assemble the final video from a cut plan.
//!
//! # Strategy
//!
//! 1. Extract each plan segment to its own silent file, re-encoded so cuts
//!    land on exact frames rather than keyframes
//! 2. Join the segments with the concat demuxer and stream copy
//! 3. Mux with the audio track, applying the global time scale with
//!    `setpts` and stopping at the shorter stream

use bounce_models::{format_seconds, CutPlan, EncodingConfig};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::workspace::Workspace;

/// Input seek lands this far before the segment; the rest is an output seek.
const FAST_SEEK_MARGIN: f64 = 5.0;

/// Scales closer to 1 than this are treated as 1 and skip re-encoding.
const SCALE_EPSILON: f64 = 1e-6;

/// Everything assembly needs from the earlier stages.
#[derive(Debug, Clone)]
pub struct AssemblyRequest {
    /// Source video the plan was computed on
    pub video: PathBuf,
    /// Music track
    pub audio: PathBuf,
    /// Segments to extract, in output order
    pub plan: CutPlan,
    /// Final output path
    pub output: PathBuf,
    /// Presentation timestamp multiplier
    pub time_scale: Option<f64>,
    pub encoding: EncodingConfig,
}

impl AssemblyRequest {
    pub fn new(
        video: impl Into<PathBuf>,
        audio: impl Into<PathBuf>,
        plan: CutPlan,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            video: video.into(),
            audio: audio.into(),
            plan,
            output: output.into(),
            time_scale: None,
            encoding: EncodingConfig::default(),
        }
    }

    pub fn with_time_scale(mut self, scale: Option<f64>) -> Self {
        self.time_scale = scale;
        self
    }

    pub fn with_encoding(mut self, encoding: EncodingConfig) -> Self {
        self.encoding = encoding;
        self
    }
}

/// Trim, concatenate and mux. Intermediate files live in `workspace`.
pub async fn assemble(
    request: &AssemblyRequest,
    workspace: &Workspace,
    runner: &FfmpegRunner,
) -> MediaResult<PathBuf> {
    if request.plan.is_empty() {
        return Err(MediaError::EmptyPlan);
    }
    for input in [&request.video, &request.audio] {
        if !input.exists() {
            return Err(MediaError::FileNotFound(input.clone()));
        }
    }

    info!(
        segments = request.plan.len(),
        time_scale = request.time_scale,
        "Assembling video"
    );

    let mut segment_paths = Vec::with_capacity(request.plan.len());
    for (i, segment) in request.plan.iter().enumerate() {
        let seg_path = workspace.file(format!("seg_{:04}.mp4", i));
        debug!(
            segment = i,
            at = %format_seconds(segment.start),
            start = segment.start,
            duration = segment.duration(),
            "Extracting segment"
        );
        let cmd = trim_command(&request.video, segment.start, segment.duration(), &seg_path, &request.encoding);
        runner.run(&cmd).await?;
        segment_paths.push(seg_path);
    }

    let list_path = workspace.file("concat.txt");
    tokio::fs::write(&list_path, concat_list(&segment_paths)).await?;

    let joined = workspace.file("concatenated.mp4");
    let concat = FfmpegCommand::new(&joined)
        .input_with_args(["-f", "concat", "-safe", "0"], &list_path)
        .output_args(["-c", "copy"])
        .label("concat");
    runner.run(&concat).await?;

    let mux = mux_command(&joined, request);
    runner.run(&mux).await?;

    info!(output = %request.output.display(), "Assembly completed");
    Ok(request.output.clone())
}

/// Frame-accurate, silent extraction of `[start, start + duration)`.
fn trim_command(
    video: &Path,
    start: f64,
    duration: f64,
    output: &Path,
    encoding: &EncodingConfig,
) -> FfmpegCommand {
    let fast_seek = (start - FAST_SEEK_MARGIN).max(0.0);
    FfmpegCommand::new(output)
        .input_with_args(["-ss".to_string(), format!("{:.6}", fast_seek)], video)
        .seek(start - fast_seek)
        .duration(duration)
        .output_args(encoding.video_args())
        .no_audio()
        .output_args(["-avoid_negative_ts", "make_zero"])
        .label("trim")
}

fn mux_command(video: &Path, request: &AssemblyRequest) -> FfmpegCommand {
    let mut cmd = FfmpegCommand::new(&request.output)
        .input(video)
        .input(&request.audio)
        .map("0:v:0")
        .map("1:a:0");

    cmd = match request.time_scale {
        Some(scale) if (scale - 1.0).abs() > SCALE_EPSILON => cmd
            .video_filter(setpts_filter(scale))
            .output_args(request.encoding.video_args()),
        _ => cmd.output_args(["-c:v", "copy"]),
    };

    cmd.output_args(request.encoding.audio_args())
        .output_args(["-shortest", "-movflags", "+faststart"])
        .label("mux")
}

/// Uniform re-timing filter.
pub fn setpts_filter(scale: f64) -> String {
    format!("setpts={:.6}*PTS", scale)
}

/// Concat demuxer list with single quotes escaped.
pub fn concat_list(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("file '{}'\n", p.display().to_string().replace('\'', "'\\''")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bounce_models::CutSegment;

    fn request(scale: Option<f64>) -> AssemblyRequest {
        AssemblyRequest::new(
            "in.mp4",
            "song.mp3",
            CutPlan::new(vec![CutSegment::new(0.0, 4.0)], None),
            "out.mp4",
        )
        .with_time_scale(scale)
    }

    #[test]
    fn test_concat_list_escapes_quotes() {
        let list = concat_list(&[PathBuf::from("/w/seg_0000.mp4"), PathBuf::from("/w/it's.mp4")]);
        assert_eq!(list, "file '/w/seg_0000.mp4'\nfile '/w/it'\\''s.mp4'\n");
    }

    #[test]
    fn test_setpts_filter() {
        assert_eq!(setpts_filter(1.25), "setpts=1.250000*PTS");
    }

    #[test]
    fn test_trim_uses_two_stage_seek() {
        let args = trim_command(
            Path::new("in.mp4"),
            12.5,
            3.0,
            Path::new("seg.mp4"),
            &EncodingConfig::default(),
        )
        .build_args();

        let input_at = args.iter().position(|a| a == "in.mp4").unwrap();
        assert_eq!(args[input_at - 2], "7.500000");
        assert_eq!(args[input_at + 1], "-ss");
        assert_eq!(args[input_at + 2], "5.000000");
        assert!(args.contains(&"-an".to_string()));
        assert!(args.contains(&"libx264".to_string()));
    }

    #[test]
    fn test_mux_copies_video_without_scale() {
        let args = mux_command(Path::new("joined.mp4"), &request(None)).build_args();
        assert!(args.windows(2).any(|w| w[0] == "-c:v" && w[1] == "copy"));
        assert!(args.contains(&"-shortest".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("setpts")));
    }

    #[test]
    fn test_mux_retimes_with_scale() {
        let args = mux_command(Path::new("joined.mp4"), &request(Some(1.5))).build_args();
        assert!(args.contains(&"setpts=1.500000*PTS".to_string()));
        assert!(!args.windows(2).any(|w| w[0] == "-c:v" && w[1] == "copy"));
    }

    #[tokio::test]
    async fn test_empty_plan_rejected() {
        let workspace = Workspace::new().unwrap();
        let request = AssemblyRequest::new("in.mp4", "song.mp3", CutPlan::empty(None), "out.mp4");
        let err = assemble(&request, &workspace, &FfmpegRunner::new()).await.unwrap_err();
        assert!(matches!(err, MediaError::EmptyPlan));
    }
}
