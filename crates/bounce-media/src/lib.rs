//! External collaborators for the bounce pipeline.
//!
//! This crate provides:
//! - FFmpeg command building and a runner with timeouts
//! - Duration probing through FFprobe
//! - Scene detection and beat sources behind async traits
//! - Final assembly of a cut plan into a video
//! - A scoped temporary workspace for intermediate files

pub mod assemble;
pub mod beats;
pub mod command;
pub mod error;
pub mod probe;
pub mod scene_detect;
pub mod workspace;

pub use assemble::{assemble, AssemblyRequest};
pub use beats::{BeatFile, BeatSource, BeatTrack, CommandBeatTracker};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use probe::probe_duration;
pub use scene_detect::{parse_showinfo_cuts, FfmpegSceneDetector, SceneSource};
pub use workspace::Workspace;
