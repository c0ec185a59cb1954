//! Bounce: cut a video to the beat of a song.
//!
//! This crate provides:
//! - Environment configuration for the pipeline
//! - Stage orchestration for full runs and single stages
//! - Structured stage logging

pub mod config;
pub mod logging;
pub mod pipeline;

pub use config::PipelineConfig;
pub use logging::StageLogger;
pub use pipeline::{load_measures, load_plan, Pipeline, RunRequest, RunSummary};
