//! Shared data models for the Bounce pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Scenes detected in the source video
//! - Cut segments and the cut plan handed to assembly
//! - Alignment configuration and its validation
//! - Encoding configuration for the assembly stage
//! - Timestamp parsing and formatting helpers

pub mod config;
pub mod encoding;
pub mod plan;
pub mod scene;
pub mod timestamp;

// Re-export common types
pub use config::{AlignConfig, ConfigError, DEFAULT_BEATS_PER_MEASURE, DEFAULT_SCENE_THRESHOLD};
pub use encoding::EncodingConfig;
pub use plan::{CutPlan, CutSegment};
pub use scene::Scene;
pub use timestamp::{format_seconds, parse_timestamp, TimestampError};
