//! Error types for alignment and plan parsing.

use bounce_models::ConfigError;
use thiserror::Error;

/// Result type for alignment operations.
pub type AlignResult<T> = Result<T, AlignError>;

/// Errors raised by the alignment core.
///
/// Only configuration problems are fatal. Empty inputs and degenerate
/// segments are reported as warnings on the returned diagnostics.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AlignError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid scene {index}: [{start}, {end})")]
    InvalidScene { index: usize, start: f64, end: f64 },

    #[error("target duration must be positive and finite, got {0}")]
    InvalidTargetDuration(f64),
}

impl AlignError {
    /// Create an invalid scene error.
    pub fn invalid_scene(index: usize, start: f64, end: f64) -> Self {
        Self::InvalidScene { index, start, end }
    }
}

/// Errors from reading a serialized cut plan.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanParseError {
    #[error("line {line}: expected 2 fields (start end), found {found}")]
    FieldCount { line: usize, found: usize },

    #[error("line {line}: invalid number '{value}'")]
    InvalidNumber { line: usize, value: String },

    #[error("line {line}: timestamps must be finite and non-negative")]
    OutOfRange { line: usize },

    #[error("line {line}: segment end {end} is not after start {start}")]
    EmptySegment { line: usize, start: f64, end: f64 },

    #[error("line {line}: segment starting at {start} overlaps previous end {previous_end}")]
    Overlap {
        line: usize,
        start: f64,
        previous_end: f64,
    },

    #[error("invalid target duration '{0}'")]
    InvalidTargetDuration(String),
}

impl PlanParseError {
    /// Line number the error refers to, if any.
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::FieldCount { line, .. }
            | Self::InvalidNumber { line, .. }
            | Self::OutOfRange { line }
            | Self::EmptySegment { line, .. }
            | Self::Overlap { line, .. } => Some(*line),
            Self::InvalidTargetDuration(_) => None,
        }
    }
}
