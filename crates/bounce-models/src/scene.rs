//! Scene model.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A half-open interval `[start, end)` of the source video timeline.
///
/// Scenes produced by a scene source are contiguous, non-overlapping and
/// cover the whole source duration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Scene {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
}

impl Scene {
    /// Create a new scene.
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Duration in seconds (never negative).
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    /// Whether `t` lies in `(start, end]`.
    ///
    /// This is the membership rule used when counting the measures a scene spans.
    pub fn spans(&self, t: f64) -> bool {
        t > self.start && t <= self.end
    }
}

impl std::fmt::Display for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:.3}s, {:.3}s)", self.start, self.end)
    }
}
