//! Cut plan models.
//!
//! A [`CutPlan`] is the only durable artifact the alignment core produces.
//! It is built once and then consumed read-only by the assembly stage.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One interval of the source timeline to extract and concatenate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CutSegment {
    /// Start in the source video, seconds
    pub start: f64,
    /// End in the source video, seconds
    pub end: f64,
}

impl CutSegment {
    /// Create a new segment.
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Ordered list of cut segments plus the duration the output must fill.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CutPlan {
    /// Segments in playback order
    pub segments: Vec<CutSegment>,

    /// Target output duration (the audio track length), if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_duration: Option<f64>,
}

impl CutPlan {
    /// Create a plan from segments.
    pub fn new(segments: Vec<CutSegment>, target_duration: Option<f64>) -> Self {
        Self {
            segments,
            target_duration,
        }
    }

    /// An empty plan.
    pub fn empty(target_duration: Option<f64>) -> Self {
        Self::new(Vec::new(), target_duration)
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether the plan has no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Total source time covered by the plan, in seconds.
    pub fn source_duration(&self) -> f64 {
        self.segments.iter().map(CutSegment::duration).sum()
    }

    /// Start of the first segment.
    pub fn start(&self) -> Option<f64> {
        self.segments.first().map(|s| s.start)
    }

    /// End of the last segment.
    pub fn end(&self) -> Option<f64> {
        self.segments.last().map(|s| s.end)
    }

    /// Whether consecutive segments touch (within `tolerance` seconds).
    pub fn is_contiguous(&self, tolerance: f64) -> bool {
        self.segments
            .windows(2)
            .all(|w| (w[1].start - w[0].end).abs() <= tolerance)
    }

    /// Iterate over segments.
    pub fn iter(&self) -> std::slice::Iter<'_, CutSegment> {
        self.segments.iter()
    }
}

impl<'a> IntoIterator for &'a CutPlan {
    type Item = &'a CutSegment;
    type IntoIter = std::slice::Iter<'a, CutSegment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}
