//! Boundary filter: reduce beats to downbeats.

use bounce_models::ConfigError;
use serde::Serialize;
use tracing::debug;

use crate::error::AlignResult;

/// Keep every `beats_per_measure`-th beat, starting at index 0.
///
/// The result has `ceil(beats.len() / beats_per_measure)` elements. An empty
/// beat list yields an empty measure list.
///
/// # Examples
/// ```
/// use bounce_align::filter_measures;
/// let beats = [0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 3.5];
/// assert_eq!(filter_measures(&beats, 4).unwrap(), vec![0.0, 2.0]);
/// ```
pub fn filter_measures(beats: &[f64], beats_per_measure: u32) -> AlignResult<Vec<f64>> {
    if beats_per_measure < 1 {
        return Err(ConfigError::InvalidBeatsPerMeasure(beats_per_measure).into());
    }

    let measures: Vec<f64> = beats
        .iter()
        .copied()
        .step_by(beats_per_measure as usize)
        .collect();

    debug!(
        beats = beats.len(),
        measures = measures.len(),
        beats_per_measure,
        "Filtered beats to measures"
    );

    Ok(measures)
}

/// Tempo derived from measure spacing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TempoEstimate {
    /// Mean measure length in seconds
    pub measure_duration: f64,
    /// Measures per minute
    pub measures_per_minute: f64,
    /// Beats per minute
    pub bpm: f64,
}

/// Estimate tempo from measure timestamps.
///
/// Returns `None` with fewer than two measures or a non-positive span.
pub fn estimate_tempo(measures: &[f64], beats_per_measure: u32) -> Option<TempoEstimate> {
    if measures.len() < 2 {
        return None;
    }

    // Mean of consecutive intervals telescopes to (last - first) / count.
    let intervals = (measures.len() - 1) as f64;
    let measure_duration = (measures[measures.len() - 1] - measures[0]) / intervals;
    if measure_duration <= 0.0 || !measure_duration.is_finite() {
        return None;
    }

    let measures_per_minute = 60.0 / measure_duration;
    Some(TempoEstimate {
        measure_duration,
        measures_per_minute,
        bpm: measures_per_minute * beats_per_measure as f64,
    })
}
