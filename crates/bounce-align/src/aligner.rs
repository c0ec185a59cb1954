//! Scene aligner: map scene boundaries onto the measure grid.
//!
//! # Pipeline
//!
//! ```text
//! scenes ──► split long scenes ──► snap interior cuts ──► drop empty ──► CutPlan
//!              (Step A)              (Step B)               (Step C)
//! ```
//!
//! The plan starts at 0 and ends at the last scene's end, or at the target
//! duration when that is shorter. The aligner never rescales time; see
//! [`crate::timing::time_scale`] for the global speed factor.

use bounce_models::{AlignConfig, ConfigError, CutPlan, CutSegment, Scene};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{AlignError, AlignResult};
use crate::scenes::first_invalid_scene;
use crate::snap::{quantize, same_at_precision, snap_to_measure};
use crate::split::split_scene;

/// Counter name for elided zero-length segments.
pub const SEGMENTS_ELIDED_TOTAL: &str = "bounce_segments_elided_total";

/// Options for a single alignment run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AlignOptions {
    /// Split scenes spanning more than this many measures.
    pub max_scene_measures: Option<u32>,
    /// Output length (audio duration). Caps the final plan end.
    pub target_duration: Option<f64>,
}

impl AlignOptions {
    /// Options with no splitting and no target duration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter for the scene length limit.
    pub fn with_max_scene_measures(mut self, max: Option<u32>) -> Self {
        self.max_scene_measures = max;
        self
    }

    /// Builder-style setter for the target duration.
    pub fn with_target_duration(mut self, duration: Option<f64>) -> Self {
        self.target_duration = duration;
        self
    }

    /// Build options from a validated [`AlignConfig`].
    pub fn from_config(config: &AlignConfig, target_duration: Option<f64>) -> AlignResult<Self> {
        config.validate()?;
        Ok(Self {
            max_scene_measures: config.max_scene_measures,
            target_duration,
        })
    }

    fn validate(&self) -> AlignResult<()> {
        if let Some(max) = self.max_scene_measures {
            if max < 1 {
                return Err(ConfigError::InvalidMaxSceneMeasures(max).into());
            }
        }
        if let Some(target) = self.target_duration {
            if !(target.is_finite() && target > 0.0) {
                return Err(AlignError::InvalidTargetDuration(target));
            }
        }
        Ok(())
    }
}

/// Non-fatal conditions met while aligning.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlignWarning {
    /// No scenes were supplied; the plan is empty.
    EmptyScenes,
    /// No measures were supplied; boundaries were left unsnapped.
    EmptyMeasures,
    /// Segments collapsed to zero length by snapping and were dropped.
    DegenerateSegments { count: usize },
    /// The source ran past the target duration and was cut at `at`.
    Truncated { at: f64, dropped_boundaries: usize },
}

impl std::fmt::Display for AlignWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyScenes => write!(f, "no scenes to align"),
            Self::EmptyMeasures => write!(f, "no measures, scene boundaries left unsnapped"),
            Self::DegenerateSegments { count } => {
                write!(f, "dropped {} zero-length segment(s) after snapping", count)
            }
            Self::Truncated {
                at,
                dropped_boundaries,
            } => write!(
                f,
                "source truncated at {:.3}s, {} boundary(ies) dropped",
                at, dropped_boundaries
            ),
        }
    }
}

/// What happened during an alignment run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AlignDiagnostics {
    /// Warnings in the order they were raised
    pub warnings: Vec<AlignWarning>,
    /// Scenes supplied by the caller
    pub scenes_in: usize,
    /// Scenes that were split into more than one piece
    pub scenes_split: usize,
    /// Pieces after splitting
    pub pieces: usize,
    /// Zero-length segments removed
    pub segments_elided: usize,
    /// Largest distance a boundary moved when snapped, seconds
    pub max_snap_shift: f64,
    /// Mean distance a boundary moved when snapped, seconds
    pub mean_snap_shift: f64,
}

impl AlignDiagnostics {
    /// Whether any warning was raised.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    fn warn(&mut self, warning: AlignWarning) {
        warn!(warning = %warning, "Alignment warning");
        self.warnings.push(warning);
    }
}

/// Result of [`align`]: the immutable plan plus diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    pub plan: CutPlan,
    pub diagnostics: AlignDiagnostics,
}

/// Align scenes to measures and produce a cut plan.
///
/// `scenes` must be ordered and non-overlapping; `measures` must be sorted.
/// Only invalid options or malformed scenes fail. Empty scenes produce an
/// empty plan and empty measures leave boundaries unsnapped, both reported
/// as warnings.
pub fn align(scenes: &[Scene], measures: &[f64], options: &AlignOptions) -> AlignResult<Alignment> {
    options.validate()?;

    let mut diagnostics = AlignDiagnostics {
        scenes_in: scenes.len(),
        ..Default::default()
    };
    // Stored at plan precision so the written plan reads back unchanged.
    let target = options.target_duration.map(quantize);

    let Some(last_scene) = scenes.last() else {
        diagnostics.warn(AlignWarning::EmptyScenes);
        return Ok(Alignment {
            plan: CutPlan::empty(target),
            diagnostics,
        });
    };

    if let Some(index) = first_invalid_scene(scenes) {
        let scene = scenes[index];
        return Err(AlignError::invalid_scene(index, scene.start, scene.end));
    }

    // Step A: split long scenes on the measure grid.
    let pieces: Vec<Scene> = match options.max_scene_measures {
        Some(max) => scenes
            .iter()
            .flat_map(|scene| {
                let parts = split_scene(scene, measures, max);
                if parts.len() > 1 {
                    diagnostics.scenes_split += 1;
                    debug!(scene = %scene, parts = parts.len(), "Split long scene");
                }
                parts
            })
            .collect(),
        None => scenes.to_vec(),
    };
    diagnostics.pieces = pieces.len();

    let source_end = quantize(last_scene.end);
    let final_end = match target {
        Some(target) if target < source_end => target,
        _ => source_end,
    };

    let mut interior: Vec<f64> = pieces[..pieces.len() - 1].iter().map(|p| p.end).collect();
    let before_cap = interior.len();
    interior.retain(|&t| t < final_end);
    if final_end < source_end {
        diagnostics.warn(AlignWarning::Truncated {
            at: final_end,
            dropped_boundaries: before_cap - interior.len(),
        });
    }

    // Step B: snap interior boundaries.
    let snapped: Vec<f64> = if measures.is_empty() {
        diagnostics.warn(AlignWarning::EmptyMeasures);
        interior.iter().map(|&t| quantize(t)).collect()
    } else {
        let snapped: Vec<f64> = interior
            .iter()
            .map(|&t| quantize(snap_to_measure(t, measures).clamp(0.0, final_end)))
            .collect();
        record_shifts(&mut diagnostics, &interior, &snapped);
        snapped
    };

    // Step C: drop boundaries that collapse onto their predecessor.
    let mut boundaries = Vec::with_capacity(snapped.len() + 2);
    boundaries.push(0.0);
    for t in snapped.iter().copied() {
        if !same_at_precision(t, boundaries[boundaries.len() - 1]) && !same_at_precision(t, final_end) {
            boundaries.push(t);
        }
    }
    if !same_at_precision(final_end, boundaries[boundaries.len() - 1]) {
        boundaries.push(final_end);
    }

    let segments: Vec<CutSegment> = boundaries
        .windows(2)
        .map(|w| CutSegment::new(w[0], w[1]))
        .collect();

    let candidate_segments = snapped.len() + 1;
    let elided = candidate_segments - segments.len();
    if elided > 0 {
        diagnostics.segments_elided = elided;
        metrics::counter!(SEGMENTS_ELIDED_TOTAL).increment(elided as u64);
        diagnostics.warn(AlignWarning::DegenerateSegments { count: elided });
    }

    info!(
        scenes = diagnostics.scenes_in,
        pieces = diagnostics.pieces,
        segments = segments.len(),
        elided,
        end = final_end,
        "Aligned scenes to measures"
    );

    Ok(Alignment {
        plan: CutPlan::new(segments, target),
        diagnostics,
    })
}

fn record_shifts(diagnostics: &mut AlignDiagnostics, raw: &[f64], snapped: &[f64]) {
    if raw.is_empty() {
        return;
    }
    let shifts = raw.iter().zip(snapped).map(|(r, s)| (r - s).abs());
    let (max, sum) = shifts.fold((0.0_f64, 0.0_f64), |(max, sum), d| (max.max(d), sum + d));
    diagnostics.max_snap_shift = max;
    diagnostics.mean_snap_shift = sum / raw.len() as f64;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segments(plan: &CutPlan) -> Vec<(f64, f64)> {
        plan.iter().map(|s| (s.start, s.end)).collect()
    }

    #[test]
    fn test_snaps_to_nearest_measure() {
        let scenes = [Scene::new(0.0, 10.0), Scene::new(10.0, 14.0)];
        let measures = [0.0, 3.0, 6.0, 9.0, 12.0];
        let result = align(&scenes, &measures, &AlignOptions::new()).unwrap();

        // 10.0 is 1s from 9 and 2s from 12.
        assert_eq!(segments(&result.plan), vec![(0.0, 9.0), (9.0, 14.0)]);
        assert!(!result.diagnostics.has_warnings());
        assert!((result.diagnostics.max_snap_shift - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_scenes_give_empty_plan() {
        let result = align(&[], &[0.0, 2.0], &AlignOptions::new()).unwrap();
        assert!(result.plan.is_empty());
        assert_eq!(result.diagnostics.warnings, vec![AlignWarning::EmptyScenes]);
    }

    #[test]
    fn test_zero_max_measures_rejected() {
        let options = AlignOptions::new().with_max_scene_measures(Some(0));
        let err = align(&[Scene::new(0.0, 5.0)], &[0.0], &options).unwrap_err();
        assert_eq!(
            err,
            AlignError::Config(ConfigError::InvalidMaxSceneMeasures(0))
        );

        // Rejected even when there is nothing to align.
        assert!(align(&[], &[], &options).is_err());
    }

    #[test]
    fn test_invalid_target_rejected() {
        let options = AlignOptions::new().with_target_duration(Some(-1.0));
        assert_eq!(
            align(&[Scene::new(0.0, 5.0)], &[], &options).unwrap_err(),
            AlignError::InvalidTargetDuration(-1.0)
        );
    }

    #[test]
    fn test_empty_measures_leave_boundaries() {
        let scenes = [Scene::new(0.0, 2.5), Scene::new(2.5, 7.25)];
        let result = align(&scenes, &[], &AlignOptions::new()).unwrap();
        assert_eq!(segments(&result.plan), vec![(0.0, 2.5), (2.5, 7.25)]);
        assert_eq!(result.diagnostics.warnings, vec![AlignWarning::EmptyMeasures]);
    }

    #[test]
    fn test_collapsed_segments_elided() {
        // Cuts at 2.9 and 3.2 both snap to 3.0.
        let scenes = [
            Scene::new(0.0, 2.9),
            Scene::new(2.9, 3.2),
            Scene::new(3.2, 8.0),
        ];
        let measures = [0.0, 3.0, 6.0];
        let result = align(&scenes, &measures, &AlignOptions::new()).unwrap();

        assert_eq!(segments(&result.plan), vec![(0.0, 3.0), (3.0, 8.0)]);
        assert_eq!(result.diagnostics.segments_elided, 1);
        assert!(result
            .diagnostics
            .warnings
            .contains(&AlignWarning::DegenerateSegments { count: 1 }));
    }

    #[test]
    fn test_first_boundary_snapping_to_zero_is_elided() {
        let scenes = [Scene::new(0.0, 0.4), Scene::new(0.4, 5.0)];
        let measures = [0.0, 4.0];
        let result = align(&scenes, &measures, &AlignOptions::new()).unwrap();
        assert_eq!(segments(&result.plan), vec![(0.0, 5.0)]);
    }

    #[test]
    fn test_snap_past_end_is_clamped() {
        // 9.9 snaps to 10.1, beyond the 10.0 end, and collapses into it.
        let scenes = [Scene::new(0.0, 9.9), Scene::new(9.9, 10.0)];
        let measures = [0.0, 5.0, 10.1];
        let result = align(&scenes, &measures, &AlignOptions::new()).unwrap();
        assert_eq!(segments(&result.plan), vec![(0.0, 10.0)]);
    }

    #[test]
    fn test_split_then_snap() {
        let scenes = [Scene::new(0.0, 20.0)];
        let measures: Vec<f64> = (0..=20).map(|i| i as f64).collect();
        let options = AlignOptions::new().with_max_scene_measures(Some(5));
        let result = align(&scenes, &measures, &options).unwrap();

        assert_eq!(
            segments(&result.plan),
            vec![(0.0, 5.0), (5.0, 10.0), (10.0, 15.0), (15.0, 20.0)]
        );
        assert_eq!(result.diagnostics.scenes_split, 1);
        assert_eq!(result.diagnostics.pieces, 4);
    }

    #[test]
    fn test_target_duration_caps_end() {
        let scenes = [
            Scene::new(0.0, 4.0),
            Scene::new(4.0, 8.0),
            Scene::new(8.0, 12.0),
        ];
        let measures = [0.0, 2.0, 4.0, 6.0, 8.0, 10.0];
        let options = AlignOptions::new().with_target_duration(Some(7.0));
        let result = align(&scenes, &measures, &options).unwrap();

        assert_eq!(segments(&result.plan), vec![(0.0, 4.0), (4.0, 7.0)]);
        assert_eq!(result.plan.target_duration, Some(7.0));
        assert_eq!(
            result.diagnostics.warnings,
            vec![AlignWarning::Truncated {
                at: 7.0,
                dropped_boundaries: 1
            }]
        );
    }

    #[test]
    fn test_longer_target_keeps_source_end() {
        let scenes = [Scene::new(0.0, 4.0)];
        let options = AlignOptions::new().with_target_duration(Some(30.0));
        let result = align(&scenes, &[0.0, 2.0], &options).unwrap();
        assert_eq!(segments(&result.plan), vec![(0.0, 4.0)]);
        assert!(!result.diagnostics.has_warnings());
    }

    #[test]
    fn test_overlapping_scenes_rejected() {
        let scenes = [Scene::new(0.0, 5.0), Scene::new(4.0, 8.0)];
        assert!(matches!(
            align(&scenes, &[0.0], &AlignOptions::new()),
            Err(AlignError::InvalidScene { index: 1, .. })
        ));
    }

    #[test]
    fn test_midpoint_boundary_takes_earlier_measure() {
        let scenes = [Scene::new(0.0, 4.5), Scene::new(4.5, 9.0)];
        let measures = [0.0, 3.0, 6.0];
        let result = align(&scenes, &measures, &AlignOptions::new()).unwrap();
        assert_eq!(segments(&result.plan), vec![(0.0, 3.0), (3.0, 9.0)]);
    }

    #[test]
    fn test_sub_microsecond_end_is_not_truncation() {
        let scenes = [Scene::new(0.0, 5.0), Scene::new(5.0, 10.0000004)];
        let measures = [0.0, 5.0, 10.0];
        let result = align(&scenes, &measures, &AlignOptions::new()).unwrap();
        assert_eq!(segments(&result.plan), vec![(0.0, 5.0), (5.0, 10.0)]);
        assert!(!result.diagnostics.has_warnings());
    }

    #[test]
    fn test_probed_target_round_trips() {
        let scenes = [Scene::new(0.0, 10.0), Scene::new(10.0, 200.0)];
        let measures = [0.0, 3.0, 6.0, 9.0, 12.0];
        let options = AlignOptions::new().with_target_duration(Some(180.0204081632653));
        let plan = align(&scenes, &measures, &options).unwrap().plan;

        assert_eq!(plan.target_duration, Some(180.020408));
        assert_eq!(segments(&plan), vec![(0.0, 9.0), (9.0, 180.020408)]);
        let back = crate::serializer::read_plan(&crate::serializer::write_plan(&plan)).unwrap();
        assert_eq!(back, plan);
        assert_eq!(crate::timing::time_scale(&back), crate::timing::time_scale(&plan));
    }

    #[test]
    fn test_options_from_config() {
        let config = AlignConfig::default().with_max_scene_measures(Some(8));
        let options = AlignOptions::from_config(&config, Some(60.0)).unwrap();
        assert_eq!(options.max_scene_measures, Some(8));
        assert_eq!(options.target_duration, Some(60.0));

        let bad = AlignConfig::default().with_beats_per_measure(0);
        assert!(AlignOptions::from_config(&bad, None).is_err());
    }
}
