//! Building the scene partition from raw cut timestamps.

use bounce_models::Scene;

/// Cuts closer than this to a neighbour are treated as detector noise.
pub const DEFAULT_MIN_SCENE_GAP: f64 = 0.1;

/// Turn detected cut points into contiguous scenes covering `[0, duration)`.
///
/// Cuts are sorted and deduplicated. A cut is dropped when it lies within
/// `min_gap` of 0, of the previously kept cut, or of `duration`. A
/// non-positive duration yields no scenes.
pub fn scenes_from_cuts(cuts: &[f64], duration: f64, min_gap: f64) -> Vec<Scene> {
    if duration.is_nan() || duration <= 0.0 {
        return Vec::new();
    }

    let mut sorted: Vec<f64> = cuts.iter().copied().filter(|c| c.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);

    let mut boundaries = vec![0.0];
    for cut in sorted {
        let previous = boundaries[boundaries.len() - 1];
        if cut - previous > min_gap && duration - cut > min_gap {
            boundaries.push(cut);
        }
    }
    boundaries.push(duration);

    boundaries
        .windows(2)
        .map(|w| Scene::new(w[0], w[1]))
        .collect()
}

/// Check that scenes are ordered, non-empty and contiguous.
///
/// Returns the index of the first offending scene.
pub fn first_invalid_scene(scenes: &[Scene]) -> Option<usize> {
    for (i, scene) in scenes.iter().enumerate() {
        if !(scene.start.is_finite() && scene.end.is_finite()) || scene.end <= scene.start {
            return Some(i);
        }
        if i > 0 && scene.start < scenes[i - 1].end {
            return Some(i);
        }
    }
    None
}
