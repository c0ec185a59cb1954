//! Long-scene splitting on the measure grid.

use bounce_models::Scene;

/// Measures the scene spans, per [`Scene::spans`].
pub fn measures_in_scene<'a>(scene: &Scene, measures: &'a [f64]) -> &'a [f64] {
    let lo = measures.partition_point(|&m| m <= scene.start);
    let count = measures[lo..].iter().take_while(|&&m| scene.spans(m)).count();
    &measures[lo..lo + count]
}

/// Split `scene` so no piece spans more than `max_measures` measures.
///
/// Cuts are placed on every `max_measures`-th interior measure. The pieces
/// partition the original interval exactly; the last one takes whatever
/// remains. A scene within the limit comes back unchanged as a single piece.
///
/// `max_measures` must be at least 1 (validated by the caller).
pub fn split_scene(scene: &Scene, measures: &[f64], max_measures: u32) -> Vec<Scene> {
    let max = max_measures.max(1) as usize;
    let inside = measures_in_scene(scene, measures);
    if inside.len() <= max {
        return vec![*scene];
    }

    let mut pieces = Vec::with_capacity(inside.len() / max + 1);
    let mut start = scene.start;
    for &cut in inside.iter().skip(max - 1).step_by(max) {
        // A cut on the scene end would leave an empty tail.
        if cut >= scene.end {
            break;
        }
        pieces.push(Scene::new(start, cut));
        start = cut;
    }
    pieces.push(Scene::new(start, scene.end));
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(step: f64, count: usize) -> Vec<f64> {
        (0..count).map(|i| i as f64 * step).collect()
    }

    #[test]
    fn test_measures_in_scene_bounds() {
        let measures = grid(1.0, 11);
        let scene = Scene::new(2.0, 5.0);
        assert_eq!(measures_in_scene(&scene, &measures), &[3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_twenty_second_scene_into_four() {
        let measures = grid(1.0, 21);
        let pieces = split_scene(&Scene::new(0.0, 20.0), &measures, 5);
        assert_eq!(
            pieces,
            vec![
                Scene::new(0.0, 5.0),
                Scene::new(5.0, 10.0),
                Scene::new(10.0, 15.0),
                Scene::new(15.0, 20.0),
            ]
        );
        for piece in &pieces {
            assert!(measures_in_scene(piece, &measures).len() <= 5);
        }
    }

    #[test]
    fn test_remainder_goes_to_last_piece() {
        let measures = grid(1.0, 30);
        let pieces = split_scene(&Scene::new(0.5, 12.5), &measures, 5);
        assert_eq!(
            pieces,
            vec![Scene::new(0.5, 5.0), Scene::new(5.0, 10.0), Scene::new(10.0, 12.5)]
        );
    }

    #[test]
    fn test_short_scene_untouched() {
        let measures = grid(2.0, 10);
        let scene = Scene::new(1.0, 7.0);
        assert_eq!(split_scene(&scene, &measures, 4), vec![scene]);
    }

    #[test]
    fn test_split_partitions_scene() {
        let measures = grid(0.75, 200);
        let scene = Scene::new(3.2, 97.9);
        for max in 1..=12 {
            let pieces = split_scene(&scene, &measures, max);
            assert_eq!(pieces.first().unwrap().start, scene.start);
            assert_eq!(pieces.last().unwrap().end, scene.end);
            for w in pieces.windows(2) {
                assert_eq!(w[0].end, w[1].start);
            }
            for piece in &pieces {
                assert!(piece.end > piece.start);
                assert!(measures_in_scene(piece, &measures).len() <= max as usize);
            }
        }
    }
}
