//! Global playback-speed factor.

use bounce_models::CutPlan;

/// Multiplier applied to presentation timestamps at assembly.
///
/// `target_duration / source_duration`: above 1 slows the cut down, below 1
/// speeds it up. `None` when the plan has no target or no content.
pub fn time_scale(plan: &CutPlan) -> Option<f64> {
    let target = plan.target_duration?;
    let source = plan.source_duration();
    if source > 0.0 && target > 0.0 {
        Some(target / source)
    } else {
        None
    }
}
