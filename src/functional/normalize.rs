//! Scale normalization and change significance.

use crate::models::{ChangeDirection, ScoreDirection, Significance};
use crate::reference::ScaleDefinition;

/// Map a raw score onto 0–100 where higher is always better.
pub fn normalize(scale: &ScaleDefinition, raw: f64) -> f64 {
    let span = scale.max - scale.min;
    if span <= 0.0 {
        return 0.0;
    }
    let fraction = match scale.direction {
        ScoreDirection::HigherIsBetter => (raw - scale.min) / span,
        ScoreDirection::LowerIsBetter => (scale.max - raw) / span,
    };
    (fraction * 100.0).clamp(0.0, 100.0)
}

/// Bands in percent of range: minimal <5, minor 5–14, moderate 15–29, major ≥30.
pub fn significance(change: f64) -> Significance {
    let magnitude = change.abs();
    if magnitude < 5.0 {
        Significance::Minimal
    } else if magnitude < 15.0 {
        Significance::Minor
    } else if magnitude < 30.0 {
        Significance::Moderate
    } else {
        Significance::Major
    }
}

/// Minimal changes read as unchanged.
pub fn change_direction(change: f64) -> ChangeDirection {
    match significance(change) {
        Significance::Minimal => ChangeDirection::Unchanged,
        _ if change > 0.0 => ChangeDirection::Improvement,
        _ => ChangeDirection::Deterioration,
    }
}
