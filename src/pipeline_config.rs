//! Pipeline thresholds and time windows.
//!
//! Every heuristic contract of the pipeline lives here: negation scope and cut-off,
//! merge and link thresholds, relationship windows, response lookahead and the
//! functional stability band. Defaults are the reference values; a `settings.json`
//! in the reference directory may override any subset of them.

use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Tokens inspected on each side of a mention for negation triggers.
    pub negation_window_tokens: usize,
    /// Negated mentions at or above this confidence are dropped.
    pub negation_threshold: f32,
    /// Confidence multiplier applied when no pathology hint narrows the scan.
    pub no_hint_multiplier: f32,
    /// Confidence multiplier for a mention whose relative offset could not be resolved.
    pub unresolved_temporal_penalty: f32,
    /// Minimum similarity for two mentions to merge into one entity.
    pub merge_threshold: f64,
    /// Minimum similarity for a back-reference to attach to an entity.
    pub link_threshold: f64,
    /// Confidence multiplier for unlinked references promoted to standalone entities.
    pub standalone_reference_penalty: f32,
    /// COMPLICATION followed by THERAPEUTIC within this many days: TRIGGERS (48h).
    pub trigger_window_days: i64,
    /// Procedure followed by COMPLICATION within this many days: LEADS_TO.
    pub leads_to_window_days: i64,
    /// Default prophylaxis response window: PREVENTS.
    pub prevents_window_days: i64,
    /// OUTCOME after THERAPEUTIC within this many days: RESPONDS_TO.
    pub responds_to_window_days: i64,
    /// COMPLICATION followed by another COMPLICATION within this many days: CAUSES.
    pub causes_window_days: i64,
    /// Forward scan bound when pairing an intervention with its outcome.
    pub response_lookahead_days: i64,
    /// Net normalized change (points) below which a trajectory is STABLE.
    pub stability_threshold: f64,
    /// Dated samples required before a trajectory is characterized.
    pub min_trajectory_samples: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            negation_window_tokens: 6,
            negation_threshold: 0.7,
            no_hint_multiplier: 0.85,
            unresolved_temporal_penalty: 0.8,
            merge_threshold: 0.75,
            link_threshold: 0.5,
            standalone_reference_penalty: 0.6,
            trigger_window_days: 2,
            leads_to_window_days: 14,
            prevents_window_days: 21,
            responds_to_window_days: 7,
            causes_window_days: 3,
            response_lookahead_days: 14,
            stability_threshold: 10.0,
            min_trajectory_samples: 2,
        }
    }
}

/// Human-readable label for a window expressed in days ("48h", "14d").
pub fn window_label(days: i64) -> String {
    if days <= 3 {
        format!("{}h", days * 24)
    } else {
        format!("{days}d")
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
