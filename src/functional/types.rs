use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ChangeDirection, RateClass, Significance, TrajectoryPattern, TrendShape};

/// One dated functional-score observation, normalized to 0–100 with higher = better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionalScoreSample {
    pub score_type: String,
    pub raw_value: f64,
    pub normalized_value: f64,
    pub timestamp: NaiveDate,
    pub context: String,
    pub source_entity_id: Uuid,
}

/// Change between two adjacent samples of the same scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub score_type: String,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    pub from_value: f64,
    pub to_value: f64,
    /// Normalized points, positive = better.
    pub change: f64,
    pub direction: ChangeDirection,
    pub significance: Significance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub pattern: TrajectoryPattern,
    pub trend: TrendShape,
    pub rate: RateClass,
    /// Last minus first composite value.
    pub overall_change: f64,
    pub duration_days: i64,
    /// Normalized points per week.
    pub points_per_week: f64,
    pub confidence: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionalMilestones {
    /// First sample on or after admission.
    pub baseline: Option<FunctionalScoreSample>,
    /// Worst normalized sample.
    pub nadir: Option<FunctionalScoreSample>,
    /// Last sample on or before discharge.
    pub discharge: Option<FunctionalScoreSample>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrognosticComparison {
    pub score_type: String,
    pub expected_raw: f64,
    pub expected_normalized: f64,
    pub actual_raw: f64,
    pub actual_normalized: f64,
    /// Actual minus expected, normalized points.
    pub variance: f64,
    pub outperformed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionalSummary {
    pub sample_count: usize,
    pub scales: Vec<String>,
    pub baseline_value: Option<f64>,
    pub latest_value: Option<f64>,
    pub overall_change: Option<f64>,
    pub significant_changes: usize,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionalReport {
    pub has_data: bool,
    pub score_timeline: Vec<FunctionalScoreSample>,
    pub status_changes: Vec<StatusChange>,
    pub trajectory: Option<Trajectory>,
    pub milestones: FunctionalMilestones,
    pub prognostic_comparison: Option<PrognosticComparison>,
    pub summary: FunctionalSummary,
}

impl FunctionalReport {
    /// Report for a record without enough samples; the collected samples are kept.
    pub fn insufficient(score_timeline: Vec<FunctionalScoreSample>) -> Self {
        let summary = FunctionalSummary {
            sample_count: score_timeline.len(),
            text: format!("{} functional sample(s): not enough to characterize", score_timeline.len()),
            ..Default::default()
        };
        Self {
            has_data: false,
            score_timeline,
            summary,
            ..Default::default()
        }
    }
}
