//! Functional-status evolution: normalized score series, status changes,
//! trajectory, milestones and prognostic comparison.

mod normalize;
mod trajectory;
mod types;

pub use normalize::*;
pub use trajectory::*;
pub use types::*;

use std::collections::BTreeMap;

use crate::models::{CanonicalEntity, EntityCategory, MilestoneKind, Significance};
use crate::pipeline::PrognosticExpectation;
use crate::reference::ClinicalReference;
use crate::timeline::CausalTimeline;

/// Build the functional report from functional-score entities.
///
/// Only dated entities with a value on a configured scale become samples.
/// Admission and discharge milestones on the timeline bound the baseline and
/// discharge samples.
pub fn analyze_functional(
    entities: &[CanonicalEntity],
    timeline: &CausalTimeline,
    expectation: Option<&PrognosticExpectation>,
    reference: &ClinicalReference,
) -> FunctionalReport {
    let samples = collect_samples(entities, reference);
    let settings = &reference.settings;
    let series = composite_series(&samples);
    // Samples sharing a date collapse into one composite point.
    if series.len() < settings.min_trajectory_samples.max(2) {
        tracing::debug!(
            samples = samples.len(),
            dates = series.len(),
            "Too few functional samples for a trajectory"
        );
        return FunctionalReport::insufficient(samples);
    }

    let status_changes = status_changes(&samples);
    let trajectory = characterize(&series, settings.stability_threshold, samples.len());
    let milestones = milestones(&samples, timeline);
    let prognostic_comparison =
        expectation.and_then(|e| compare_prognosis(e, &samples, &milestones, reference));
    let summary = summarize(&samples, &status_changes, trajectory.as_ref(), &milestones);

    tracing::debug!(
        samples = samples.len(),
        changes = status_changes.len(),
        pattern = ?trajectory.as_ref().map(|t| t.pattern),
        "Functional analysis complete"
    );

    FunctionalReport {
        has_data: true,
        score_timeline: samples,
        status_changes,
        trajectory,
        milestones,
        prognostic_comparison,
        summary,
    }
}

fn collect_samples(entities: &[CanonicalEntity], reference: &ClinicalReference) -> Vec<FunctionalScoreSample> {
    let mut scored: Vec<(FunctionalScoreSample, (usize, usize))> = entities
        .iter()
        .filter(|e| e.category == EntityCategory::FunctionalScore)
        .filter_map(|e| {
            let scale = reference.scales.get(&e.canonical_name)?;
            let raw = e.value?;
            let sample = FunctionalScoreSample {
                score_type: scale.name.clone(),
                raw_value: raw,
                normalized_value: normalize(scale, raw),
                timestamp: e.date?,
                context: e.contexts().next().unwrap_or_default().to_string(),
                source_entity_id: e.id,
            };
            Some((sample, e.sequence()))
        })
        .collect();
    scored.sort_by(|(a, sa), (b, sb)| a.timestamp.cmp(&b.timestamp).then(sa.cmp(sb)));
    scored.into_iter().map(|(sample, _)| sample).collect()
}

/// Adjacent same-scale pairs, in date order per scale.
fn status_changes(samples: &[FunctionalScoreSample]) -> Vec<StatusChange> {
    let mut by_scale: BTreeMap<&str, Vec<&FunctionalScoreSample>> = BTreeMap::new();
    for sample in samples {
        by_scale.entry(sample.score_type.as_str()).or_default().push(sample);
    }

    let mut changes: Vec<StatusChange> = by_scale
        .values()
        .flat_map(|series| series.windows(2))
        .map(|pair| {
            let (from, to) = (pair[0], pair[1]);
            let change = to.normalized_value - from.normalized_value;
            StatusChange {
                score_type: from.score_type.clone(),
                from_date: from.timestamp,
                to_date: to.timestamp,
                from_value: from.normalized_value,
                to_value: to.normalized_value,
                change,
                direction: change_direction(change),
                significance: significance(change),
            }
        })
        .collect();
    changes.sort_by(|a, b| a.to_date.cmp(&b.to_date).then_with(|| a.score_type.cmp(&b.score_type)));
    changes
}

fn milestones(samples: &[FunctionalScoreSample], timeline: &CausalTimeline) -> FunctionalMilestones {
    let admission = timeline.milestone(MilestoneKind::Admission).map(|m| m.date);
    let discharge = timeline.milestone(MilestoneKind::Discharge).map(|m| m.date);

    let baseline = admission
        .and_then(|date| samples.iter().find(|s| s.timestamp >= date))
        .or_else(|| samples.first());
    let at_discharge = discharge
        .and_then(|date| samples.iter().rev().find(|s| s.timestamp <= date))
        .or_else(|| samples.last());
    // First of equally bad samples.
    let nadir = samples.iter().fold(None::<&FunctionalScoreSample>, |worst, s| match worst {
        Some(w) if w.normalized_value <= s.normalized_value => Some(w),
        _ => Some(s),
    });

    FunctionalMilestones {
        baseline: baseline.cloned(),
        nadir: nadir.cloned(),
        discharge: at_discharge.cloned(),
    }
}

/// Compare the expected value with the discharge-time sample of the same scale.
fn compare_prognosis(
    expectation: &PrognosticExpectation,
    samples: &[FunctionalScoreSample],
    milestones: &FunctionalMilestones,
    reference: &ClinicalReference,
) -> Option<PrognosticComparison> {
    let Some(scale) = reference.scales.get(&expectation.scale) else {
        tracing::warn!(scale = %expectation.scale, "Prognostic expectation names an unknown scale");
        return None;
    };
    let cutoff = milestones.discharge.as_ref().map(|s| s.timestamp);
    let actual = samples
        .iter()
        .rev()
        .filter(|s| s.score_type == scale.name)
        .find(|s| cutoff.map_or(true, |c| s.timestamp <= c))?;

    let expected_normalized = normalize(scale, expectation.value);
    let variance = actual.normalized_value - expected_normalized;
    Some(PrognosticComparison {
        score_type: scale.name.clone(),
        expected_raw: expectation.value,
        expected_normalized,
        actual_raw: actual.raw_value,
        actual_normalized: actual.normalized_value,
        variance,
        outperformed: variance > 0.0,
    })
}

fn summarize(
    samples: &[FunctionalScoreSample],
    changes: &[StatusChange],
    trajectory: Option<&Trajectory>,
    milestones: &FunctionalMilestones,
) -> FunctionalSummary {
    let mut scales: Vec<String> = samples.iter().map(|s| s.score_type.clone()).collect();
    scales.sort();
    scales.dedup();

    let significant_changes = changes
        .iter()
        .filter(|c| c.significance >= Significance::Moderate)
        .count();
    let text = match trajectory {
        Some(t) => format!(
            "{} sample(s) over {} day(s) ({}): {} {}, {:+.1} points, {}",
            samples.len(),
            t.duration_days,
            scales.join(", "),
            t.pattern,
            t.trend,
            t.overall_change,
            t.rate
        ),
        None => format!("{} sample(s) on a single day ({})", samples.len(), scales.join(", ")),
    };

    FunctionalSummary {
        sample_count: samples.len(),
        scales,
        baseline_value: milestones.baseline.as_ref().map(|s| s.normalized_value),
        latest_value: samples.last().map(|s| s.normalized_value),
        overall_change: trajectory.map(|t| t.overall_change),
        significant_changes,
        text,
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
