use crate::models::{EntityCategory, EventCategory, RelationshipType};
use crate::pipeline_config::window_label;
use crate::reference::ClinicalReference;

use super::types::{Relationship, TimelineEvent};

const TRIGGERS_CONFIDENCE: f32 = 0.8;
const LEADS_TO_CONFIDENCE: f32 = 0.7;
const PREVENTS_CONFIDENCE: f32 = 0.85;
const RESPONDS_TO_CONFIDENCE: f32 = 0.6;
const CAUSES_CONFIDENCE: f32 = 0.5;

fn relationship(
    from: &TimelineEvent,
    to: &TimelineEvent,
    kind: RelationshipType,
    confidence: f32,
    window_days: i64,
    days_between: i64,
) -> Relationship {
    Relationship {
        from_event_id: from.id,
        to_event_id: to.id,
        relationship_type: kind,
        confidence,
        time_window_label: window_label(window_days),
        days_between,
        urgent: kind == RelationshipType::Triggers,
    }
}

/// Infers relationships over dated events sorted by (timestamp, note, offset).
/// "Followed by" means later in that order; windows are inclusive calendar days.
/// A complication and a therapy on the same day always pair as TRIGGERS,
/// whichever one the note mentions first.
pub fn infer_relationships(events: &[TimelineEvent], reference: &ClinicalReference) -> Vec<Relationship> {
    let settings = &reference.settings;
    let mut out = Vec::new();

    for (i, earlier) in events.iter().enumerate() {
        for later in &events[i + 1..] {
            let Some(days) = earlier.days_until(later) else { continue };

            // Complication prompting therapy
            if earlier.is_complication() && later.is_therapeutic() && days <= settings.trigger_window_days {
                out.push(relationship(
                    earlier,
                    later,
                    RelationshipType::Triggers,
                    TRIGGERS_CONFIDENCE,
                    settings.trigger_window_days,
                    days,
                ));
            }

            // Same-day therapy written before its indication ("started X for vasospasm")
            if earlier.is_therapeutic() && later.is_complication() && days == 0 {
                out.push(relationship(
                    later,
                    earlier,
                    RelationshipType::Triggers,
                    TRIGGERS_CONFIDENCE,
                    settings.trigger_window_days,
                    days,
                ));
            }

            // Procedure followed by complication on a later day
            if earlier.is_therapeutic()
                && earlier.entity_category == EntityCategory::Procedure
                && later.is_complication()
                && days > 0
                && days <= settings.leads_to_window_days
            {
                out.push(relationship(
                    earlier,
                    later,
                    RelationshipType::LeadsTo,
                    LEADS_TO_CONFIDENCE,
                    settings.leads_to_window_days,
                    days,
                ));
            }

            // Complication cascade
            if earlier.is_complication()
                && later.is_complication()
                && days <= settings.causes_window_days
                && !reference.same_concept(&earlier.canonical_name, &later.canonical_name)
            {
                out.push(relationship(
                    earlier,
                    later,
                    RelationshipType::Causes,
                    CAUSES_CONFIDENCE,
                    settings.causes_window_days,
                    days,
                ));
            }
        }
    }

    out.extend(responds_to(events, reference));
    out.extend(prevents(events, reference));
    out
}

/// Each clinical outcome points at the nearest preceding therapy inside the window.
fn responds_to<'e>(
    events: &'e [TimelineEvent],
    reference: &'e ClinicalReference,
) -> impl Iterator<Item = Relationship> + 'e {
    let window = reference.settings.responds_to_window_days;
    events.iter().enumerate().filter_map(move |(j, outcome)| {
        if outcome.entity_category != EntityCategory::Outcome {
            return None;
        }
        events[..j].iter().rev().find_map(|therapy| {
            let days = therapy.days_until(outcome)?;
            (therapy.is_therapeutic() && days <= window).then(|| {
                relationship(
                    outcome,
                    therapy,
                    RelationshipType::RespondsTo,
                    RESPONDS_TO_CONFIDENCE,
                    window,
                    days,
                )
            })
        })
    })
}

/// Prophylactic therapy with no expected complication inside its window.
/// The target is the last event observed inside the window; with nothing
/// observed there is no evidence either way and no relationship.
fn prevents<'e>(
    events: &'e [TimelineEvent],
    reference: &'e ClinicalReference,
) -> impl Iterator<Item = Relationship> + 'e {
    events.iter().enumerate().filter_map(move |(i, agent)| {
        if !agent.is_therapeutic() {
            return None;
        }
        let rule = reference.prophylaxis_for(&agent.canonical_name)?;
        let window = rule.window_days.unwrap_or(reference.settings.prevents_window_days);

        let inside: Vec<(&TimelineEvent, i64)> = events[i + 1..]
            .iter()
            .filter_map(|e| agent.days_until(e).map(|d| (e, d)))
            .filter(|(_, d)| *d <= window)
            .collect();

        let breakthrough = inside.iter().any(|(e, _)| {
            e.category == EventCategory::Complication
                && rule
                    .expected_complications
                    .iter()
                    .any(|c| reference.same_concept(c, &e.canonical_name))
        });
        if breakthrough {
            return None;
        }

        let (target, days) = inside
            .iter()
            .rev()
            .find(|(e, _)| !reference.same_concept(&e.canonical_name, &agent.canonical_name))?;
        Some(relationship(
            agent,
            target,
            RelationshipType::Prevents,
            PREVENTS_CONFIDENCE,
            window,
            *days,
        ))
    })
}
