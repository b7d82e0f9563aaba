use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::{CanonicalEntity, EntityCategory, EventCategory, MilestoneKind};
use crate::pipeline::types::ReferenceDates;
use crate::reference::ClinicalReference;

use super::relationships::infer_relationships;
use super::types::*;

/// Timeline category of an entity. Discharge is an outcome; other key events are diagnostic.
pub fn event_category(category: EntityCategory, name: &str) -> EventCategory {
    match category {
        EntityCategory::Procedure | EntityCategory::Intervention | EntityCategory::Medication => {
            EventCategory::Therapeutic
        }
        EntityCategory::Complication => EventCategory::Complication,
        EntityCategory::Outcome => EventCategory::Outcome,
        EntityCategory::KeyEvent if name == MilestoneKind::Discharge.as_str() => EventCategory::Outcome,
        EntityCategory::Imaging | EntityCategory::FunctionalScore | EntityCategory::KeyEvent => {
            EventCategory::Diagnostic
        }
    }
}

fn to_event(entity: &CanonicalEntity) -> TimelineEvent {
    TimelineEvent {
        id: Uuid::new_v5(&entity.id, b"timeline-event"),
        timestamp: entity.date,
        category: event_category(entity.category, &entity.canonical_name),
        entity_category: entity.category,
        description: entity.label(),
        canonical_name: entity.canonical_name.clone(),
        value: entity.value,
        source_entity_id: entity.id,
        confidence: entity.confidence,
        relationships: Vec::new(),
        sequence: entity.sequence(),
    }
}

/// Aggregate entities of every category into one causal timeline.
pub fn build_timeline(
    entities: &[CanonicalEntity],
    dates: &ReferenceDates,
    reference: &ClinicalReference,
) -> CausalTimeline {
    let (mut events, mut unresolved): (Vec<_>, Vec<_>) =
        entities.iter().map(to_event).partition(|e| e.timestamp.is_some());
    events.sort_by_key(|e| (e.timestamp, e.sequence));
    unresolved.sort_by_key(|e| e.sequence);

    let relationships = infer_relationships(&events, reference);
    for event in &mut events {
        event.relationships = relationships
            .iter()
            .filter(|r| r.from_event_id == event.id)
            .cloned()
            .collect();
    }

    let milestones = identify_milestones(&events, dates);
    let metadata = TimelineMetadata {
        event_count: events.len(),
        relationship_count: relationships.len(),
        date_range: match (events.first(), events.last()) {
            (Some(first), Some(last)) => first
                .timestamp
                .zip(last.timestamp)
                .map(|(earliest, latest)| DateRange { earliest, latest }),
            _ => None,
        },
        unresolved_count: unresolved.len(),
    };

    tracing::debug!(
        events = metadata.event_count,
        relationships = metadata.relationship_count,
        unresolved = metadata.unresolved_count,
        "Built causal timeline"
    );

    CausalTimeline {
        events,
        unresolved_events: unresolved,
        milestones,
        relationships,
        metadata,
    }
}

/// First occurrence of each milestone; reference dates fill the ones with no event.
fn identify_milestones(events: &[TimelineEvent], dates: &ReferenceDates) -> Vec<Milestone> {
    let key_event = |kind: MilestoneKind| {
        move |e: &&TimelineEvent| {
            e.entity_category == EntityCategory::KeyEvent && e.canonical_name == kind.as_str()
        }
    };

    let candidates: [(MilestoneKind, Option<&TimelineEvent>, Option<NaiveDate>); 5] = [
        (MilestoneKind::Ictus, events.iter().find(key_event(MilestoneKind::Ictus)), dates.ictus),
        (
            MilestoneKind::Admission,
            events.iter().find(key_event(MilestoneKind::Admission)),
            dates.admission,
        ),
        (
            MilestoneKind::FirstTherapeutic,
            events
                .iter()
                .find(|e| e.is_therapeutic() && e.entity_category == EntityCategory::Procedure),
            dates.first_procedure(),
        ),
        (
            MilestoneKind::FirstComplication,
            events.iter().find(|e| e.is_complication()),
            None,
        ),
        (
            MilestoneKind::Discharge,
            events.iter().find(key_event(MilestoneKind::Discharge)),
            dates.discharge,
        ),
    ];

    candidates
        .into_iter()
        .filter_map(|(kind, event, fallback)| match event {
            Some(e) => Some(Milestone {
                kind,
                date: e.timestamp?,
                event_id: Some(e.id),
                description: e.description.clone(),
            }),
            None => fallback.map(|date| Milestone {
                kind,
                date,
                event_id: None,
                description: format!("{} (reference date)", kind.as_str()),
            }),
        })
        .collect()
}
