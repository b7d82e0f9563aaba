use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{EntityCategory, EventCategory, MilestoneKind, RelationshipType};

/// A single event on the causal timeline, built from one canonical entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub id: Uuid,
    /// None for events whose date could not be resolved.
    pub timestamp: Option<NaiveDate>,
    pub category: EventCategory,
    pub entity_category: EntityCategory,
    pub description: String,
    pub canonical_name: String,
    pub value: Option<f64>,
    pub source_entity_id: Uuid,
    pub confidence: f32,
    /// Relationships that start at this event.
    pub relationships: Vec<Relationship>,
    #[serde(skip)]
    pub(crate) sequence: (usize, usize),
}

impl TimelineEvent {
    pub fn is_therapeutic(&self) -> bool {
        self.category == EventCategory::Therapeutic
    }

    pub fn is_complication(&self) -> bool {
        self.category == EventCategory::Complication
    }

    /// Calendar days from `self` to `later`; None when either is undated.
    pub fn days_until(&self, later: &TimelineEvent) -> Option<i64> {
        Some((later.timestamp? - self.timestamp?).num_days())
    }
}

/// A directed, confidence-scored link between two events of the same timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub from_event_id: Uuid,
    pub to_event_id: Uuid,
    #[serde(rename = "type")]
    pub relationship_type: RelationshipType,
    pub confidence: f32,
    pub time_window_label: String,
    pub days_between: i64,
    /// Set on TRIGGERS: a complication prompting therapy within hours.
    #[serde(default)]
    pub urgent: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    pub kind: MilestoneKind,
    pub date: NaiveDate,
    /// Event that established the milestone; None when back-filled from reference dates.
    pub event_id: Option<Uuid>,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub earliest: NaiveDate,
    pub latest: NaiveDate,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimelineMetadata {
    pub event_count: usize,
    pub relationship_count: usize,
    pub date_range: Option<DateRange>,
    pub unresolved_count: usize,
}

/// Complete timeline payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CausalTimeline {
    /// Dated events, non-decreasing by timestamp.
    pub events: Vec<TimelineEvent>,
    /// Events whose date could not be resolved; no fixed position.
    pub unresolved_events: Vec<TimelineEvent>,
    pub milestones: Vec<Milestone>,
    pub relationships: Vec<Relationship>,
    pub metadata: TimelineMetadata,
}

impl CausalTimeline {
    pub fn event(&self, id: Uuid) -> Option<&TimelineEvent> {
        self.events.iter().find(|e| e.id == id)
    }

    pub fn milestone(&self, kind: MilestoneKind) -> Option<&Milestone> {
        self.milestones.iter().find(|m| m.kind == kind)
    }

    pub fn relationships_of(&self, kind: RelationshipType) -> impl Iterator<Item = &Relationship> {
        self.relationships
            .iter()
            .filter(move |r| r.relationship_type == kind)
    }

    /// Whether some relationship of `kind` ends at `event_id`.
    pub fn is_target_of(&self, kind: RelationshipType, event_id: Uuid) -> bool {
        self.relationships_of(kind).any(|r| r.to_event_id == event_id)
    }
}
