//! Causal timeline: one chronologically sorted event list built from the
//! canonical entities of every category, with milestones and fixed-window
//! relationship inference (TRIGGERS, LEADS_TO, PREVENTS, RESPONDS_TO, CAUSES).

mod builder;
mod relationships;
mod types;

pub use builder::*;
pub use relationships::*;
pub use types::*;

// ── Test support ───────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::NaiveDate;
    use uuid::Uuid;

    use super::{event_category, TimelineEvent};
    use crate::models::EntityCategory;

    /// Dated event on 2025-03-`day`; `seq` orders same-day events.
    pub(crate) fn event(name: &str, category: EntityCategory, day: u32, seq: usize) -> TimelineEvent {
        let id = Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("{name}|{day}|{seq}").as_bytes());
        TimelineEvent {
            id,
            timestamp: NaiveDate::from_ymd_opt(2025, 3, day),
            category: event_category(category, name),
            entity_category: category,
            description: name.to_string(),
            canonical_name: name.to_string(),
            value: None,
            source_entity_id: id,
            confidence: 0.9,
            relationships: Vec::new(),
            sequence: (0, seq),
        }
    }
}
