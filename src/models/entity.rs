use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::EntityCategory;
use super::mention::Mention;

/// Deduplicated representation of one or more mentions of the same clinical fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEntity {
    pub id: Uuid,
    pub category: EntityCategory,
    pub canonical_name: String,
    pub date: Option<NaiveDate>,
    pub value: Option<f64>,
    pub confidence: f32,
    pub source_mentions: Vec<Mention>,
    /// Back-references attached by the reference linker.
    #[serde(default)]
    pub references: Vec<Mention>,
    /// Set when an unlinked reference was promoted to an entity of its own.
    #[serde(default)]
    pub standalone_reference: bool,
}

impl CanonicalEntity {
    /// Earliest (note, offset) position over all source mentions.
    pub fn sequence(&self) -> (usize, usize) {
        self.source_mentions
            .iter()
            .map(Mention::sequence)
            .min()
            .unwrap_or((usize::MAX, usize::MAX))
    }

    /// Canonical name followed by every distinct source mention name.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.canonical_name.as_str())
            .chain(self.source_mentions.iter().map(|m| m.name.as_str()))
    }

    /// Sentences of every mention and reference, for keyword scans downstream.
    pub fn contexts(&self) -> impl Iterator<Item = &str> {
        self.source_mentions
            .iter()
            .chain(self.references.iter())
            .map(|m| m.context.as_str())
    }

    /// Display label: canonical name plus score value when present.
    pub fn label(&self) -> String {
        match self.value {
            Some(v) if v.fract() == 0.0 => format!("{} {}", self.canonical_name, v as i64),
            Some(v) => format!("{} {v:.1}", self.canonical_name),
            None => self.canonical_name.clone(),
        }
    }
}

/// Deterministic id: same category, name, anchor and ordinal give the same id.
pub fn entity_id(
    category: EntityCategory,
    canonical_name: &str,
    date: Option<NaiveDate>,
    ordinal: usize,
) -> Uuid {
    let date_part = date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "undated".to_string());
    let key = format!("{}|{}|{}|{}", category.as_str(), canonical_name, date_part, ordinal);
    Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes())
}
