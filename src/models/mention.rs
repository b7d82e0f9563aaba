use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::enums::{EntityCategory, OffsetUnit, TemporalClass};

/// Byte span of a match inside its source note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSpan {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelativeOffset {
    pub unit: OffsetUnit,
    pub value: i64,
}

/// Temporal reading of a single mention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalContext {
    pub classification: TemporalClass,
    pub relative_offset: Option<RelativeOffset>,
    /// Absolute date of the statement, when one could be resolved.
    pub resolved_date: Option<NaiveDate>,
    /// True when an absolute date written in the text anchored the mention.
    pub explicit_date: bool,
    pub confidence: f32,
}

impl TemporalContext {
    pub fn is_reference(&self) -> bool {
        self.classification == TemporalClass::Reference
    }

    /// An offset was found but there was no reference date to resolve it against.
    pub fn is_unresolved_offset(&self) -> bool {
        self.relative_offset.is_some() && self.resolved_date.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NegationResult {
    pub is_negated: bool,
    pub confidence: f32,
    pub trigger: Option<String>,
}

impl NegationResult {
    pub fn affirmed(confidence: f32) -> Self {
        Self {
            is_negated: false,
            confidence,
            trigger: None,
        }
    }
}

/// A raw extracted mention. Immutable once produced by the extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mention {
    pub name: String,
    pub category: EntityCategory,
    pub raw_span: TextSpan,
    /// Event date. Only NEW_EVENT mentions carry one.
    pub date: Option<NaiveDate>,
    pub confidence: f32,
    pub note_index: usize,
    /// Sentence the mention was found in (clipped at sentence boundaries).
    pub context: String,
    /// Numeric value for functional-score mentions.
    pub value: Option<f64>,
    pub temporal: TemporalContext,
    pub negation: NegationResult,
}

impl Mention {
    pub fn is_reference(&self) -> bool {
        self.temporal.is_reference()
    }

    /// Position used to order mentions that share a date.
    pub fn sequence(&self) -> (usize, usize) {
        (self.note_index, self.raw_span.start)
    }
}
