use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{EntityCategory, Importance, OutcomeKind, Pathology, ResponseBranch, ResponseClass};

// ═══════════════════════════════════════════
// Response pairs
// ═══════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterventionRef {
    pub event_id: Uuid,
    #[serde(rename = "type")]
    pub intervention_type: EntityCategory,
    pub name: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRef {
    /// Event that carried the outcome. For an absence-of-complication outcome this
    /// is the last event observed inside the window.
    pub event_id: Uuid,
    #[serde(rename = "type")]
    pub outcome_type: OutcomeKind,
    pub date: NaiveDate,
    pub description: String,
}

/// Four sub-scores, each in [0, 25].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EffectivenessBreakdown {
    pub speed: f64,
    pub completeness: f64,
    pub durability: f64,
    pub side_effects: f64,
}

impl EffectivenessBreakdown {
    pub fn total(&self) -> f64 {
        (self.speed + self.completeness + self.durability + self.side_effects).clamp(0.0, 100.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Effectiveness {
    /// Sum of the breakdown, in [0, 100].
    pub score: f64,
    pub breakdown: EffectivenessBreakdown,
}

impl From<EffectivenessBreakdown> for Effectiveness {
    fn from(breakdown: EffectivenessBreakdown) -> Self {
        Self {
            score: breakdown.total(),
            breakdown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentResponsePair {
    pub intervention: InterventionRef,
    pub outcome: OutcomeRef,
    pub classification: ResponseClass,
    pub branch: ResponseBranch,
    pub effectiveness: Effectiveness,
    pub confidence: f32,
    pub days_to_response: i64,
    /// Configured adverse effects observed after the intervention.
    pub adverse_effects: Vec<String>,
}

// ═══════════════════════════════════════════
// Protocol compliance
// ═══════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceItem {
    pub id: String,
    pub description: String,
    pub importance: Importance,
    pub compliant: bool,
    /// What was (or was not) found in the record.
    pub evidence: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolCompliance {
    pub pathology: Pathology,
    pub items: Vec<ComplianceItem>,
}

impl ProtocolCompliance {
    /// Share of compliant items with the given importance; None when there are none.
    pub fn rate(&self, importance: Importance) -> Option<f64> {
        let items: Vec<_> = self.items.iter().filter(|i| i.importance == importance).collect();
        if items.is_empty() {
            return None;
        }
        Some(items.iter().filter(|i| i.compliant).count() as f64 / items.len() as f64)
    }
}

// ═══════════════════════════════════════════
// Report
// ═══════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TreatmentSummary {
    pub total_responses: usize,
    pub by_classification: BTreeMap<ResponseClass, usize>,
    pub mean_effectiveness: Option<f64>,
    pub best_responder: Option<String>,
    pub mandatory_compliance_rate: Option<f64>,
    pub recommended_compliance_rate: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TreatmentReport {
    pub responses: Vec<TreatmentResponsePair>,
    pub protocol_compliance: Option<ProtocolCompliance>,
    pub summary: TreatmentSummary,
}

impl TreatmentReport {
    pub fn has_data(&self) -> bool {
        !self.responses.is_empty() || self.protocol_compliance.is_some()
    }
}
