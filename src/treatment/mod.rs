//! Treatment-response tracking: pairs each therapeutic event with the outcome
//! that followed it, scores effectiveness, and checks the pathology protocol.

mod effectiveness;
mod protocol;
mod tracker;
mod types;

pub use effectiveness::*;
pub use protocol::*;
pub use tracker::*;
pub use types::*;

use std::collections::BTreeMap;

use crate::models::{CanonicalEntity, Importance, Pathology};
use crate::reference::ClinicalReference;
use crate::timeline::CausalTimeline;

/// Track responses on the timeline and evaluate the protocol for `pathology`.
pub fn analyze_treatment(
    timeline: &CausalTimeline,
    entities: &[CanonicalEntity],
    pathology: Option<Pathology>,
    reference: &ClinicalReference,
) -> TreatmentReport {
    let responses = ResponseTracker::new(timeline, reference).track();
    let protocol_compliance =
        pathology.and_then(|p| evaluate_protocol(p, entities, timeline, reference));
    let summary = summarize(&responses, protocol_compliance.as_ref());

    tracing::debug!(
        responses = responses.len(),
        protocol = protocol_compliance.is_some(),
        "Treatment analysis complete"
    );

    TreatmentReport {
        responses,
        protocol_compliance,
        summary,
    }
}

fn summarize(responses: &[TreatmentResponsePair], compliance: Option<&ProtocolCompliance>) -> TreatmentSummary {
    let mut by_classification = BTreeMap::new();
    for pair in responses {
        *by_classification.entry(pair.classification).or_insert(0) += 1;
    }

    let mean_effectiveness = if responses.is_empty() {
        None
    } else {
        Some(responses.iter().map(|r| r.effectiveness.score).sum::<f64>() / responses.len() as f64)
    };

    // Ties keep the earliest intervention.
    let best_responder = responses
        .iter()
        .fold(None::<&TreatmentResponsePair>, |best, pair| match best {
            Some(b) if b.effectiveness.score >= pair.effectiveness.score => Some(b),
            _ => Some(pair),
        })
        .map(|pair| pair.intervention.name.clone());

    TreatmentSummary {
        total_responses: responses.len(),
        by_classification,
        mean_effectiveness,
        best_responder,
        mandatory_compliance_rate: compliance.and_then(|c| c.rate(Importance::Mandatory)),
        recommended_compliance_rate: compliance.and_then(|c| c.rate(Importance::Recommended)),
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
