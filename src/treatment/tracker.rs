use uuid::Uuid;

use crate::models::{EntityCategory, OutcomeKind, RelationshipType, ResponseBranch, ResponseClass};
use crate::reference::{ClinicalReference, ProphylaxisRule};
use crate::timeline::{CausalTimeline, TimelineEvent};

use super::effectiveness::{classify_response, score, ResponseObservation};
use super::types::{InterventionRef, OutcomeRef, TreatmentResponsePair};

/// Confidence factor when outcome text matched no keyword bucket.
const UNCLASSIFIED_FACTOR: f32 = 0.5;
/// Confidence factor for an absence-of-complication signal.
const ABSENCE_FACTOR: f32 = 0.85;

/// Pairs each dated therapeutic event with its outcome.
pub struct ResponseTracker<'a> {
    timeline: &'a CausalTimeline,
    reference: &'a ClinicalReference,
}

impl<'a> ResponseTracker<'a> {
    pub fn new(timeline: &'a CausalTimeline, reference: &'a ClinicalReference) -> Self {
        Self { timeline, reference }
    }

    /// Prophylactic agents not triggered by a complication take the prophylaxis
    /// branch; every other therapy takes the treatment-response branch.
    pub fn track(&self) -> Vec<TreatmentResponsePair> {
        let events = &self.timeline.events;
        let mut pairs = Vec::new();
        for (i, event) in events.iter().enumerate() {
            if !event.is_therapeutic() {
                continue;
            }
            let triggered = self.timeline.is_target_of(RelationshipType::Triggers, event.id);
            let pair = match self.reference.prophylaxis_for(&event.canonical_name) {
                Some(rule) if !triggered => self.prophylaxis_success(i, rule),
                _ => self.treatment_response(i, triggered),
            };
            pairs.extend(pair);
        }
        tracing::debug!(pairs = pairs.len(), "Tracked treatment responses");
        pairs
    }

    fn lookahead(&self) -> i64 {
        self.reference.settings.response_lookahead_days
    }

    /// Nearest later outcome or complication inside the lookahead. The
    /// complication that prompted the therapy is never its outcome.
    fn treatment_response(&self, index: usize, triggered: bool) -> Option<TreatmentResponsePair> {
        let events = &self.timeline.events;
        let intervention = &events[index];
        let indications = self.indications(intervention);
        let (outcome_index, outcome, days) =
            events.iter().enumerate().skip(index + 1).find_map(|(j, e)| {
                let days = intervention.days_until(e)?;
                let candidate = matches!(e.entity_category, EntityCategory::Outcome | EntityCategory::Complication)
                    && !indications.contains(&e.id);
                (candidate && days <= self.lookahead()).then_some((j, e, days))
            })?;

        let (class, outcome_type, factor) = if outcome.entity_category == EntityCategory::Complication {
            (ResponseClass::Worsened, OutcomeKind::ComplicationOnset, 1.0)
        } else {
            match classify_response(&outcome.canonical_name) {
                Some(class @ (ResponseClass::Improved | ResponseClass::Partial)) => {
                    (class, OutcomeKind::ClinicalImprovement, 1.0)
                }
                Some(class) => (class, OutcomeKind::ClinicalStatus, 1.0),
                None => (ResponseClass::Stable, OutcomeKind::ClinicalStatus, UNCLASSIFIED_FACTOR),
            }
        };

        let recurred = self.recurred_after(index, outcome_index, triggered);
        let adverse_effects = self.adverse_effects(index);
        let effectiveness = score(ResponseObservation {
            class,
            days_to_response: Some(days),
            recurred,
            adverse_effects: adverse_effects.len(),
        });

        Some(TreatmentResponsePair {
            intervention: intervention_ref(intervention)?,
            outcome: outcome_ref(outcome, outcome_type)?,
            classification: class,
            branch: ResponseBranch::TreatmentResponse,
            effectiveness,
            confidence: (intervention.confidence.min(outcome.confidence) * factor).clamp(0.0, 1.0),
            days_to_response: days,
            adverse_effects,
        })
    }

    /// Expected complication inside the window is a breakthrough (WORSENED);
    /// an observed window without one is success (IMPROVED).
    fn prophylaxis_success(&self, index: usize, rule: &ProphylaxisRule) -> Option<TreatmentResponsePair> {
        let events = &self.timeline.events;
        let agent = &events[index];
        let window = rule.window_days.unwrap_or(self.reference.settings.prevents_window_days);

        let inside: Vec<(&TimelineEvent, i64)> = events[index + 1..]
            .iter()
            .filter_map(|e| agent.days_until(e).map(|d| (e, d)))
            .filter(|(_, d)| *d <= window)
            .collect();

        let breakthrough = inside.iter().find(|(e, _)| {
            e.is_complication()
                && rule
                    .expected_complications
                    .iter()
                    .any(|c| self.reference.same_concept(c, &e.canonical_name))
        });

        let adverse_effects = self.adverse_effects(index);
        let (class, outcome, outcome_type, days, factor) = match breakthrough {
            Some((e, d)) => (ResponseClass::Worsened, *e, OutcomeKind::ComplicationOnset, *d, 1.0),
            None => {
                let (last, d) = inside
                    .iter()
                    .rev()
                    .find(|(e, _)| !self.reference.same_concept(&e.canonical_name, &agent.canonical_name))?;
                (ResponseClass::Improved, *last, OutcomeKind::AbsenceOfComplication, *d, ABSENCE_FACTOR)
            }
        };

        let effectiveness = score(ResponseObservation {
            class,
            days_to_response: (class == ResponseClass::Worsened).then_some(days),
            recurred: false,
            adverse_effects: adverse_effects.len(),
        });

        let mut outcome_info = outcome_ref(outcome, outcome_type)?;
        if outcome_type == OutcomeKind::AbsenceOfComplication {
            outcome_info.description = format!(
                "no {} within {} days",
                rule.expected_complications.join(" or "),
                days
            );
        }

        Some(TreatmentResponsePair {
            intervention: intervention_ref(agent)?,
            outcome: outcome_info,
            classification: class,
            branch: ResponseBranch::ProphylaxisSuccess,
            effectiveness,
            confidence: (agent.confidence.min(outcome.confidence) * factor).clamp(0.0, 1.0),
            days_to_response: days,
            adverse_effects,
        })
    }

    /// Complications with a TRIGGERS edge into `intervention`.
    fn indications(&self, intervention: &TimelineEvent) -> Vec<Uuid> {
        self.timeline
            .relationships_of(RelationshipType::Triggers)
            .filter(|r| r.to_event_id == intervention.id)
            .map(|r| r.from_event_id)
            .collect()
    }

    /// Whether the treated problem shows up again after the outcome, inside the lookahead.
    /// Triggered therapies watch their triggering complication; others watch any complication.
    fn recurred_after(&self, index: usize, outcome_index: usize, triggered: bool) -> bool {
        let events = &self.timeline.events;
        let intervention = &events[index];
        let outcome = &events[outcome_index];
        let watched: Vec<&str> = if triggered {
            self.indications(intervention)
                .into_iter()
                .filter_map(|id| self.timeline.event(id))
                .map(|e| e.canonical_name.as_str())
                .collect()
        } else {
            Vec::new()
        };

        events[outcome_index + 1..].iter().any(|e| {
            e.is_complication()
                && outcome.days_until(e).is_some_and(|d| d <= self.lookahead())
                && (watched.is_empty()
                    || watched.iter().any(|w| self.reference.same_concept(w, &e.canonical_name)))
        })
    }

    /// Configured adverse effects observed as complications after the intervention.
    fn adverse_effects(&self, index: usize) -> Vec<String> {
        let events = &self.timeline.events;
        let intervention = &events[index];
        let Some(rule) = self.reference.side_effects_for(&intervention.canonical_name) else {
            return Vec::new();
        };
        let mut seen: Vec<String> = Vec::new();
        for e in &events[index + 1..] {
            let within = intervention.days_until(e).is_some_and(|d| d <= self.lookahead());
            if !e.is_complication() || !within {
                continue;
            }
            if let Some(effect) = rule
                .adverse_effects
                .iter()
                .find(|a| self.reference.same_concept(a, &e.canonical_name))
            {
                if !seen.contains(effect) {
                    seen.push(effect.clone());
                }
            }
        }
        seen
    }
}

fn intervention_ref(event: &TimelineEvent) -> Option<InterventionRef> {
    Some(InterventionRef {
        event_id: event.id,
        intervention_type: event.entity_category,
        name: event.canonical_name.clone(),
        date: event.timestamp?,
    })
}

fn outcome_ref(event: &TimelineEvent, outcome_type: OutcomeKind) -> Option<OutcomeRef> {
    Some(OutcomeRef {
        event_id: event.id,
        outcome_type,
        date: event.timestamp?,
        description: event.description.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::infer_relationships;
    use crate::timeline::test_support::event;

    fn timeline(events: Vec<TimelineEvent>, reference: &ClinicalReference) -> CausalTimeline {
        let relationships = infer_relationships(&events, reference);
        CausalTimeline {
            events,
            relationships,
            ..Default::default()
        }
    }

    fn track(events: Vec<TimelineEvent>) -> Vec<TreatmentResponsePair> {
        let reference = ClinicalReference::builtin().unwrap();
        let timeline = timeline(events, &reference);
        ResponseTracker::new(&timeline, &reference).track()
    }

    #[test]
    fn triggered_intervention_resolves() {
        let pairs = track(vec![
            event("nimodipine", EntityCategory::Medication, 1, 0),
            event("vasospasm", EntityCategory::Complication, 7, 1),
            event("induced hypertension", EntityCategory::Intervention, 7, 2),
            event("resolved", EntityCategory::Outcome, 9, 3),
        ]);
        let ih = pairs.iter().find(|p| p.intervention.name == "induced hypertension").unwrap();
        assert_eq!(ih.branch, ResponseBranch::TreatmentResponse);
        assert_eq!(ih.classification, ResponseClass::Improved);
        assert_eq!(ih.outcome.outcome_type, OutcomeKind::ClinicalImprovement);
        assert_eq!(ih.days_to_response, 2);
        assert_eq!(ih.effectiveness.score, 95.0);

        let nimo = pairs.iter().find(|p| p.intervention.name == "nimodipine").unwrap();
        assert_eq!(nimo.branch, ResponseBranch::ProphylaxisSuccess);
        assert_eq!(nimo.classification, ResponseClass::Worsened);
        assert_eq!(nimo.outcome.outcome_type, OutcomeKind::ComplicationOnset);
    }

    #[test]
    fn indication_written_after_therapy_is_not_the_outcome() {
        let pairs = track(vec![
            event("induced hypertension", EntityCategory::Intervention, 7, 0),
            event("vasospasm", EntityCategory::Complication, 7, 1),
            event("resolved", EntityCategory::Outcome, 9, 2),
        ]);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].classification, ResponseClass::Improved);
        assert_eq!(pairs[0].outcome.description, "resolved");
        assert_eq!(pairs[0].days_to_response, 2);
    }

    #[test]
    fn prophylaxis_without_breakthrough_is_improved() {
        let pairs = track(vec![
            event("levetiracetam", EntityCategory::Medication, 1, 0),
            event("head ct", EntityCategory::Imaging, 5, 1),
        ]);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].classification, ResponseClass::Improved);
        assert_eq!(pairs[0].outcome.outcome_type, OutcomeKind::AbsenceOfComplication);
        assert!(pairs[0].outcome.description.contains("seizure"));
    }

    #[test]
    fn prophylactic_agent_triggered_by_complication_is_treatment() {
        let pairs = track(vec![
            event("seizure", EntityCategory::Complication, 3, 0),
            event("levetiracetam", EntityCategory::Medication, 3, 1),
            event("improved", EntityCategory::Outcome, 5, 2),
        ]);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].branch, ResponseBranch::TreatmentResponse);
        assert_eq!(pairs[0].classification, ResponseClass::Improved);
    }

    #[test]
    fn complication_after_procedure_is_worsened() {
        let pairs = track(vec![
            event("aneurysm clipping", EntityCategory::Procedure, 1, 0),
            event("hematoma", EntityCategory::Complication, 2, 1),
        ]);
        assert_eq!(pairs[0].classification, ResponseClass::Worsened);
        assert_eq!(pairs[0].outcome.outcome_type, OutcomeKind::ComplicationOnset);
    }

    #[test]
    fn adverse_effects_deduct_points() {
        let pairs = track(vec![
            event("vasospasm", EntityCategory::Complication, 7, 0),
            event("induced hypertension", EntityCategory::Intervention, 7, 1),
            event("improved", EntityCategory::Outcome, 8, 2),
            event("pulmonary edema", EntityCategory::Complication, 9, 3),
        ]);
        let ih = &pairs[0];
        assert_eq!(ih.adverse_effects, vec!["pulmonary edema".to_string()]);
        assert_eq!(ih.effectiveness.breakdown.side_effects, 15.0);
    }

    #[test]
    fn recurrence_reduces_durability() {
        let pairs = track(vec![
            event("vasospasm", EntityCategory::Complication, 7, 0),
            event("induced hypertension", EntityCategory::Intervention, 7, 1),
            event("improved", EntityCategory::Outcome, 8, 2),
            event("vasospasm", EntityCategory::Complication, 12, 3),
        ]);
        assert_eq!(pairs[0].effectiveness.breakdown.durability, 10.0);
    }

    #[test]
    fn nothing_after_therapy_means_no_pair() {
        assert!(track(vec![event("craniotomy", EntityCategory::Procedure, 1, 0)]).is_empty());
    }
}
