//! Protocol-compliance checklist evaluation.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::models::{CanonicalEntity, EntityCategory, MilestoneKind, Pathology};
use crate::reference::{normalize_term, ClinicalReference, ProtocolItem, ProtocolRequirement};
use crate::timeline::CausalTimeline;

use super::types::{ComplianceItem, ProtocolCompliance};

/// Explicit course length written in the notes ("for 21 days", "x 14d", "21-day course").
static COURSE_LENGTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:(?:for|x)\s*(\d{1,3})\s*(?:days?|d)\b|(\d{1,3})[-\s]days?\s+course\b)").unwrap()
});

/// Evaluate the checklist configured for `pathology`. None when there is no checklist.
pub fn evaluate_protocol(
    pathology: Pathology,
    entities: &[CanonicalEntity],
    timeline: &CausalTimeline,
    reference: &ClinicalReference,
) -> Option<ProtocolCompliance> {
    let checklist = reference.protocol_for(pathology)?;
    let checker = Checker {
        entities,
        timeline,
        reference,
    };
    let items = checklist.items.iter().map(|item| checker.evaluate(item)).collect();
    Some(ProtocolCompliance { pathology, items })
}

struct Checker<'a> {
    entities: &'a [CanonicalEntity],
    timeline: &'a CausalTimeline,
    reference: &'a ClinicalReference,
}

impl Checker<'_> {
    fn evaluate(&self, item: &ProtocolItem) -> ComplianceItem {
        let (compliant, evidence) = match &item.requirement {
            ProtocolRequirement::MedicationCourse { agents, min_days } => self.medication_course(agents, *min_days),
            ProtocolRequirement::ProcedureWithin { procedures, hours } => self.procedure_within(procedures, *hours),
            ProtocolRequirement::ImagingPerformed { studies } => self.any_of(EntityCategory::Imaging, studies),
            ProtocolRequirement::ScoreDocumented { scales } => self.score_documented(scales),
            ProtocolRequirement::ConditionalProcedure {
                if_complications,
                procedures,
            } => self.conditional_procedure(if_complications, procedures),
        };
        ComplianceItem {
            id: item.id.clone(),
            description: item.description.clone(),
            importance: item.importance,
            compliant,
            evidence,
        }
    }

    fn matching<'s>(
        &'s self,
        category: EntityCategory,
        names: &'s [String],
    ) -> impl Iterator<Item = &'s CanonicalEntity> + 's {
        self.entities.iter().filter(move |e| {
            e.category == category
                && names
                    .iter()
                    .any(|n| self.reference.same_concept(n, &e.canonical_name))
        })
    }

    /// Course length: dated span of mentions and references, or an explicit length
    /// written in their sentences, whichever is longer.
    fn medication_course(&self, agents: &[String], min_days: i64) -> (bool, String) {
        let found: Vec<&CanonicalEntity> = self.matching(EntityCategory::Medication, agents).collect();
        if found.is_empty() {
            return (false, format!("{} not documented", agents.join(" / ")));
        }

        let dates: Vec<NaiveDate> = found
            .iter()
            .flat_map(|e| {
                e.date.into_iter().chain(
                    e.source_mentions
                        .iter()
                        .chain(e.references.iter())
                        .filter_map(|m| m.temporal.resolved_date),
                )
            })
            .collect();
        let span = match (dates.iter().min(), dates.iter().max()) {
            (Some(first), Some(last)) => (*last - *first).num_days() + 1,
            _ => 0,
        };
        let explicit = found
            .iter()
            .flat_map(|e| e.contexts())
            .flat_map(|ctx| COURSE_LENGTH.captures_iter(ctx))
            .filter_map(|c| c.get(1).or_else(|| c.get(2))?.as_str().parse::<i64>().ok())
            .max()
            .unwrap_or(0);

        let days = span.max(explicit);
        (
            days >= min_days,
            format!("{} documented over {} day(s)", found[0].canonical_name, days),
        )
    }

    /// Earliest matching procedure within `hours` of ictus, else admission.
    fn procedure_within(&self, procedures: &[String], hours: i64) -> (bool, String) {
        let anchor = self
            .timeline
            .milestone(MilestoneKind::Ictus)
            .or_else(|| self.timeline.milestone(MilestoneKind::Admission));
        let Some(anchor) = anchor else {
            return (false, "no ictus or admission date to measure from".to_string());
        };

        let first = self
            .matching(EntityCategory::Procedure, procedures)
            .filter_map(|e| e.date.map(|d| (d, e)))
            .min_by_key(|(d, _)| *d);
        match first {
            Some((date, entity)) => {
                let elapsed = (date - anchor.date).num_days() * 24;
                (
                    (0..=hours).contains(&elapsed),
                    format!("{} {}h after {}", entity.canonical_name, elapsed, anchor.kind),
                )
            }
            None => (false, format!("no dated {}", procedures.join(" / "))),
        }
    }

    fn any_of(&self, category: EntityCategory, names: &[String]) -> (bool, String) {
        match self.matching(category, names).next() {
            Some(e) => (true, format!("{} documented", e.canonical_name)),
            None => (false, format!("{} not documented", names.join(" / "))),
        }
    }

    fn score_documented(&self, scales: &[String]) -> (bool, String) {
        let wanted: Vec<String> = scales.iter().map(|s| normalize_term(s)).collect();
        let found = self.entities.iter().find(|e| {
            e.category == EntityCategory::FunctionalScore && wanted.contains(&normalize_term(&e.canonical_name))
        });
        match found {
            Some(e) => (true, format!("{} documented", e.label())),
            None => (false, format!("{} not documented", scales.join(" / "))),
        }
    }

    /// Not applicable (compliant) unless one of the complications occurred.
    fn conditional_procedure(&self, complications: &[String], procedures: &[String]) -> (bool, String) {
        let onset = self
            .matching(EntityCategory::Complication, complications)
            .map(|e| e.date)
            .min_by(|a, b| match (a, b) {
                (Some(x), Some(y)) => x.cmp(y),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            });
        let Some(onset) = onset else {
            return (true, format!("not applicable: no {}", complications.join(" / ")));
        };

        let done = self
            .matching(EntityCategory::Procedure, procedures)
            .find(|p| match (onset, p.date) {
                (Some(c), Some(d)) => d >= c,
                _ => true,
            });
        match done {
            Some(p) => (true, format!("{} after {}", p.canonical_name, complications.join(" / "))),
            None => (false, format!("{} without {}", complications.join(" / "), procedures.join(" / "))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{entity_id, Importance};
    use crate::pipeline::dedup::test_support::mention;
    use crate::timeline::Milestone;

    fn d(day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2025, 3, day)
    }

    fn entity(name: &str, category: EntityCategory, date: Option<NaiveDate>) -> CanonicalEntity {
        CanonicalEntity {
            id: entity_id(category, name, date, 0),
            category,
            canonical_name: name.to_string(),
            date,
            value: None,
            confidence: 0.9,
            source_mentions: vec![mention(name, category, date, 0.9, 0)],
            references: Vec::new(),
            standalone_reference: false,
        }
    }

    fn timeline_with_ictus(day: u32) -> CausalTimeline {
        CausalTimeline {
            milestones: vec![Milestone {
                kind: MilestoneKind::Ictus,
                date: d(day).unwrap(),
                event_id: None,
                description: "ictus".into(),
            }],
            ..Default::default()
        }
    }

    fn item<'c>(compliance: &'c ProtocolCompliance, id: &str) -> &'c ComplianceItem {
        compliance.items.iter().find(|i| i.id == id).unwrap()
    }

    #[test]
    fn sah_checklist_evaluation() {
        let reference = ClinicalReference::builtin().unwrap();
        let mut nimodipine = entity("nimodipine", EntityCategory::Medication, d(1));
        let mut continued = mention("nimodipine", EntityCategory::Medication, None, 0.8, 50);
        continued.temporal.resolved_date = d(21);
        nimodipine.references.push(continued);

        let entities = vec![
            nimodipine,
            entity("aneurysm coiling", EntityCategory::Procedure, d(2)),
            entity("hydrocephalus", EntityCategory::Complication, d(3)),
            entity("external ventricular drain", EntityCategory::Procedure, d(3)),
        ];
        let compliance =
            evaluate_protocol(Pathology::Sah, &entities, &timeline_with_ictus(1), &reference).unwrap();

        assert!(item(&compliance, "sah-nimodipine").compliant);
        assert!(item(&compliance, "sah-secure-aneurysm").compliant);
        assert!(!item(&compliance, "sah-tcd").compliant);
        assert!(item(&compliance, "sah-csf-diversion").compliant);
        assert!(!item(&compliance, "sah-grade").compliant);
        assert_eq!(compliance.rate(Importance::Mandatory), Some(1.0));
        assert!((compliance.rate(Importance::Recommended).unwrap() - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn short_course_and_late_procedure_fail() {
        let reference = ClinicalReference::builtin().unwrap();
        let entities = vec![
            entity("nimodipine", EntityCategory::Medication, d(1)),
            entity("aneurysm clipping", EntityCategory::Procedure, d(6)),
        ];
        let compliance =
            evaluate_protocol(Pathology::Sah, &entities, &timeline_with_ictus(1), &reference).unwrap();
        assert!(!item(&compliance, "sah-nimodipine").compliant);
        let secure = item(&compliance, "sah-secure-aneurysm");
        assert!(!secure.compliant);
        assert!(secure.evidence.contains("120h"));
    }

    #[test]
    fn explicit_course_length_counts() {
        let reference = ClinicalReference::builtin().unwrap();
        let mut nimodipine = entity("nimodipine", EntityCategory::Medication, d(1));
        nimodipine.source_mentions[0].context = "nimodipine 60 mg q4h for 21 days".into();
        let compliance =
            evaluate_protocol(Pathology::Sah, &[nimodipine], &CausalTimeline::default(), &reference).unwrap();
        assert!(item(&compliance, "sah-nimodipine").compliant);
        assert!(!item(&compliance, "sah-secure-aneurysm").compliant, "no anchor date");
    }

    #[test]
    fn conditional_item_not_applicable_without_trigger() {
        let reference = ClinicalReference::builtin().unwrap();
        let compliance =
            evaluate_protocol(Pathology::Hydrocephalus, &[], &CausalTimeline::default(), &reference).unwrap();
        assert!(compliance.items[0].compliant);
        assert!(compliance.items[0].evidence.starts_with("not applicable"));
    }

    #[test]
    fn score_documented_by_label() {
        let reference = ClinicalReference::builtin().unwrap();
        let mut gcs = entity("gcs", EntityCategory::FunctionalScore, d(1));
        gcs.value = Some(13.0);
        let compliance =
            evaluate_protocol(Pathology::Tbi, &[gcs], &CausalTimeline::default(), &reference).unwrap();
        let item = item(&compliance, "tbi-gcs");
        assert!(item.compliant);
        assert_eq!(item.evidence, "gcs 13 documented");
    }
}
