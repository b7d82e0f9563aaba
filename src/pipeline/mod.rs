//! Clinical narrative pipeline orchestrator.
//!
//! Single entry point that drives every stage in order:
//! extract → deduplicate → link references → causal timeline →
//! treatment response / functional trajectory.
//!
//! No stage fails the run. Degradations are recorded in the
//! [`QualityReport`] and the affected sub-result comes back empty.

pub mod classify;
pub mod dedup;
pub mod extraction;
pub mod types;

pub use classify::{KeywordPathologyClassifier, PathologyClassifier};
pub use types::*;

use std::collections::BTreeMap;

use crate::functional::analyze_functional;
use crate::models::{CanonicalEntity, EntityCategory, Mention, Pathology};
use crate::reference::ClinicalReference;
use crate::timeline::build_timeline;
use crate::treatment::analyze_treatment;

use dedup::{standalone_entity, Deduplicator, ReferenceLinker, SynonymSimilarity};
use extraction::EntityExtractor;

/// Run the pipeline with the caller's pathology hint (or none).
pub fn run_pipeline(input: &PipelineInput, reference: &ClinicalReference) -> PipelineOutput {
    run(input, input.pathology_hint, reference)
}

/// Run the pipeline; when the caller supplied no hint, ask `classifier` for one.
pub fn run_pipeline_with_classifier(
    input: &PipelineInput,
    reference: &ClinicalReference,
    classifier: &dyn PathologyClassifier,
) -> PipelineOutput {
    let pathology = input.pathology_hint.or_else(|| {
        let detected = classifier.classify(&input.notes);
        if let Some(p) = detected {
            tracing::info!(pathology = %p, "Detected pathology hint");
        }
        detected
    });
    run(input, pathology, reference)
}

fn run(input: &PipelineInput, pathology: Option<Pathology>, reference: &ClinicalReference) -> PipelineOutput {
    let span = tracing::info_span!("pipeline", notes = input.notes.len(), pathology = ?pathology);
    let _guard = span.enter();
    let settings = &reference.settings;
    let mut quality = QualityReport {
        notes_processed: input.notes.len(),
        ..Default::default()
    };

    // ── Extraction ──
    let mentions = extract_all(input, pathology, reference, &mut quality);
    quality.mentions_extracted = mentions.len();

    // ── Deduplication + linking ──
    let scorer = SynonymSimilarity::new(&reference.synonyms);
    let (references, events): (Vec<Mention>, Vec<Mention>) =
        mentions.into_iter().partition(Mention::is_reference);
    let deduplicator = Deduplicator::new(&scorer, &reference.synonyms, settings.merge_threshold);
    let entities = deduplicator.deduplicate(events);
    let outcome = ReferenceLinker::new(&scorer, settings.link_threshold).link(entities, references);

    quality.references_unlinked = outcome.unlinked.len();
    quality.references_linked = outcome.entities.iter().map(|e| e.references.len()).sum();
    for unlinked in &outcome.unlinked {
        quality.record(
            IssueKind::NoSimilarityMatch,
            "linking",
            format!("reference '{}' matched no entity; kept standalone", unlinked.name),
        );
    }
    // Unlinked references are all undated, so repeats of one fact cluster together.
    let mut entities = outcome.entities;
    entities.extend(
        deduplicator
            .deduplicate(outcome.unlinked)
            .into_iter()
            .map(|cluster| standalone_entity(cluster, settings.standalone_reference_penalty)),
    );

    // ── Timeline ──
    let timeline = build_timeline(&entities, &input.reference_dates, reference);
    if timeline.events.len() < 2 {
        quality.record(
            IssueKind::InsufficientData,
            "timeline",
            format!("{} dated event(s): no relationships inferred", timeline.events.len()),
        );
    }

    // ── Treatment + functional ──
    let treatment = analyze_treatment(&timeline, &entities, pathology, reference);
    let functional = analyze_functional(
        &entities,
        &timeline,
        input.prognostic_expectation.as_ref(),
        reference,
    );
    if !functional.has_data {
        quality.record(
            IssueKind::InsufficientData,
            "functional",
            format!("{} functional sample(s): no trajectory", functional.score_timeline.len()),
        );
    }

    tracing::info!(
        entities = entities.len(),
        events = timeline.metadata.event_count,
        relationships = timeline.metadata.relationship_count,
        responses = treatment.responses.len(),
        issues = quality.issues.len(),
        "Pipeline complete"
    );

    PipelineOutput {
        pathology,
        entities: group_by_category(entities),
        timeline,
        treatment,
        functional,
        quality,
    }
}

fn extract_all(
    input: &PipelineInput,
    pathology: Option<Pathology>,
    reference: &ClinicalReference,
    quality: &mut QualityReport,
) -> Vec<Mention> {
    if input.notes.is_empty() {
        quality.record(IssueKind::MalformedInput, "input", "no notes supplied");
        return Vec::new();
    }

    let extractor = EntityExtractor::new(reference, pathology, &input.reference_dates, &input.learned_patterns);
    let mut mentions = Vec::new();
    for (index, note) in input.notes.iter().enumerate() {
        if note.text.trim().is_empty() {
            quality.record(IssueKind::MalformedInput, "extraction", format!("note {index} is empty"));
            continue;
        }
        let found = extractor.extract(index, &note.text, note.date);
        for m in found.iter().filter(|m| m.temporal.is_unresolved_offset()) {
            quality.record(
                IssueKind::UnresolvedTemporalReference,
                "extraction",
                format!("'{}' in note {index}: no reference date for its offset", m.raw_span.text),
            );
        }
        tracing::debug!(note = index, mentions = found.len(), "Extracted note");
        mentions.extend(found);
    }
    mentions
}

fn group_by_category(entities: Vec<CanonicalEntity>) -> BTreeMap<EntityCategory, Vec<CanonicalEntity>> {
    let mut grouped: BTreeMap<_, Vec<CanonicalEntity>> = BTreeMap::new();
    for entity in entities {
        grouped.entry(entity.category).or_default().push(entity);
    }
    grouped
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use proptest::prelude::*;

    use super::*;
    use crate::models::{RelationshipType, ResponseClass, TrajectoryPattern};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    fn reference() -> ClinicalReference {
        ClinicalReference::builtin().unwrap()
    }

    fn sah_input(notes: &[&str]) -> PipelineInput {
        PipelineInput {
            notes: notes.iter().map(|t| NoteInput::new(t)).collect(),
            pathology_hint: Some(Pathology::Sah),
            reference_dates: ReferenceDates {
                procedures: vec![d(1)],
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn vasospasm_treated_with_induced_hypertension() {
        let input = sah_input(&[
            "started nimodipine POD#0",
            "POD#6 vasospasm, started induced hypertension",
            "POD#8 resolved",
        ]);
        let output = run_pipeline(&input, &reference());

        let meds = output.entities_of(EntityCategory::Medication);
        assert_eq!(meds.len(), 1);
        assert_eq!(meds[0].canonical_name, "nimodipine");
        assert_eq!(meds[0].date, Some(d(1)));

        let complications = output.entities_of(EntityCategory::Complication);
        assert_eq!(complications.len(), 1);
        assert_eq!(complications[0].date, Some(d(7)));

        let interventions = output.entities_of(EntityCategory::Intervention);
        assert_eq!(interventions.len(), 1);
        assert_eq!(interventions[0].date, Some(d(7)));

        let triggers: Vec<_> = output.timeline.relationships_of(RelationshipType::Triggers).collect();
        assert_eq!(triggers.len(), 1);
        let from = output.timeline.event(triggers[0].from_event_id).unwrap();
        let to = output.timeline.event(triggers[0].to_event_id).unwrap();
        assert_eq!(from.canonical_name, "vasospasm");
        assert_eq!(to.canonical_name, "induced hypertension");

        let response = output
            .treatment
            .responses
            .iter()
            .find(|r| r.intervention.name == "induced hypertension")
            .unwrap();
        assert_eq!(response.classification, ResponseClass::Improved);
        assert_eq!(response.days_to_response, 2);
    }

    #[test]
    fn therapy_written_before_its_indication() {
        let input = sah_input(&["POD#6 started induced hypertension for vasospasm", "POD#8 resolved"]);
        let output = run_pipeline(&input, &reference());

        let triggers: Vec<_> = output.timeline.relationships_of(RelationshipType::Triggers).collect();
        assert_eq!(triggers.len(), 1);
        let from = output.timeline.event(triggers[0].from_event_id).unwrap();
        assert_eq!(from.canonical_name, "vasospasm");

        let response = output
            .treatment
            .responses
            .iter()
            .find(|r| r.intervention.name == "induced hypertension")
            .unwrap();
        assert_eq!(response.classification, ResponseClass::Improved);
        assert_eq!(response.days_to_response, 2);
    }

    #[test]
    fn negated_vasospasm_yields_no_complication() {
        for note in ["no vasospasm noted", "POD#3 no vasospasm, no change in neuro exam"] {
            let output = run_pipeline(&sah_input(&[note]), &reference());
            assert!(
                output
                    .entities_of(EntityCategory::Complication)
                    .iter()
                    .all(|e| e.canonical_name != "vasospasm"),
                "{note}"
            );
        }
    }

    #[test]
    fn coiling_variants_merge_into_one_entity() {
        let mut input = sah_input(&[
            "Underwent coiling of the aneurysm. Endovascular coiling was uneventful. Coil embolization confirmed on angiography.",
        ]);
        input.notes[0].date = Some(d(2));
        let output = run_pipeline(&input, &reference());

        let procedures = output.entities_of(EntityCategory::Procedure);
        assert_eq!(procedures.len(), 1);
        assert_eq!(procedures[0].canonical_name, "aneurysm coiling");
        assert_eq!(procedures[0].source_mentions.len(), 3);
    }

    #[test]
    fn back_reference_links_to_prior_entity() {
        let mut input = sah_input(&["Underwent coiling of the ruptured aneurysm.", "Patient is s/p coiling."]);
        input.notes[0].date = Some(d(2));
        let output = run_pipeline(&input, &reference());

        let procedures = output.entities_of(EntityCategory::Procedure);
        assert_eq!(procedures.len(), 1);
        assert_eq!(procedures[0].references.len(), 1);
        assert!(!procedures[0].standalone_reference);
        assert_eq!(output.quality.references_linked, 1);
        assert_eq!(output.quality.count(IssueKind::NoSimilarityMatch), 0);
    }

    #[test]
    fn functional_series_improves() {
        let input = PipelineInput {
            notes: vec![
                NoteInput::dated("KPS 60 on admission.", d(1)),
                NoteInput::dated("KPS 55 after surgery.", d(4)),
                NoteInput::dated("KPS 70 with therapy.", d(8)),
                NoteInput::dated("KPS 85 at discharge.", d(14)),
            ],
            pathology_hint: Some(Pathology::Tumor),
            ..Default::default()
        };
        let output = run_pipeline(&input, &reference());

        assert!(output.functional.has_data);
        let normalized: Vec<f64> = output.functional.score_timeline.iter().map(|s| s.normalized_value).collect();
        assert_eq!(normalized.len(), 4);
        for (actual, expected) in normalized.iter().zip([60.0, 55.0, 70.0, 85.0]) {
            assert!((actual - expected).abs() < 1e-9);
        }
        let trajectory = output.functional.trajectory.as_ref().unwrap();
        assert_eq!(trajectory.pattern, TrajectoryPattern::Improving);
        assert!(output
            .functional
            .status_changes
            .iter()
            .any(|c| c.significance >= crate::models::Significance::Moderate));
    }

    #[test]
    fn scores_on_a_single_day_are_insufficient() {
        let input = PipelineInput {
            notes: vec![NoteInput::dated("GCS 15, mRS 0", d(3))],
            ..Default::default()
        };
        let output = run_pipeline(&input, &reference());

        assert_eq!(output.functional.score_timeline.len(), 2);
        assert!(!output.functional.has_data);
        assert!(output.functional.trajectory.is_none());
        assert!(output
            .quality
            .issues
            .iter()
            .any(|i| i.kind == IssueKind::InsufficientData && i.stage == "functional"));
    }

    #[test]
    fn empty_input_degrades_without_failing() {
        let output = run_pipeline(&PipelineInput::default(), &reference());
        assert_eq!(output.quality.count(IssueKind::MalformedInput), 1);
        assert!(output.entities.is_empty());
        assert!(output.timeline.events.is_empty());
        assert!(!output.functional.has_data);
        assert!(!output.treatment.has_data());
    }

    #[test]
    fn blank_note_and_unresolved_offset_are_recorded() {
        let input = PipelineInput {
            notes: vec![NoteInput::new("   "), NoteInput::new("POD#3 seizure")],
            pathology_hint: Some(Pathology::Sah),
            ..Default::default()
        };
        let output = run_pipeline(&input, &reference());
        assert_eq!(output.quality.count(IssueKind::MalformedInput), 1);
        assert_eq!(output.quality.count(IssueKind::UnresolvedTemporalReference), 1);
        assert_eq!(output.timeline.metadata.unresolved_count, 1);
        assert!(output.quality.is_degraded());
    }

    #[test]
    fn unlinked_reference_becomes_standalone() {
        let mut input = sah_input(&["History of craniotomy."]);
        input.notes[0].date = Some(d(2));
        let output = run_pipeline(&input, &reference());

        let procedures = output.entities_of(EntityCategory::Procedure);
        assert_eq!(procedures.len(), 1);
        assert!(procedures[0].standalone_reference);
        assert_eq!(procedures[0].date, None);
        assert_eq!(output.quality.count(IssueKind::NoSimilarityMatch), 1);
    }

    #[test]
    fn repeated_unlinked_references_share_one_entity() {
        let output = run_pipeline(
            &sah_input(&["History of craniotomy.", "Patient is s/p craniotomy."]),
            &reference(),
        );

        let procedures = output.entities_of(EntityCategory::Procedure);
        assert_eq!(procedures.len(), 1);
        assert!(procedures[0].standalone_reference);
        assert_eq!(procedures[0].date, None);
        assert_eq!(procedures[0].references.len(), 1);
        assert_eq!(output.quality.count(IssueKind::NoSimilarityMatch), 2);
    }

    #[test]
    fn classifier_supplies_missing_hint() {
        let input = PipelineInput {
            notes: vec![NoteInput::dated("Ruptured aneurysm with SAH, started nimodipine.", d(1))],
            ..Default::default()
        };
        let output = run_pipeline_with_classifier(&input, &reference(), &KeywordPathologyClassifier);
        assert_eq!(output.pathology, Some(Pathology::Sah));
        assert!(output.treatment.protocol_compliance.is_some());

        let plain = run_pipeline(&input, &reference());
        assert_eq!(plain.pathology, None);
        assert!(plain.treatment.protocol_compliance.is_none());
    }

    #[test]
    fn output_serializes_as_json() {
        let output = run_pipeline(&sah_input(&["started nimodipine POD#0"]), &reference());
        let json = serde_json::to_value(&output).unwrap();
        assert!(json["entities"]["medication"].is_array());
        assert!(json["quality"]["issues"].is_array());
    }

    const FRAGMENTS: &[&str] = &[
        "started nimodipine",
        "POD#2 vasospasm",
        "started induced hypertension",
        "no seizure",
        "POD#5 hydrocephalus, EVD placed",
        "s/p coiling",
        "GCS 14",
        "mRS 3",
        "HD#4 resolved",
        "worsened",
        "denies headache",
        "history of DVT",
        "started enoxaparin",
        "developed pneumonia",
    ];

    proptest! {
        #[test]
        fn pipeline_invariants_hold(picks in prop::collection::vec(
            prop::collection::vec(0..FRAGMENTS.len(), 1..5), 1..5)
        ) {
            let notes: Vec<NoteInput> = picks
                .iter()
                .map(|note| {
                    let text = note.iter().map(|i| FRAGMENTS[*i]).collect::<Vec<_>>().join(". ");
                    NoteInput::new(&text)
                })
                .collect();
            let input = PipelineInput {
                notes,
                reference_dates: ReferenceDates {
                    admission: Some(d(1)),
                    procedures: vec![d(2)],
                    ..Default::default()
                },
                ..Default::default()
            };
            let output = run_pipeline(&input, &reference());

            for entity in output.all_entities() {
                prop_assert!((0.0..=1.0).contains(&entity.confidence));
            }
            let events = &output.timeline.events;
            prop_assert!(events.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
            for r in &output.timeline.relationships {
                prop_assert!(events.iter().any(|e| e.id == r.from_event_id));
                prop_assert!(events.iter().any(|e| e.id == r.to_event_id));
            }
            for pair in &output.treatment.responses {
                prop_assert!((0.0..=100.0).contains(&pair.effectiveness.score));
                prop_assert!((0.0..=1.0).contains(&pair.confidence));
            }
            for sample in &output.functional.score_timeline {
                prop_assert!((0.0..=100.0).contains(&sample.normalized_value));
            }
        }
    }
}
