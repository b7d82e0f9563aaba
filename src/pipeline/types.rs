//! Pipeline input, output and quality types.
//!
//! Input → Extraction → Dedup → Linking → Timeline → Treatment / Functional → Output.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::functional::FunctionalReport;
use crate::models::{CanonicalEntity, EntityCategory, Pathology};
use crate::reference::PatternSpec;
use crate::timeline::CausalTimeline;
use crate::treatment::TreatmentReport;

// ═══════════════════════════════════════════
// Input
// ═══════════════════════════════════════════

/// One clinical note. Notes are processed in the order given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteInput {
    pub text: String,
    /// Date the note was written; last-resort date for undated new events.
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

impl NoteInput {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            date: None,
        }
    }

    pub fn dated(text: &str, date: NaiveDate) -> Self {
        Self {
            text: text.to_string(),
            date: Some(date),
        }
    }
}

/// Absolute anchors for relative offsets and milestones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceDates {
    pub ictus: Option<NaiveDate>,
    pub admission: Option<NaiveDate>,
    /// Procedure dates; the earliest anchors POD offsets.
    pub procedures: Vec<NaiveDate>,
    pub discharge: Option<NaiveDate>,
}

impl ReferenceDates {
    pub fn first_procedure(&self) -> Option<NaiveDate> {
        self.procedures.iter().min().copied()
    }
}

/// Externally supplied expected discharge status on one scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrognosticExpectation {
    pub scale: String,
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineInput {
    pub notes: Vec<NoteInput>,
    pub pathology_hint: Option<Pathology>,
    pub reference_dates: ReferenceDates,
    /// Extra patterns merged into the library for this call only.
    pub learned_patterns: Vec<PatternSpec>,
    pub prognostic_expectation: Option<PrognosticExpectation>,
}

// ═══════════════════════════════════════════
// Quality
// ═══════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    MalformedInput,
    UnresolvedTemporalReference,
    NoSimilarityMatch,
    InsufficientData,
}

/// A degradation recorded by one stage. Never fatal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineIssue {
    pub kind: IssueKind,
    pub stage: String,
    pub detail: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub issues: Vec<PipelineIssue>,
    pub notes_processed: usize,
    pub mentions_extracted: usize,
    pub references_linked: usize,
    pub references_unlinked: usize,
}

impl QualityReport {
    pub fn record(&mut self, kind: IssueKind, stage: &str, detail: impl Into<String>) {
        let detail = detail.into();
        tracing::debug!(?kind, stage, detail = %detail, "Pipeline degradation");
        self.issues.push(PipelineIssue {
            kind,
            stage: stage.to_string(),
            detail,
        });
    }

    pub fn count(&self, kind: IssueKind) -> usize {
        self.issues.iter().filter(|i| i.kind == kind).count()
    }

    pub fn is_degraded(&self) -> bool {
        !self.issues.is_empty()
    }
}

// ═══════════════════════════════════════════
// Output
// ═══════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutput {
    /// Hint actually used: the caller's, or a detected one.
    pub pathology: Option<Pathology>,
    pub entities: BTreeMap<EntityCategory, Vec<CanonicalEntity>>,
    pub timeline: CausalTimeline,
    pub treatment: TreatmentReport,
    pub functional: FunctionalReport,
    pub quality: QualityReport,
}

impl PipelineOutput {
    pub fn entities_of(&self, category: EntityCategory) -> &[CanonicalEntity] {
        self.entities.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn all_entities(&self) -> impl Iterator<Item = &CanonicalEntity> {
        self.entities.values().flatten()
    }
}
