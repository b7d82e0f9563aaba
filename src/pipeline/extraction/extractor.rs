use chrono::NaiveDate;

use crate::models::{EntityCategory, Mention, NegationResult, Pathology, TextSpan};
use crate::pipeline::types::ReferenceDates;
use crate::reference::{normalize_term, ClinicalReference, CompiledPattern, PatternLibrary, PatternSpec};

use super::negation::NegationClassifier;
use super::temporal::{NoteAnchors, TemporalResolver};
use super::text::sentence_bounds;

/// A raw regex hit before negation and temporal checks.
#[derive(Debug, Clone)]
struct Candidate<'p> {
    start: usize,
    end: usize,
    value: Option<f64>,
    pattern: &'p CompiledPattern,
}

impl Candidate<'_> {
    fn len(&self) -> usize {
        self.end - self.start
    }

    fn overlaps(&self, other: &Candidate<'_>) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Applies the category pattern libraries to one note at a time.
pub struct EntityExtractor<'a> {
    reference: &'a ClinicalReference,
    library: PatternLibrary,
    hint: Option<Pathology>,
    negation: NegationClassifier,
    resolver: TemporalResolver<'a>,
}

impl<'a> EntityExtractor<'a> {
    pub fn new(
        reference: &'a ClinicalReference,
        hint: Option<Pathology>,
        dates: &'a ReferenceDates,
        learned: &[PatternSpec],
    ) -> Self {
        let library = if learned.is_empty() {
            reference.patterns.clone()
        } else {
            reference.patterns.with_learned(learned)
        };
        Self {
            reference,
            library,
            hint,
            negation: NegationClassifier::new(reference.settings.negation_window_tokens),
            resolver: TemporalResolver::new(dates),
        }
    }

    fn hint_multiplier(&self) -> f32 {
        match self.hint {
            Some(_) => 1.0,
            None => self.reference.settings.no_hint_multiplier,
        }
    }

    /// All surviving mentions of every category in one note, in text order.
    /// Empty or whitespace-only text yields nothing.
    pub fn extract(&self, note_index: usize, text: &str, note_date: Option<NaiveDate>) -> Vec<Mention> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        let anchors = NoteAnchors::scan(text);
        let mut mentions = Vec::new();
        for &category in EntityCategory::all() {
            for candidate in self.candidates(category, text) {
                if let Some(m) = self.build_mention(note_index, text, note_date, &anchors, candidate) {
                    mentions.push(m);
                }
            }
        }
        mentions.sort_by_key(|m| m.raw_span.start);
        tracing::debug!(note_index, count = mentions.len(), "Extracted mentions");
        mentions
    }

    /// Non-overlapping hits for one category; the longest span wins an overlap.
    fn candidates(&self, category: EntityCategory, text: &str) -> Vec<Candidate<'_>> {
        let mut hits: Vec<Candidate<'_>> = self
            .library
            .for_category(category, self.hint)
            .flat_map(|pattern| {
                pattern.regex.captures_iter(text).filter_map(move |caps| {
                    let whole = caps.get(0)?;
                    if whole.as_str().trim().is_empty() {
                        return None;
                    }
                    let value = caps.name("value").and_then(|v| v.as_str().parse::<f64>().ok());
                    Some(Candidate {
                        start: whole.start(),
                        end: whole.end(),
                        value,
                        pattern,
                    })
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.len()
                .cmp(&a.len())
                .then(a.start.cmp(&b.start))
                .then(b.pattern.spec.confidence.total_cmp(&a.pattern.spec.confidence))
        });
        let mut kept: Vec<Candidate<'_>> = Vec::new();
        for hit in hits {
            if !kept.iter().any(|k| k.overlaps(&hit)) {
                kept.push(hit);
            }
        }
        kept.sort_by_key(|c| c.start);
        kept
    }

    fn build_mention(
        &self,
        note_index: usize,
        text: &str,
        note_date: Option<NaiveDate>,
        anchors: &NoteAnchors,
        candidate: Candidate<'_>,
    ) -> Option<Mention> {
        let spec = &candidate.pattern.spec;
        let settings = &self.reference.settings;
        let raw = &text[candidate.start..candidate.end];

        if spec.category == EntityCategory::FunctionalScore && !self.score_in_range(spec, candidate.value) {
            tracing::debug!(raw, "Dropping out-of-range functional score");
            return None;
        }

        let sentence = sentence_bounds(text, candidate.start, candidate.end);
        let negation: NegationResult = self.negation.classify(
            &text[sentence.0..sentence.1],
            candidate.start - sentence.0,
            candidate.end - sentence.0,
        );
        if negation.is_negated && negation.confidence >= settings.negation_threshold {
            tracing::debug!(raw, trigger = ?negation.trigger, "Dropping negated mention");
            return None;
        }

        let temporal = self.resolver.resolve(
            text,
            anchors,
            sentence,
            (candidate.start, candidate.end),
            note_date,
        );

        let mut confidence = spec.confidence * self.hint_multiplier();
        if negation.is_negated {
            confidence *= 1.0 - negation.confidence;
        }
        if temporal.is_unresolved_offset() {
            confidence *= settings.unresolved_temporal_penalty;
        }

        let date = if temporal.is_reference() {
            None
        } else {
            temporal.resolved_date
        };

        Some(Mention {
            name: spec
                .label
                .clone()
                .unwrap_or_else(|| normalize_term(raw)),
            category: spec.category,
            raw_span: TextSpan {
                text: raw.to_string(),
                start: candidate.start,
                end: candidate.end,
            },
            date,
            confidence: confidence.clamp(0.0, 1.0),
            note_index,
            context: text[sentence.0..sentence.1].trim().to_string(),
            value: candidate.value,
            temporal,
            negation,
        })
    }

    /// Score patterns without a value, or with a value outside the scale, are rejected.
    fn score_in_range(&self, spec: &PatternSpec, value: Option<f64>) -> bool {
        let Some(value) = value else {
            return false;
        };
        match spec.label.as_deref().and_then(|l| self.reference.scales.get(l)) {
            Some(scale) => value >= scale.min && value <= scale.max,
            None => true,
        }
    }
}
