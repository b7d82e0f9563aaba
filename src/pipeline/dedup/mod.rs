//! Semantic deduplication and reference linking.
//!
//! Both stages score names with the same [`SimilarityScorer`], so a pair
//! that merges here would also link there.

pub mod deduplicator;
pub mod linker;
pub mod similarity;

pub use deduplicator::Deduplicator;
pub use linker::{standalone_entity, LinkOutcome, ReferenceLinker};
pub use similarity::{lexical_similarity, similarity, SimilarityScorer, SynonymSimilarity};

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::NaiveDate;

    use crate::models::{EntityCategory, Mention, NegationResult, TemporalClass, TemporalContext, TextSpan};

    pub(crate) fn mention(
        name: &str,
        category: EntityCategory,
        date: Option<NaiveDate>,
        confidence: f32,
        offset: usize,
    ) -> Mention {
        Mention {
            name: name.to_string(),
            category,
            raw_span: TextSpan {
                text: name.to_string(),
                start: offset,
                end: offset + name.len(),
            },
            date,
            confidence,
            note_index: 0,
            context: name.to_string(),
            value: None,
            temporal: TemporalContext {
                classification: TemporalClass::NewEvent,
                relative_offset: None,
                resolved_date: date,
                explicit_date: false,
                confidence: 0.9,
            },
            negation: NegationResult::affirmed(1.0),
        }
    }
}
