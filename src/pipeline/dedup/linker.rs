use uuid::Uuid;

use crate::models::{CanonicalEntity, Mention};

use super::similarity::SimilarityScorer;

/// Result of linking back-references to canonical entities.
#[derive(Debug, Clone, Default)]
pub struct LinkOutcome {
    pub entities: Vec<CanonicalEntity>,
    pub unlinked: Vec<Mention>,
}

/// Attaches REFERENCE mentions to the best matching entity of their category.
pub struct ReferenceLinker<'a> {
    scorer: &'a dyn SimilarityScorer,
    threshold: f64,
}

impl<'a> ReferenceLinker<'a> {
    pub fn new(scorer: &'a dyn SimilarityScorer, threshold: f64) -> Self {
        Self { scorer, threshold }
    }

    /// Max similarity of the reference against the entity's names.
    /// A category mismatch or an empty name scores 0.
    pub fn score(&self, reference: &Mention, entity: &CanonicalEntity) -> f64 {
        if reference.category != entity.category || reference.name.trim().is_empty() {
            return 0.0;
        }
        entity
            .names()
            .filter(|n| !n.trim().is_empty())
            .map(|n| self.scorer.score(&reference.name, n))
            .fold(0.0, f64::max)
    }

    pub fn link(&self, mut entities: Vec<CanonicalEntity>, references: Vec<Mention>) -> LinkOutcome {
        let mut unlinked = Vec::new();
        for reference in references {
            match self.best_match(&reference, &entities) {
                Some(i) => entities[i].references.push(reference),
                None => unlinked.push(reference),
            }
        }
        tracing::debug!(
            entities = entities.len(),
            unlinked = unlinked.len(),
            "Linked references"
        );
        LinkOutcome { entities, unlinked }
    }

    /// Highest score at or above the threshold. Ties go to the latest entity
    /// dated on or before the statement, then to the earliest entity.
    fn best_match(&self, reference: &Mention, entities: &[CanonicalEntity]) -> Option<usize> {
        let stated = reference.temporal.resolved_date;
        let mut best: Option<(usize, f64)> = None;
        for (i, entity) in entities.iter().enumerate() {
            let score = self.score(reference, entity);
            if score < self.threshold {
                continue;
            }
            best = match best {
                None => Some((i, score)),
                Some((_, b)) if score > b + f64::EPSILON => Some((i, score)),
                Some((j, b)) if (score - b).abs() <= f64::EPSILON => {
                    let prefer_new = match (stated, entity.date, entities[j].date) {
                        (Some(s), Some(new), Some(old)) => new <= s && new > old,
                        (Some(s), Some(new), None) => new <= s,
                        _ => false,
                    };
                    if prefer_new {
                        Some((i, score))
                    } else {
                        Some((j, b))
                    }
                }
                keep => keep,
            };
        }
        best.map(|(i, _)| i)
    }
}

/// Promote a cluster of unlinked references (grouped by the deduplicator)
/// to one undated, low-confidence entity. The earliest mention stays the
/// source; the rest are attached as references. Its id never coincides with
/// an undated entity of the same name.
pub fn standalone_entity(cluster: CanonicalEntity, penalty: f32) -> CanonicalEntity {
    let mut mentions = cluster.source_mentions;
    mentions.sort_by_key(Mention::sequence);
    let references = mentions.split_off(mentions.len().min(1));
    CanonicalEntity {
        id: Uuid::new_v5(&cluster.id, b"standalone-reference"),
        category: cluster.category,
        canonical_name: cluster.canonical_name,
        date: None,
        value: cluster.value,
        confidence: (cluster.confidence * penalty).clamp(0.0, 1.0),
        source_mentions: mentions,
        references,
        standalone_reference: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntityCategory, TemporalClass};
    use crate::models::entity_id;
    use crate::pipeline::dedup::similarity::SynonymSimilarity;
    use crate::pipeline::dedup::Deduplicator;
    use crate::pipeline::dedup::test_support::mention;
    use crate::reference::builtin;
    use chrono::NaiveDate;

    fn reference(name: &str, category: EntityCategory) -> Mention {
        let mut m = mention(name, category, None, 0.8, 100);
        m.temporal.classification = TemporalClass::Reference;
        m
    }

    fn entity(name: &str, category: EntityCategory, day: u32) -> CanonicalEntity {
        let date = NaiveDate::from_ymd_opt(2025, 3, day);
        let m = mention(name, category, date, 0.9, day as usize);
        CanonicalEntity {
            id: entity_id(category, name, date, 0),
            category,
            canonical_name: name.to_string(),
            date,
            value: None,
            confidence: 0.9,
            source_mentions: vec![m],
            references: Vec::new(),
            standalone_reference: false,
        }
    }

    #[test]
    fn status_post_coiling_links_to_existing_entity() {
        let table = builtin::synonyms();
        let scorer = SynonymSimilarity::new(&table);
        let outcome = ReferenceLinker::new(&scorer, 0.5).link(
            vec![entity("aneurysm coiling", EntityCategory::Procedure, 1)],
            vec![reference("coiling", EntityCategory::Procedure)],
        );
        assert!(outcome.unlinked.is_empty());
        assert_eq!(outcome.entities.len(), 1);
        assert_eq!(outcome.entities[0].references.len(), 1);
    }

    #[test]
    fn category_mismatch_scores_zero() {
        let table = builtin::synonyms();
        let scorer = SynonymSimilarity::new(&table);
        let linker = ReferenceLinker::new(&scorer, 0.5);
        let e = entity("vasospasm", EntityCategory::Complication, 6);
        assert_eq!(linker.score(&reference("vasospasm", EntityCategory::Procedure), &e), 0.0);
        assert_eq!(linker.score(&reference("", EntityCategory::Complication), &e), 0.0);
    }

    #[test]
    fn no_match_returns_unlinked() {
        let table = builtin::synonyms();
        let scorer = SynonymSimilarity::new(&table);
        let outcome = ReferenceLinker::new(&scorer, 0.5).link(
            vec![entity("external ventricular drain", EntityCategory::Procedure, 1)],
            vec![reference("craniotomy", EntityCategory::Procedure)],
        );
        assert_eq!(outcome.unlinked.len(), 1);
        assert!(outcome.entities[0].references.is_empty());
    }

    #[test]
    fn tie_prefers_latest_entity_before_statement() {
        let table = builtin::synonyms();
        let scorer = SynonymSimilarity::new(&table);
        let mut r = reference("nimodipine", EntityCategory::Medication);
        r.temporal.resolved_date = NaiveDate::from_ymd_opt(2025, 3, 10);
        let outcome = ReferenceLinker::new(&scorer, 0.5).link(
            vec![
                entity("nimodipine", EntityCategory::Medication, 1),
                entity("nimodipine", EntityCategory::Medication, 8),
                entity("nimodipine", EntityCategory::Medication, 12),
            ],
            vec![r],
        );
        assert_eq!(outcome.entities[1].references.len(), 1);
    }

    fn unlinked_cluster(names: &[&str]) -> CanonicalEntity {
        let table = builtin::synonyms();
        let scorer = SynonymSimilarity::new(&table);
        let refs: Vec<Mention> = names
            .iter()
            .enumerate()
            .map(|(i, n)| {
                let mut m = reference(n, EntityCategory::Procedure);
                m.raw_span.start = 100 * (names.len() - i);
                m
            })
            .collect();
        let mut clusters = Deduplicator::new(&scorer, &table, 0.75).deduplicate(refs);
        assert_eq!(clusters.len(), 1);
        clusters.remove(0)
    }

    #[test]
    fn standalone_entity_is_penalized_and_undated() {
        let cluster = unlinked_cluster(&["craniotomy"]);
        let undated_id = cluster.id;
        let e = standalone_entity(cluster, 0.6);
        assert!(e.standalone_reference);
        assert_eq!(e.date, None);
        assert_ne!(e.id, undated_id);
        assert!((e.confidence - 0.48).abs() < 1e-6);
        assert!(e.references.is_empty());
    }

    #[test]
    fn repeated_unlinked_references_become_one_entity() {
        let e = standalone_entity(unlinked_cluster(&["craniotomy", "craniotomy"]), 0.6);
        assert_eq!(e.source_mentions.len(), 1);
        assert_eq!(e.references.len(), 1);
        assert!(e.source_mentions[0].raw_span.start < e.references[0].raw_span.start);
    }
}
