use std::collections::HashMap;

use chrono::NaiveDate;

use crate::models::{entity_id, CanonicalEntity, EntityCategory, Mention};
use crate::reference::SynonymTable;

use super::similarity::SimilarityScorer;

/// Merges same-category NEW_EVENT mentions into canonical entities.
pub struct Deduplicator<'a> {
    scorer: &'a dyn SimilarityScorer,
    synonyms: &'a SynonymTable,
    threshold: f64,
}

/// Mentions collected for one entity before naming.
#[derive(Debug, Default)]
struct Cluster {
    members: Vec<Mention>,
}

impl Cluster {
    fn date(&self) -> Option<NaiveDate> {
        self.members.first().and_then(|m| m.date)
    }

    fn value(&self) -> Option<f64> {
        self.members.first().and_then(|m| m.value)
    }

    fn category(&self) -> Option<EntityCategory> {
        self.members.first().map(|m| m.category)
    }
}

fn same_value(a: Option<f64>, b: Option<f64>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(x), Some(y)) => (x - y).abs() < f64::EPSILON,
        _ => false,
    }
}

impl<'a> Deduplicator<'a> {
    pub fn new(scorer: &'a dyn SimilarityScorer, synonyms: &'a SynonymTable, threshold: f64) -> Self {
        Self {
            scorer,
            synonyms,
            threshold,
        }
    }

    /// Best similarity between any two member names.
    fn cluster_similarity(&self, a: &Cluster, b: &Cluster) -> f64 {
        a.members
            .iter()
            .flat_map(|x| b.members.iter().map(move |y| (x, y)))
            .map(|(x, y)| self.scorer.score(&x.name, &y.name))
            .fold(0.0, f64::max)
    }

    fn mergeable(&self, a: &Cluster, b: &Cluster) -> bool {
        a.category() == b.category()
            && a.date() == b.date()
            && same_value(a.value(), b.value())
            && self.cluster_similarity(a, b) >= self.threshold
    }

    /// Greedy clustering followed by a fixpoint pass over the clusters.
    ///
    /// Mentions with different dates, or different score values, never merge.
    /// Output is ordered by first appearance in the notes.
    pub fn deduplicate(&self, mut mentions: Vec<Mention>) -> Vec<CanonicalEntity> {
        mentions.sort_by_key(Mention::sequence);

        let mut clusters: Vec<Cluster> = Vec::new();
        for mention in mentions {
            let single = Cluster {
                members: vec![mention],
            };
            match clusters.iter().position(|c| self.mergeable(c, &single)) {
                Some(i) => clusters[i].members.extend(single.members),
                None => clusters.push(single),
            }
        }

        loop {
            let pair = (0..clusters.len()).find_map(|i| {
                ((i + 1)..clusters.len())
                    .find(|&j| self.mergeable(&clusters[i], &clusters[j]))
                    .map(|j| (i, j))
            });
            let Some((i, j)) = pair else { break };
            let absorbed = clusters.remove(j);
            clusters[i].members.extend(absorbed.members);
            clusters[i].members.sort_by_key(Mention::sequence);
        }

        let mut ordinals: HashMap<(EntityCategory, String, Option<NaiveDate>), usize> = HashMap::new();
        clusters
            .into_iter()
            .filter_map(|cluster| {
                let category = cluster.category()?;
                let canonical_name = self.canonical_name(&cluster.members);
                let ordinal = ordinals
                    .entry((category, canonical_name.clone(), cluster.date()))
                    .or_insert(0);
                let id = entity_id(category, &canonical_name, cluster.date(), *ordinal);
                *ordinal += 1;
                Some(CanonicalEntity {
                    id,
                    category,
                    canonical_name,
                    date: cluster.date(),
                    value: cluster.value(),
                    confidence: cluster
                        .members
                        .iter()
                        .map(|m| m.confidence)
                        .fold(0.0, f32::max),
                    source_mentions: cluster.members,
                    references: Vec::new(),
                    standalone_reference: false,
                })
            })
            .collect()
    }

    /// Preferred synonym of the most confident member that has one,
    /// else the most confident member's own name.
    fn canonical_name(&self, members: &[Mention]) -> String {
        let mut ranked: Vec<&Mention> = members.iter().collect();
        ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        ranked
            .iter()
            .find_map(|m| self.synonyms.canonical(&m.name))
            .map(str::to_string)
            .or_else(|| ranked.first().map(|m| m.name.clone()))
            .unwrap_or_default()
    }
}
