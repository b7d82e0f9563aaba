//! Name similarity shared by the deduplicator and the reference linker.

use std::collections::HashSet;

use crate::reference::{normalize_term, SynonymTable};

const LEXICAL_WEIGHT: f64 = 0.25;
const SYNONYM_WEIGHT: f64 = 0.75;

/// Scores two names in [0, 1].
pub trait SimilarityScorer {
    fn score(&self, a: &str, b: &str) -> f64;
}

/// Lexical similarity blended with synonym canonicalization.
pub struct SynonymSimilarity<'a> {
    synonyms: &'a SynonymTable,
}

impl<'a> SynonymSimilarity<'a> {
    pub fn new(synonyms: &'a SynonymTable) -> Self {
        Self { synonyms }
    }
}

impl SimilarityScorer for SynonymSimilarity<'_> {
    fn score(&self, a: &str, b: &str) -> f64 {
        similarity(a, b, self.synonyms)
    }
}

/// When both names canonicalize, 0.25 * lexical + 0.75 * [same canonical term].
/// Otherwise the lexical score alone. Empty names score 0.
pub fn similarity(a: &str, b: &str, synonyms: &SynonymTable) -> f64 {
    let (na, nb) = (normalize_term(a), normalize_term(b));
    if na.is_empty() || nb.is_empty() {
        return 0.0;
    }
    let lexical = lexical_similarity(&na, &nb);
    match (synonyms.canonical(&na), synonyms.canonical(&nb)) {
        (Some(ca), Some(cb)) => {
            let same = if ca == cb { 1.0 } else { 0.0 };
            (LEXICAL_WEIGHT * lexical + SYNONYM_WEIGHT * same).clamp(0.0, 1.0)
        }
        _ => lexical,
    }
}

/// max(token Jaccard, 1 - edit distance / longer length) on normalized names.
pub fn lexical_similarity(a: &str, b: &str) -> f64 {
    let (a, b) = (normalize_term(a), normalize_term(b));
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }

    let ta: HashSet<&str> = a.split(' ').collect();
    let tb: HashSet<&str> = b.split(' ').collect();
    let jaccard = ta.intersection(&tb).count() as f64 / ta.union(&tb).count() as f64;

    let longest = a.chars().count().max(b.chars().count());
    let levenshtein = 1.0 - edit_distance(&a, &b) as f64 / longest as f64;

    jaccard.max(levenshtein).clamp(0.0, 1.0)
}

/// Levenshtein distance over chars.
pub fn edit_distance(a: &str, b: &str) -> u32 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let n = b_chars.len();

    if a_chars.is_empty() { return n as u32; }
    if n == 0 { return a_chars.len() as u32; }

    let mut prev: Vec<u32> = (0..=n as u32).collect();
    let mut curr = vec![0u32; n + 1];

    for (i, &a_ch) in a_chars.iter().enumerate() {
        curr[0] = (i + 1) as u32;
        for (j, &b_ch) in b_chars.iter().enumerate() {
            let cost = if a_ch == b_ch { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1)
                .min(curr[j] + 1)
                .min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}
