//! Rule-based negation scope check.
//!
//! Looks at a fixed token window on each side of a mention, inside its
//! sentence: pre-mention triggers first, then post-mention triggers. A
//! pseudo-negation ("no change") neutralises only the trigger words it
//! contains; when the nearest trigger belongs to one, the mention is
//! affirmed. Scope terminators ("but", "started", ...) cut the pre-mention
//! window so a negation does not run across a clause into a different finding.

use crate::models::NegationResult;

use super::text::{phrase_at, tokenize, Token};

/// Phrases that contain a negation word but do not negate the finding.
const PSEUDO_NEGATIONS: &[&[&str]] = &[
    &["no", "change"],
    &["no", "further"],
    &["not", "only"],
    &["no", "increase"],
    &["without", "difficulty"],
    &["not", "necessarily"],
];

/// (phrase, base confidence). Longer phrases first so they win over their prefixes.
const PRE_TRIGGERS: &[(&[&str], f32)] = &[
    (&["no", "evidence", "of"], 0.95),
    (&["negative", "for"], 0.95),
    (&["ruled", "out"], 0.9),
    (&["absence", "of"], 0.9),
    (&["free", "of"], 0.85),
    (&["denies"], 0.9),
    (&["denied"], 0.9),
    (&["without"], 0.85),
    (&["no"], 0.9),
    (&["not"], 0.75),
];

const POST_TRIGGERS: &[(&[&str], f32)] = &[
    (&["was", "ruled", "out"], 0.9),
    (&["ruled", "out"], 0.85),
    (&["was", "excluded"], 0.85),
    (&["not", "seen"], 0.85),
    (&["resolved", "without"], 0.8),
    (&["negative"], 0.8),
    (&["absent"], 0.8),
];

const SCOPE_TERMINATORS: &[&str] = &[
    "but", "however", "although", "though", "except", "yet", "started", "initiated", "began",
    "underwent", "developed", "performed", "placed", "given",
];

const DISTANCE_PENALTY: f32 = 0.05;
const MIN_CONFIDENCE: f32 = 0.5;

#[derive(Debug, Clone)]
pub struct NegationClassifier {
    window: usize,
}

impl NegationClassifier {
    pub fn new(window: usize) -> Self {
        Self { window }
    }

    /// Classify the mention at `[start, end)` of `sentence` (offsets relative to the sentence).
    pub fn classify(&self, sentence: &str, start: usize, end: usize) -> NegationResult {
        let tokens = tokenize(sentence);
        let first_inside = tokens.iter().position(|t| t.end > start).unwrap_or(tokens.len());
        let first_after = tokens.iter().position(|t| t.start >= end).unwrap_or(tokens.len());

        let pre_from = first_inside.saturating_sub(self.window);
        let post_to = (first_after + self.window).min(tokens.len());

        let pseudo = pseudo_negation_mask(&tokens);
        let pre_from = scope_start(&tokens, pre_from, first_inside);
        if let Some(result) = pre_trigger(&tokens[pre_from..first_inside], &pseudo[pre_from..first_inside]) {
            return result;
        }
        if let Some(result) = post_trigger(&tokens[first_after..post_to], &pseudo[first_after..post_to]) {
            return result;
        }
        NegationResult::affirmed(1.0)
    }
}

/// Per token: whether it is covered by a pseudo-negation phrase.
fn pseudo_negation_mask(tokens: &[Token]) -> Vec<bool> {
    let mut mask = vec![false; tokens.len()];
    for i in 0..tokens.len() {
        for phrase in PSEUDO_NEGATIONS {
            if phrase_at(tokens, i, phrase) {
                mask[i..i + phrase.len()].fill(true);
            }
        }
    }
    mask
}

/// Start of the pre-mention scope after the last terminator in `[from, to)`.
fn scope_start(tokens: &[Token], from: usize, to: usize) -> usize {
    (from..to)
        .rev()
        .find(|&i| SCOPE_TERMINATORS.contains(&tokens[i].text.as_str()))
        .map_or(from, |i| i + 1)
}

fn scored(trigger: &[&str], base: f32, gap: usize) -> NegationResult {
    NegationResult {
        is_negated: true,
        confidence: (base - DISTANCE_PENALTY * gap as f32).max(MIN_CONFIDENCE),
        trigger: Some(trigger.join(" ")),
    }
}

/// Nearest trigger before the mention. `window` ends right before the mention.
/// A nearest trigger inside a pseudo-negation affirms the mention.
fn pre_trigger(window: &[Token], pseudo: &[bool]) -> Option<NegationResult> {
    for i in (0..window.len()).rev() {
        for (phrase, base) in PRE_TRIGGERS {
            if phrase_at(window, i, phrase) {
                if pseudo[i] {
                    return Some(NegationResult::affirmed(1.0));
                }
                let gap = window.len() - (i + phrase.len());
                return Some(scored(phrase, *base, gap));
            }
        }
    }
    None
}

/// Nearest trigger after the mention. `window` starts right after the mention.
fn post_trigger(window: &[Token], pseudo: &[bool]) -> Option<NegationResult> {
    for i in 0..window.len() {
        for (phrase, base) in POST_TRIGGERS {
            if phrase_at(window, i, phrase) {
                if pseudo[i] {
                    return Some(NegationResult::affirmed(1.0));
                }
                return Some(scored(phrase, *base, i));
            }
        }
    }
    None
}
