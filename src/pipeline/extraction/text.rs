//! Sentence and token helpers shared by the negation and temporal stages.

use std::sync::LazyLock;

use regex::Regex;

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9]+(?:[/'#][A-Za-z0-9]+)*").unwrap());

/// A lowercased word token with its byte span in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

pub fn tokenize(text: &str) -> Vec<Token> {
    TOKEN
        .find_iter(text)
        .map(|m| Token {
            text: m.as_str().to_lowercase(),
            start: m.start(),
            end: m.end(),
        })
        .collect()
}

/// Byte range of the sentence containing `[start, end)`.
///
/// A sentence ends at `.`, `!`, `?` or `;` followed by whitespace, or at a newline.
pub fn sentence_bounds(text: &str, start: usize, end: usize) -> (usize, usize) {
    let bytes = text.as_bytes();
    let is_break = |i: usize| -> bool {
        match bytes[i] {
            b'\n' => true,
            b'.' | b'!' | b'?' | b';' => bytes.get(i + 1).map_or(true, |c| c.is_ascii_whitespace()),
            _ => false,
        }
    };

    let mut s = start.min(bytes.len());
    while s > 0 && !is_break(s - 1) {
        s -= 1;
    }
    let mut e = end.min(bytes.len());
    while e < bytes.len() && !is_break(e) {
        e += 1;
    }
    (s, e)
}

/// Whether `words` occurs as a contiguous run in `tokens` starting at `at`.
pub fn phrase_at(tokens: &[Token], at: usize, words: &[&str]) -> bool {
    words.len() <= tokens.len().saturating_sub(at)
        && words
            .iter()
            .zip(&tokens[at..])
            .all(|(w, t)| t.text == *w)
}
