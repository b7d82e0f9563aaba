//! Rule-based extraction: category patterns, negation scope, temporal context.

pub mod extractor;
pub mod negation;
pub mod temporal;
pub mod text;

pub use extractor::EntityExtractor;
pub use negation::NegationClassifier;
pub use temporal::{resolve_offset, NoteAnchors, TemporalResolver};
