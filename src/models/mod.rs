pub mod entity;
pub mod enums;
pub mod mention;

pub use entity::{entity_id, CanonicalEntity};
pub use enums::*;
pub use mention::{Mention, NegationResult, RelativeOffset, TemporalContext, TextSpan};
