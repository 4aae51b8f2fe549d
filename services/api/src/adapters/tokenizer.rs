//! services/api/src/adapters/tokenizer.rs
//!
//! Default implementation of the `Tokenizer` port.

use tutor_core::ports::Tokenizer;

/// Estimates tokens as character count / 4, which tracks GPT-family
/// tokenizers closely enough for budget enforcement. The port stays
/// pluggable so an exact model-specific counter can replace this.
pub struct CharEstimator;

impl Tokenizer for CharEstimator {
    fn count_tokens(&self, text: &str) -> usize {
        text.chars().count() / 4
    }
}
