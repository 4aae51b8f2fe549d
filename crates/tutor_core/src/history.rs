//! crates/tutor_core/src/history.rs
//!
//! Token-budgeted conversation history trimming.

use crate::domain::ConversationTurn;
use crate::ports::Tokenizer;

/// Trims a transcript to fit within `budget` tokens.
///
/// Walks from the most recent turn to the oldest, accumulating each turn's
/// role-prefixed token cost, and stops before the first turn that would
/// exceed the budget. The retained turns are returned in chronological
/// order, so the output is always a contiguous suffix of the input.
///
/// If the single most recent turn alone exceeds the budget, the result is
/// empty: an oversized turn is dropped, not truncated in place.
pub fn trim(
    transcript: &[ConversationTurn],
    budget: usize,
    tokenizer: &dyn Tokenizer,
) -> Vec<ConversationTurn> {
    let mut retained = Vec::new();
    let mut total = 0usize;

    for turn in transcript.iter().rev() {
        let cost = tokenizer.count_tokens(&turn.prompt_text());
        if total + cost > budget {
            break;
        }
        retained.push(turn.clone());
        total += cost;
    }

    retained.reverse();
    retained
}
