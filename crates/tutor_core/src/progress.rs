//! crates/tutor_core/src/progress.rs
//!
//! The chapter lifecycle state machine and quiz-attempt evaluation.
//!
//! States move `Scheduled -> QuizAvailable -> {Completed, NeedsReview}`.
//! `NeedsReview` may re-enter evaluation on a later attempt; `Completed`
//! is terminal per chapter. The transition into `QuizAvailable` happens
//! once quiz questions exist for the chapter (generated lazily on the
//! first continue request); the transition out happens on quiz submission.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The lifecycle state of a chapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChapterState {
    /// On the schedule, no quiz authored yet.
    Scheduled,
    /// Quiz questions exist; the chapter can be tested.
    QuizAvailable,
    /// Passed; terminal.
    Completed,
    /// Failed or ambiguous verdict; another attempt is allowed.
    NeedsReview,
}

impl ChapterState {
    /// Whether this state admits no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for ChapterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scheduled => write!(f, "Scheduled"),
            Self::QuizAvailable => write!(f, "QuizAvailable"),
            Self::Completed => write!(f, "Completed"),
            Self::NeedsReview => write!(f, "NeedsReview"),
        }
    }
}

/// Legal edges of the chapter state graph.
pub fn is_legal_transition(from: ChapterState, to: ChapterState) -> bool {
    use ChapterState::*;
    matches!(
        (from, to),
        (Scheduled, QuizAvailable)
            | (QuizAvailable, Completed)
            | (QuizAvailable, NeedsReview)
            | (NeedsReview, Completed)
            | (NeedsReview, NeedsReview)
    )
}

/// The judgment collaborator's verdict after the engine has tried to parse it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// A verdict string that may or may not contain a pass signal.
    Text(String),
    /// The collaborator errored or returned nothing usable.
    Unavailable,
}

/// Decides the post-submission state of a chapter.
///
/// A perfect score completes the chapter deterministically, regardless of
/// the verdict and even when the collaborator errored. Otherwise the
/// verdict text is sanitized (non-alphanumerics stripped, lowercased) and
/// scanned for a "passed" signal; anything else, including an unavailable
/// judgment, conservatively lands in `NeedsReview`. A chapter is never
/// silently marked complete.
pub fn evaluate_attempt(score: u32, total_questions: u32, verdict: &Verdict) -> ChapterState {
    if total_questions > 0 && score == total_questions {
        return ChapterState::Completed;
    }

    match verdict {
        Verdict::Text(text) if verdict_signals_pass(text) => ChapterState::Completed,
        _ => ChapterState::NeedsReview,
    }
}

fn verdict_signals_pass(text: &str) -> bool {
    let sanitized: String = text
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect();
    sanitized.split_whitespace().any(|word| word == "passed")
}
