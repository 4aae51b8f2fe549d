//! services/api/src/engine/quiz.rs
//!
//! Quiz submission: attempt logging and the completion decision.

use std::sync::Arc;
use tracing::{info, warn};
use tutor_core::domain::QuizAttempt;
use tutor_core::ports::{CurriculumStore, JudgmentService, PortResult};
use tutor_core::progress::{evaluate_attempt, ChapterState, Verdict};

/// What the caller gets back after submitting an attempt.
#[derive(Debug)]
pub struct SubmissionResult {
    pub state: ChapterState,
    /// The judgment collaborator's narrative feedback, when it ran.
    pub feedback: Option<String>,
}

pub struct QuizService {
    store: Arc<dyn CurriculumStore>,
    judge: Arc<dyn JudgmentService>,
}

impl QuizService {
    pub fn new(store: Arc<dyn CurriculumStore>, judge: Arc<dyn JudgmentService>) -> Self {
        Self { store, judge }
    }

    /// Logs the attempt and decides the chapter's next state.
    ///
    /// A perfect score completes the chapter deterministically without
    /// consulting the judgment collaborator. Otherwise the collaborator's
    /// verdict is parsed for a pass signal; an erroring or unparseable
    /// judgment conservatively yields `NeedsReview`. The completion flag
    /// is only ever set, so re-evaluating a completed chapter can never
    /// regress it.
    pub async fn submit_attempt(&self, attempt: QuizAttempt) -> PortResult<SubmissionResult> {
        self.store.insert_quiz_attempt(&attempt).await?;

        let (verdict, feedback) =
            if attempt.total_questions > 0 && attempt.score == attempt.total_questions {
                (Verdict::Unavailable, None)
            } else {
                match self
                    .judge
                    .judge(
                        attempt.chapter_id,
                        attempt.score,
                        attempt.total_questions,
                        &attempt.reflection,
                    )
                    .await
                {
                    Ok(text) => (Verdict::Text(text.clone()), Some(text)),
                    Err(e) => {
                        warn!(
                            "Judgment unavailable for chapter {}: {}. Defaulting to NeedsReview.",
                            attempt.chapter_id, e
                        );
                        (Verdict::Unavailable, None)
                    }
                }
            };

        let state = evaluate_attempt(attempt.score, attempt.total_questions, &verdict);
        if state == ChapterState::Completed {
            self.store.mark_chapter_completed(attempt.chapter_id).await?;
            info!(
                "Chapter {} marked completed for {}.",
                attempt.chapter_id, attempt.owner
            );
        }

        Ok(SubmissionResult { state, feedback })
    }
}
