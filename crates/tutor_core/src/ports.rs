//! crates/tutor_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the engine's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or LLMs.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::{
    Cadence, Chapter, Curriculum, EngagementRecord, FeedbackEntry, QuizAttempt, QuizQuestion,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Worker pool saturated: {0}")]
    PoolSaturated(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Tokenizer Port (synchronous)
//=========================================================================================

/// Counts the tokens of a text span. Pluggable so an exact, model-specific
/// counter can replace the default estimator without touching the trimmer.
pub trait Tokenizer: Send + Sync {
    fn count_tokens(&self, text: &str) -> usize;
}

//=========================================================================================
// Persistent Store Port
//=========================================================================================

#[async_trait]
pub trait CurriculumStore: Send + Sync {
    // --- Curriculum & Chapters ---
    async fn insert_curriculum(
        &self,
        owner: &str,
        subject: &str,
        cadence: Cadence,
        start_date: NaiveDate,
        goal_description: &str,
        learning_goal: &str,
    ) -> PortResult<i64>;

    /// Persists all chapters of a curriculum in a single transaction, so a
    /// caller observes either full success or a reported failure.
    async fn batch_insert_chapters(
        &self,
        curriculum_id: i64,
        chapters: &[(String, String, NaiveDate)],
    ) -> PortResult<()>;

    async fn fetch_curricula(&self, owner: &str) -> PortResult<Vec<Curriculum>>;

    /// The next incomplete chapter of the newest curriculum for `subject`,
    /// or `None` when every chapter is done.
    async fn next_incomplete_chapter(
        &self,
        owner: &str,
        subject: &str,
    ) -> PortResult<Option<Chapter>>;

    async fn fetch_chapter(&self, chapter_id: i64) -> PortResult<Chapter>;

    /// Incomplete chapters scheduled for exactly `date`, across all of the
    /// owner's curricula, paired with the curriculum subject.
    async fn chapters_scheduled_on(
        &self,
        owner: &str,
        date: NaiveDate,
    ) -> PortResult<Vec<(Chapter, String)>>;

    /// Marks a chapter completed. Monotone: never clears an existing flag.
    async fn mark_chapter_completed(&self, chapter_id: i64) -> PortResult<()>;

    // --- Quiz ---
    async fn quiz_exists(&self, chapter_id: i64) -> PortResult<bool>;

    /// Persists a generated question set. Implementations must keep this
    /// at-most-once per chapter: a second insert for the same chapter is a
    /// silent no-op.
    async fn insert_quiz_questions(
        &self,
        chapter_id: i64,
        questions: &[QuizQuestion],
    ) -> PortResult<()>;

    async fn fetch_quiz_questions(&self, chapter_id: i64) -> PortResult<Vec<QuizQuestion>>;

    async fn insert_quiz_attempt(&self, attempt: &QuizAttempt) -> PortResult<()>;

    // --- Feedback ---
    async fn insert_feedback(&self, owner: &str, text: &str) -> PortResult<()>;

    /// The most recent feedback entries for an owner, newest first.
    async fn fetch_feedback(&self, owner: &str) -> PortResult<Vec<FeedbackEntry>>;

    // --- Engagement ---
    async fn fetch_engagement(&self, owner: &str) -> PortResult<Option<EngagementRecord>>;

    async fn upsert_engagement(&self, record: &EngagementRecord) -> PortResult<()>;
}

//=========================================================================================
// Language-Model Collaborator Ports
//=========================================================================================

#[async_trait]
pub trait LessonService: Send + Sync {
    /// Produces the step-by-step lesson text for a chapter.
    async fn generate_lesson(
        &self,
        subject: &str,
        title: &str,
        description: &str,
    ) -> PortResult<String>;
}

#[async_trait]
pub trait QuizAuthoringService: Send + Sync {
    /// Authors the multiple-choice question set for a chapter. The adapter
    /// is responsible for parsing the model output defensively.
    async fn generate_questions(
        &self,
        title: &str,
        description: &str,
    ) -> PortResult<Vec<QuizQuestion>>;
}

#[async_trait]
pub trait JudgmentService: Send + Sync {
    /// Renders a free-form pass/fail verdict on a quiz performance plus
    /// reflection. The progress engine parses it; it is never trusted raw.
    async fn judge(
        &self,
        chapter_id: i64,
        score: u32,
        total_questions: u32,
        reflection: &str,
    ) -> PortResult<String>;
}

#[async_trait]
pub trait FeedbackSummaryService: Send + Sync {
    /// Condenses recent feedback entries into a short actionable summary.
    async fn summarize(&self, entries: &[String]) -> PortResult<String>;
}

#[async_trait]
pub trait TutorService: Send + Sync {
    /// The main conversational model call for one turn. `context` carries
    /// the trimmed history, feedback summary, and any schedule reminder.
    async fn respond(&self, owner: &str, context: &str) -> PortResult<String>;
}
