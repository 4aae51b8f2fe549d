//! services/api/src/engine/mod.rs
//!
//! The session and progression engine: in-memory session state, the TTL
//! sweeper, bounded task pools, and the services that drive curricula,
//! chapters, quizzes, streaks, and chat turns.

pub mod chapter;
pub mod chat;
pub mod curriculum;
pub mod engagement;
pub mod pool;
pub mod quiz;
pub mod session;
pub mod sweeper;

#[cfg(test)]
pub mod testutil;

pub use chapter::{ChapterService, ContinueOutcome};
pub use chat::ChatService;
pub use curriculum::{CurriculumService, StudyIntention};
pub use engagement::EngagementService;
pub use pool::TaskPool;
pub use quiz::{QuizService, SubmissionResult};
pub use session::SessionStore;
pub use sweeper::SessionSweeper;
