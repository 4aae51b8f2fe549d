pub mod domain;
pub mod history;
pub mod ports;
pub mod progress;
pub mod schedule;
pub mod streak;

pub use domain::{
    Cadence, Chapter, ChapterOutline, ConversationTurn, Curriculum, EngagementRecord,
    FeedbackEntry, QuizAttempt, QuizQuestion, Role,
};
pub use ports::{
    CurriculumStore, FeedbackSummaryService, JudgmentService, LessonService, PortError,
    PortResult, QuizAuthoringService, Tokenizer, TutorService,
};
pub use progress::{ChapterState, Verdict};
