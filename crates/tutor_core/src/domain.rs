//! crates/tutor_core/src/domain.rs
//!
//! Defines the pure, core data structures for the tutoring engine.
//! These structs are independent of any database or serialization format
//! used at the edges; serde derives exist only for the API boundary.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The speaker of a single conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// The prefix used when a turn is rendered into a prompt, and when
    /// its token cost is measured.
    pub fn prefix(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One message in a conversation transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// The role-prefixed form whose token cost the history trimmer measures.
    pub fn prompt_text(&self) -> String {
        format!("{}: {}", self.role.prefix(), self.content)
    }
}

/// How often the user committed to studying. Controls chapter spacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cadence {
    Daily,
    Weekly,
    TwiceAWeek,
    Monthly,
}

impl Cadence {
    /// The spacing between consecutive chapters, in days. `TwiceAWeek`
    /// is fractional; the scheduler floors the accumulated offset.
    pub fn interval_days(self) -> f64 {
        match self {
            Cadence::Daily => 1.0,
            Cadence::Weekly => 7.0,
            Cadence::TwiceAWeek => 3.5,
            Cadence::Monthly => 30.0,
        }
    }

    /// Parses a user-supplied commitment level. Unrecognized values fall
    /// back to `Weekly`, matching the enrollment form's default.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "daily" => Cadence::Daily,
            "weekly" => Cadence::Weekly,
            "twice a week" | "twice-a-week" => Cadence::TwiceAWeek,
            "monthly" => Cadence::Monthly,
            _ => Cadence::Weekly,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Cadence::Daily => "Daily",
            Cadence::Weekly => "Weekly",
            Cadence::TwiceAWeek => "Twice a Week",
            Cadence::Monthly => "Monthly",
        }
    }
}

/// A course of study created from one enrollment. A user may hold several
/// curricula; the most recent `created_at` for a subject is the current one.
#[derive(Debug, Clone)]
pub struct Curriculum {
    pub id: i64,
    pub owner: String,
    pub subject: String,
    pub cadence: Cadence,
    pub start_date: NaiveDate,
    pub goal_description: String,
    pub learning_goal: String,
    pub created_at: DateTime<Utc>,
}

/// The title/description pair the enrollment flow supplies for each
/// chapter before anything is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterOutline {
    pub title: String,
    pub description: String,
}

/// A scheduled unit of a curriculum. `scheduled_date` is assigned at
/// creation time and never recomputed; `completed` only ever moves
/// false -> true.
#[derive(Debug, Clone)]
pub struct Chapter {
    pub id: i64,
    pub curriculum_id: i64,
    pub title: String,
    pub description: String,
    pub scheduled_date: NaiveDate,
    pub completed: bool,
}

/// A single multiple-choice question authored for a chapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: [String; 4],
    /// One of 'A'..='D'.
    pub correct_option: char,
}

/// One row of the append-only quiz attempt log.
#[derive(Debug, Clone)]
pub struct QuizAttempt {
    pub chapter_id: i64,
    pub owner: String,
    pub score: u32,
    pub total_questions: u32,
    pub reflection: String,
    pub taken_at: DateTime<Utc>,
}

/// Daily streak bookkeeping, one record per owner, mutated at most once
/// per calendar day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngagementRecord {
    pub owner: String,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_active_date: NaiveDate,
}

/// A stored piece of user feedback on the assistant's behavior.
#[derive(Debug, Clone)]
pub struct FeedbackEntry {
    pub owner: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}
