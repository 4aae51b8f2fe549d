//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `CurriculumStore` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.
//!
//! Every engine job that touches persistence goes through the shared `PgPool`,
//! which hands each job its own pooled connection; jobs never share a single
//! connection handle.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool};
use tutor_core::domain::{
    Cadence, Chapter, Curriculum, EngagementRecord, FeedbackEntry, QuizAttempt, QuizQuestion,
};
use tutor_core::ports::{CurriculumStore, PortError, PortResult};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `CurriculumStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct CurriculumRecord {
    curriculum_id: i64,
    owner: String,
    subject: String,
    cadence: String,
    start_date: NaiveDate,
    goal_description: String,
    learning_goal: String,
    created_at: DateTime<Utc>,
}
impl CurriculumRecord {
    fn to_domain(self) -> Curriculum {
        Curriculum {
            id: self.curriculum_id,
            owner: self.owner,
            subject: self.subject,
            cadence: Cadence::parse(&self.cadence),
            start_date: self.start_date,
            goal_description: self.goal_description,
            learning_goal: self.learning_goal,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct ChapterRecord {
    chapter_id: i64,
    curriculum_id: i64,
    title: String,
    description: String,
    scheduled_date: NaiveDate,
    is_completed: bool,
}
impl ChapterRecord {
    fn to_domain(self) -> Chapter {
        Chapter {
            id: self.chapter_id,
            curriculum_id: self.curriculum_id,
            title: self.title,
            description: self.description,
            scheduled_date: self.scheduled_date,
            completed: self.is_completed,
        }
    }
}

#[derive(FromRow)]
struct ScheduledChapterRecord {
    chapter_id: i64,
    curriculum_id: i64,
    title: String,
    description: String,
    scheduled_date: NaiveDate,
    is_completed: bool,
    subject: String,
}
impl ScheduledChapterRecord {
    fn to_domain(self) -> (Chapter, String) {
        (
            Chapter {
                id: self.chapter_id,
                curriculum_id: self.curriculum_id,
                title: self.title,
                description: self.description,
                scheduled_date: self.scheduled_date,
                completed: self.is_completed,
            },
            self.subject,
        )
    }
}

#[derive(FromRow)]
struct QuizQuestionRecord {
    question_text: String,
    option_a: String,
    option_b: String,
    option_c: String,
    option_d: String,
    correct_option: String,
}
impl QuizQuestionRecord {
    fn to_domain(self) -> QuizQuestion {
        QuizQuestion {
            question: self.question_text,
            options: [self.option_a, self.option_b, self.option_c, self.option_d],
            correct_option: self.correct_option.chars().next().unwrap_or('A'),
        }
    }
}

#[derive(FromRow)]
struct FeedbackRecord {
    owner: String,
    feedback_text: String,
    created_at: DateTime<Utc>,
}
impl FeedbackRecord {
    fn to_domain(self) -> FeedbackEntry {
        FeedbackEntry {
            owner: self.owner,
            text: self.feedback_text,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct StreakRecord {
    owner: String,
    current_streak: i32,
    longest_streak: i32,
    last_active_date: NaiveDate,
}
impl StreakRecord {
    fn to_domain(self) -> EngagementRecord {
        EngagementRecord {
            owner: self.owner,
            current_streak: self.current_streak.max(0) as u32,
            longest_streak: self.longest_streak.max(0) as u32,
            last_active_date: self.last_active_date,
        }
    }
}

//=========================================================================================
// `CurriculumStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl CurriculumStore for DbAdapter {
    async fn insert_curriculum(
        &self,
        owner: &str,
        subject: &str,
        cadence: Cadence,
        start_date: NaiveDate,
        goal_description: &str,
        learning_goal: &str,
    ) -> PortResult<i64> {
        let curriculum_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO curriculums (owner, subject, cadence, start_date, goal_description, learning_goal)
            VALUES ($1, INITCAP(SUBSTRING($2 FROM 1 FOR 1)) || LOWER(SUBSTRING($2 FROM 2)), $3, $4, $5, $6)
            RETURNING curriculum_id
            "#,
        )
        .bind(owner)
        .bind(subject)
        .bind(cadence.as_str())
        .bind(start_date)
        .bind(goal_description)
        .bind(learning_goal)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(curriculum_id)
    }

    async fn batch_insert_chapters(
        &self,
        curriculum_id: i64,
        chapters: &[(String, String, NaiveDate)],
    ) -> PortResult<()> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        for (title, description, scheduled_date) in chapters {
            sqlx::query(
                r#"
                INSERT INTO curriculum_chapters (curriculum_id, title, description, scheduled_date)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(curriculum_id)
            .bind(title)
            .bind(description)
            .bind(scheduled_date)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        }

        tx.commit().await.map_err(unexpected)?;
        Ok(())
    }

    async fn fetch_curricula(&self, owner: &str) -> PortResult<Vec<Curriculum>> {
        let records = sqlx::query_as::<_, CurriculumRecord>(
            r#"
            SELECT curriculum_id, owner, subject, cadence, start_date,
                   goal_description, learning_goal, created_at
            FROM curriculums
            WHERE owner = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn next_incomplete_chapter(
        &self,
        owner: &str,
        subject: &str,
    ) -> PortResult<Option<Chapter>> {
        // Resolve the newest enrollment first: "not enrolled" is an error,
        // while "enrolled but every chapter done" is `None`. A single
        // joined query cannot tell those two zero-row cases apart.
        let curriculum_id: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT curriculum_id
            FROM curriculums
            WHERE owner = $1
              AND LOWER(subject) = LOWER($2)
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(owner)
        .bind(subject)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        let Some(curriculum_id) = curriculum_id else {
            return Err(PortError::NotFound(format!(
                "No curriculum for subject '{}'.",
                subject
            )));
        };

        let record = sqlx::query_as::<_, ChapterRecord>(
            r#"
            SELECT chapter_id, curriculum_id, title, description,
                   scheduled_date, is_completed
            FROM curriculum_chapters
            WHERE curriculum_id = $1
              AND is_completed = FALSE
            ORDER BY chapter_id ASC
            LIMIT 1
            "#,
        )
        .bind(curriculum_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(record.map(|r| r.to_domain()))
    }

    async fn fetch_chapter(&self, chapter_id: i64) -> PortResult<Chapter> {
        let record = sqlx::query_as::<_, ChapterRecord>(
            r#"
            SELECT chapter_id, curriculum_id, title, description, scheduled_date, is_completed
            FROM curriculum_chapters
            WHERE chapter_id = $1
            "#,
        )
        .bind(chapter_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                PortError::NotFound(format!("Chapter {} not found", chapter_id))
            }
            _ => unexpected(e),
        })?;

        Ok(record.to_domain())
    }

    async fn chapters_scheduled_on(
        &self,
        owner: &str,
        date: NaiveDate,
    ) -> PortResult<Vec<(Chapter, String)>> {
        let records = sqlx::query_as::<_, ScheduledChapterRecord>(
            r#"
            SELECT cc.chapter_id, cc.curriculum_id, cc.title, cc.description,
                   cc.scheduled_date, cc.is_completed, cu.subject
            FROM curriculum_chapters cc
            JOIN curriculums cu ON cc.curriculum_id = cu.curriculum_id
            WHERE cu.owner = $1
              AND cc.scheduled_date = $2
              AND cc.is_completed = FALSE
            ORDER BY cc.scheduled_date ASC
            "#,
        )
        .bind(owner)
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn mark_chapter_completed(&self, chapter_id: i64) -> PortResult<()> {
        // Monotone by construction: the flag is only ever set, never cleared.
        sqlx::query(
            r#"
            UPDATE curriculum_chapters
            SET is_completed = TRUE
            WHERE chapter_id = $1
            "#,
        )
        .bind(chapter_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(())
    }

    async fn quiz_exists(&self, chapter_id: i64) -> PortResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM quiz_questions WHERE chapter_id = $1)",
        )
        .bind(chapter_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(exists)
    }

    async fn insert_quiz_questions(
        &self,
        chapter_id: i64,
        questions: &[QuizQuestion],
    ) -> PortResult<()> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        // Re-check inside the transaction so a concurrent writer that won the
        // race leaves this insert as a no-op rather than a duplicate set.
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM quiz_questions WHERE chapter_id = $1)",
        )
        .bind(chapter_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;

        if exists {
            return Ok(());
        }

        for question in questions {
            sqlx::query(
                r#"
                INSERT INTO quiz_questions
                    (chapter_id, question_text, option_a, option_b, option_c, option_d, correct_option)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(chapter_id)
            .bind(&question.question)
            .bind(&question.options[0])
            .bind(&question.options[1])
            .bind(&question.options[2])
            .bind(&question.options[3])
            .bind(question.correct_option.to_string())
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        }

        tx.commit().await.map_err(unexpected)?;
        Ok(())
    }

    async fn fetch_quiz_questions(&self, chapter_id: i64) -> PortResult<Vec<QuizQuestion>> {
        let records = sqlx::query_as::<_, QuizQuestionRecord>(
            r#"
            SELECT question_text, option_a, option_b, option_c, option_d, correct_option
            FROM quiz_questions
            WHERE chapter_id = $1
            ORDER BY question_id ASC
            "#,
        )
        .bind(chapter_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn insert_quiz_attempt(&self, attempt: &QuizAttempt) -> PortResult<()> {
        sqlx::query(
            r#"
            INSERT INTO quiz_attempts (chapter_id, owner, score, total_questions, reflection, taken_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(attempt.chapter_id)
        .bind(&attempt.owner)
        .bind(attempt.score as i32)
        .bind(attempt.total_questions as i32)
        .bind(&attempt.reflection)
        .bind(attempt.taken_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(())
    }

    async fn insert_feedback(&self, owner: &str, text: &str) -> PortResult<()> {
        sqlx::query("INSERT INTO feedback (owner, feedback_text) VALUES ($1, $2)")
            .bind(owner)
            .bind(text)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;

        Ok(())
    }

    async fn fetch_feedback(&self, owner: &str) -> PortResult<Vec<FeedbackEntry>> {
        let records = sqlx::query_as::<_, FeedbackRecord>(
            r#"
            SELECT owner, feedback_text, created_at
            FROM feedback
            WHERE owner = $1
            ORDER BY created_at DESC
            LIMIT 10
            "#,
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn fetch_engagement(&self, owner: &str) -> PortResult<Option<EngagementRecord>> {
        let record = sqlx::query_as::<_, StreakRecord>(
            r#"
            SELECT owner, current_streak, longest_streak, last_active_date
            FROM user_streaks
            WHERE owner = $1
            "#,
        )
        .bind(owner)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(record.map(|r| r.to_domain()))
    }

    async fn upsert_engagement(&self, record: &EngagementRecord) -> PortResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_streaks (owner, current_streak, longest_streak, last_active_date)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (owner) DO UPDATE
            SET current_streak = EXCLUDED.current_streak,
                longest_streak = GREATEST(user_streaks.longest_streak, EXCLUDED.longest_streak),
                last_active_date = EXCLUDED.last_active_date
            "#,
        )
        .bind(&record.owner)
        .bind(record.current_streak as i32)
        .bind(record.longest_streak as i32)
        .bind(record.last_active_date)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(())
    }
}
