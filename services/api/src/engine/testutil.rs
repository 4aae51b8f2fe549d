//! services/api/src/engine/testutil.rs
//!
//! In-memory fakes for the engine tests. `MockStore` mirrors the relational
//! store's contract (at-most-once question inserts, monotone completion,
//! newest-first feedback) so the services can be exercised without Postgres.

use async_trait::async_trait;
use chrono::{Days, NaiveDate, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tutor_core::domain::{
    Cadence, Chapter, Curriculum, EngagementRecord, FeedbackEntry, QuizAttempt, QuizQuestion,
};
use tutor_core::ports::{
    CurriculumStore, FeedbackSummaryService, JudgmentService, LessonService, PortError,
    PortResult, QuizAuthoringService, TutorService,
};

#[derive(Default)]
struct StoreInner {
    curricula: Vec<Curriculum>,
    chapters: Vec<Chapter>,
    questions: Vec<(i64, QuizQuestion)>,
    attempts: Vec<QuizAttempt>,
    feedback: Vec<FeedbackEntry>,
    engagement: Vec<EngagementRecord>,
    next_curriculum_id: i64,
    next_chapter_id: i64,
    quiz_inserts: usize,
    engagement_writes: usize,
}

pub struct MockStore {
    inner: Mutex<StoreInner>,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                next_curriculum_id: 1,
                next_chapter_id: 1,
                ..StoreInner::default()
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap()
    }

    /// Seeds a curriculum whose chapters start on 2024-01-01.
    pub async fn seed_curriculum(&self, owner: &str, subject: &str, titles: &[&str]) -> i64 {
        self.seed_curriculum_starting(
            owner,
            subject,
            titles,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        )
        .await
    }

    /// Seeds a curriculum with one chapter per title, scheduled daily from
    /// `start`. Chapter ids are assigned in title order.
    pub async fn seed_curriculum_starting(
        &self,
        owner: &str,
        subject: &str,
        titles: &[&str],
        start: NaiveDate,
    ) -> i64 {
        let id = self
            .insert_curriculum(owner, subject, Cadence::Daily, start, "goal", "goal")
            .await
            .unwrap();
        let rows: Vec<(String, String, NaiveDate)> = titles
            .iter()
            .enumerate()
            .map(|(i, title)| {
                (
                    title.to_string(),
                    format!("About {}", title),
                    start
                        .checked_add_days(Days::new(i as u64))
                        .unwrap_or(NaiveDate::MAX),
                )
            })
            .collect();
        self.batch_insert_chapters(id, &rows).await.unwrap();
        id
    }

    pub fn chapters_of(&self, curriculum_id: i64) -> Vec<(String, String, NaiveDate)> {
        self.lock()
            .chapters
            .iter()
            .filter(|c| c.curriculum_id == curriculum_id)
            .map(|c| (c.title.clone(), c.description.clone(), c.scheduled_date))
            .collect()
    }

    pub fn curriculum_count(&self) -> usize {
        self.lock().curricula.len()
    }

    pub fn complete_all_chapters(&self) {
        for chapter in self.lock().chapters.iter_mut() {
            chapter.completed = true;
        }
    }

    pub fn chapter_completed(&self, chapter_id: i64) -> bool {
        self.lock()
            .chapters
            .iter()
            .any(|c| c.id == chapter_id && c.completed)
    }

    /// How many question batches actually landed. A no-op re-insert for a
    /// chapter that already has a quiz does not count.
    pub fn quiz_insert_count(&self) -> usize {
        self.lock().quiz_inserts
    }

    pub fn attempt_count(&self) -> usize {
        self.lock().attempts.len()
    }

    pub fn feedback_count(&self, owner: &str) -> usize {
        self.lock()
            .feedback
            .iter()
            .filter(|f| f.owner == owner)
            .count()
    }

    pub fn engagement_of(&self, owner: &str) -> Option<EngagementRecord> {
        self.lock()
            .engagement
            .iter()
            .find(|r| r.owner == owner)
            .cloned()
    }

    pub fn engagement_write_count(&self) -> usize {
        self.lock().engagement_writes
    }
}

#[async_trait]
impl CurriculumStore for MockStore {
    async fn insert_curriculum(
        &self,
        owner: &str,
        subject: &str,
        cadence: Cadence,
        start_date: NaiveDate,
        goal_description: &str,
        learning_goal: &str,
    ) -> PortResult<i64> {
        let mut inner = self.lock();
        let id = inner.next_curriculum_id;
        inner.next_curriculum_id += 1;
        inner.curricula.push(Curriculum {
            id,
            owner: owner.to_string(),
            subject: subject.to_string(),
            cadence,
            start_date,
            goal_description: goal_description.to_string(),
            learning_goal: learning_goal.to_string(),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn batch_insert_chapters(
        &self,
        curriculum_id: i64,
        chapters: &[(String, String, NaiveDate)],
    ) -> PortResult<()> {
        let mut inner = self.lock();
        for (title, description, scheduled_date) in chapters {
            let id = inner.next_chapter_id;
            inner.next_chapter_id += 1;
            inner.chapters.push(Chapter {
                id,
                curriculum_id,
                title: title.clone(),
                description: description.clone(),
                scheduled_date: *scheduled_date,
                completed: false,
            });
        }
        Ok(())
    }

    async fn fetch_curricula(&self, owner: &str) -> PortResult<Vec<Curriculum>> {
        let mut found: Vec<Curriculum> = self
            .lock()
            .curricula
            .iter()
            .filter(|c| c.owner == owner)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(found)
    }

    async fn next_incomplete_chapter(
        &self,
        owner: &str,
        subject: &str,
    ) -> PortResult<Option<Chapter>> {
        let inner = self.lock();
        let curriculum = inner
            .curricula
            .iter()
            .filter(|c| c.owner == owner && c.subject.eq_ignore_ascii_case(subject))
            .max_by_key(|c| c.id);
        let Some(curriculum) = curriculum else {
            return Err(PortError::NotFound(format!(
                "No curriculum for subject '{}'.",
                subject
            )));
        };
        Ok(inner
            .chapters
            .iter()
            .filter(|ch| ch.curriculum_id == curriculum.id && !ch.completed)
            .min_by_key(|ch| ch.id)
            .cloned())
    }

    async fn fetch_chapter(&self, chapter_id: i64) -> PortResult<Chapter> {
        self.lock()
            .chapters
            .iter()
            .find(|c| c.id == chapter_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Chapter {} does not exist.", chapter_id)))
    }

    async fn chapters_scheduled_on(
        &self,
        owner: &str,
        date: NaiveDate,
    ) -> PortResult<Vec<(Chapter, String)>> {
        let inner = self.lock();
        let mut out = Vec::new();
        for chapter in &inner.chapters {
            if chapter.completed || chapter.scheduled_date != date {
                continue;
            }
            let subject = inner
                .curricula
                .iter()
                .find(|c| c.id == chapter.curriculum_id && c.owner == owner)
                .map(|c| c.subject.clone());
            if let Some(subject) = subject {
                out.push((chapter.clone(), subject));
            }
        }
        Ok(out)
    }

    async fn mark_chapter_completed(&self, chapter_id: i64) -> PortResult<()> {
        let mut inner = self.lock();
        match inner.chapters.iter_mut().find(|c| c.id == chapter_id) {
            Some(chapter) => {
                chapter.completed = true;
                Ok(())
            }
            None => Err(PortError::NotFound(format!(
                "Chapter {} does not exist.",
                chapter_id
            ))),
        }
    }

    async fn quiz_exists(&self, chapter_id: i64) -> PortResult<bool> {
        Ok(self
            .lock()
            .questions
            .iter()
            .any(|(id, _)| *id == chapter_id))
    }

    async fn insert_quiz_questions(
        &self,
        chapter_id: i64,
        questions: &[QuizQuestion],
    ) -> PortResult<()> {
        let mut inner = self.lock();
        if inner.questions.iter().any(|(id, _)| *id == chapter_id) {
            return Ok(());
        }
        for question in questions {
            inner.questions.push((chapter_id, question.clone()));
        }
        inner.quiz_inserts += 1;
        Ok(())
    }

    async fn fetch_quiz_questions(&self, chapter_id: i64) -> PortResult<Vec<QuizQuestion>> {
        Ok(self
            .lock()
            .questions
            .iter()
            .filter(|(id, _)| *id == chapter_id)
            .map(|(_, q)| q.clone())
            .collect())
    }

    async fn insert_quiz_attempt(&self, attempt: &QuizAttempt) -> PortResult<()> {
        self.lock().attempts.push(attempt.clone());
        Ok(())
    }

    async fn insert_feedback(&self, owner: &str, text: &str) -> PortResult<()> {
        self.lock().feedback.push(FeedbackEntry {
            owner: owner.to_string(),
            text: text.to_string(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn fetch_feedback(&self, owner: &str) -> PortResult<Vec<FeedbackEntry>> {
        let inner = self.lock();
        Ok(inner
            .feedback
            .iter()
            .rev()
            .filter(|f| f.owner == owner)
            .take(10)
            .cloned()
            .collect())
    }

    async fn fetch_engagement(&self, owner: &str) -> PortResult<Option<EngagementRecord>> {
        Ok(self.engagement_of(owner))
    }

    async fn upsert_engagement(&self, record: &EngagementRecord) -> PortResult<()> {
        let mut inner = self.lock();
        inner.engagement_writes += 1;
        match inner.engagement.iter_mut().find(|r| r.owner == record.owner) {
            Some(existing) => *existing = record.clone(),
            None => inner.engagement.push(record.clone()),
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MockLessons;

#[async_trait]
impl LessonService for MockLessons {
    async fn generate_lesson(
        &self,
        subject: &str,
        title: &str,
        _description: &str,
    ) -> PortResult<String> {
        Ok(format!("A lesson on {} ({}).", title, subject))
    }
}

#[derive(Default)]
pub struct MockQuizzes {
    delay: Option<Duration>,
    generations: AtomicUsize,
}

impl MockQuizzes {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            generations: AtomicUsize::new(0),
        }
    }

    pub fn generation_count(&self) -> usize {
        self.generations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuizAuthoringService for MockQuizzes {
    async fn generate_questions(
        &self,
        title: &str,
        _description: &str,
    ) -> PortResult<Vec<QuizQuestion>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.generations.fetch_add(1, Ordering::SeqCst);
        Ok(vec![QuizQuestion {
            question: format!("What is the key idea of {}?", title),
            options: [
                "Option one".to_string(),
                "Option two".to_string(),
                "Option three".to_string(),
                "Option four".to_string(),
            ],
            correct_option: 'A',
        }])
    }
}

pub struct MockJudge {
    verdict: Option<String>,
    calls: AtomicUsize,
}

impl MockJudge {
    pub fn with_verdict(verdict: &str) -> Self {
        Self {
            verdict: Some(verdict.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn erroring() -> Self {
        Self {
            verdict: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JudgmentService for MockJudge {
    async fn judge(
        &self,
        _chapter_id: i64,
        _score: u32,
        _total_questions: u32,
        _reflection: &str,
    ) -> PortResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.verdict {
            Some(verdict) => Ok(verdict.clone()),
            None => Err(PortError::Unexpected("judge offline".to_string())),
        }
    }
}

#[derive(Default)]
pub struct MockTutor {
    last_context: Mutex<String>,
}

impl MockTutor {
    pub fn last_context(&self) -> String {
        self.last_context.lock().unwrap().clone()
    }
}

#[async_trait]
impl TutorService for MockTutor {
    async fn respond(&self, _owner: &str, context: &str) -> PortResult<String> {
        *self.last_context.lock().unwrap() = context.to_string();
        Ok("Happy to help with that.".to_string())
    }
}

#[derive(Default)]
pub struct MockSummarizer {
    calls: AtomicUsize,
    failures: AtomicUsize,
}

impl MockSummarizer {
    /// Fails the first `times` summarize calls, then succeeds.
    pub fn failing(times: usize) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failures: AtomicUsize::new(times),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedbackSummaryService for MockSummarizer {
    async fn summarize(&self, entries: &[String]) -> PortResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failures.load(Ordering::SeqCst) > 0 {
            self.failures.fetch_sub(1, Ordering::SeqCst);
            return Err(PortError::Unexpected("summarizer offline".to_string()));
        }
        if entries.is_empty() {
            Ok("No past feedback found.".to_string())
        } else {
            Ok("Prefer shorter, concrete answers.".to_string())
        }
    }
}
