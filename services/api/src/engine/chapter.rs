//! services/api/src/engine/chapter.rs
//!
//! Chapter progression: "continue course" orchestration and quiz lookup.

use crate::engine::pool::TaskPool;
use dashmap::DashSet;
use std::sync::Arc;
use tracing::{error, info};
use tutor_core::domain::{Chapter, QuizQuestion};
use tutor_core::ports::{
    CurriculumStore, LessonService, PortError, PortResult, QuizAuthoringService,
};

/// The result of a "continue course" request.
#[derive(Debug)]
pub enum ContinueOutcome {
    /// The next chapter's lesson, with a note on whether its quiz is
    /// already available or still being authored.
    Lesson {
        chapter_id: i64,
        title: String,
        lesson: String,
        quiz_ready: bool,
    },
    /// Every chapter of the subject's newest curriculum is complete.
    AllComplete { subject: String },
}

pub struct ChapterService {
    store: Arc<dyn CurriculumStore>,
    lessons: Arc<dyn LessonService>,
    quizzes: Arc<dyn QuizAuthoringService>,
    pool: TaskPool,
    /// Chapters whose quiz authoring is currently in flight. Claimed
    /// before the existence check so two concurrent continue requests
    /// dispatch at most one generation job per chapter.
    quiz_in_flight: Arc<DashSet<i64>>,
}

impl ChapterService {
    pub fn new(
        store: Arc<dyn CurriculumStore>,
        lessons: Arc<dyn LessonService>,
        quizzes: Arc<dyn QuizAuthoringService>,
        pool: TaskPool,
    ) -> Self {
        Self {
            store,
            lessons,
            quizzes,
            pool,
            quiz_in_flight: Arc::new(DashSet::new()),
        }
    }

    /// Advances the owner to their next incomplete chapter.
    ///
    /// Lesson generation and, when no questions exist yet, quiz authoring
    /// are dispatched concurrently. The caller blocks only on the lesson;
    /// quiz authoring is fire-and-forget, guarded for at-most-once
    /// creation per chapter.
    pub async fn continue_course(&self, owner: &str, subject: &str) -> PortResult<ContinueOutcome> {
        let Some(chapter) = self.store.next_incomplete_chapter(owner, subject).await? else {
            return Ok(ContinueOutcome::AllComplete {
                subject: subject.to_string(),
            });
        };

        let quiz_ready = self.store.quiz_exists(chapter.id).await?;
        if !quiz_ready {
            self.dispatch_quiz_authoring(&chapter).await;
        }

        let lessons = Arc::clone(&self.lessons);
        let subject = subject.to_string();
        let title = chapter.title.clone();
        let description = chapter.description.clone();
        let lesson_handle = self
            .pool
            .submit(async move {
                lessons
                    .generate_lesson(&subject, &title, &description)
                    .await
            })
            .await?;
        let lesson = TaskPool::join(lesson_handle).await?;

        Ok(ContinueOutcome::Lesson {
            chapter_id: chapter.id,
            title: chapter.title,
            lesson,
            quiz_ready,
        })
    }

    /// Fetches the persisted quiz for a chapter, validating the chapter
    /// id first.
    pub async fn start_quiz(&self, chapter_id: i64) -> PortResult<Vec<QuizQuestion>> {
        self.store.fetch_chapter(chapter_id).await?;

        let questions = self.store.fetch_quiz_questions(chapter_id).await?;
        if questions.is_empty() {
            return Err(PortError::NotFound(format!(
                "No quiz questions found for chapter {}.",
                chapter_id
            )));
        }
        Ok(questions)
    }

    /// Claims the chapter and, if this call won the claim, spawns quiz
    /// authoring and persistence on the pool without awaiting it.
    async fn dispatch_quiz_authoring(&self, chapter: &Chapter) {
        if !self.quiz_in_flight.insert(chapter.id) {
            // Another request is already authoring this chapter's quiz.
            return;
        }

        let store = Arc::clone(&self.store);
        let quizzes = Arc::clone(&self.quizzes);
        let in_flight = Arc::clone(&self.quiz_in_flight);
        let chapter_id = chapter.id;
        let title = chapter.title.clone();
        let description = chapter.description.clone();

        let submitted = self
            .pool
            .submit(async move {
                let result = async {
                    // The claim beat the existence check, so re-check in
                    // case questions landed since.
                    if store.quiz_exists(chapter_id).await? {
                        return Ok(());
                    }
                    let questions = quizzes.generate_questions(&title, &description).await?;
                    store.insert_quiz_questions(chapter_id, &questions).await?;
                    info!("Quiz created and saved for chapter {}.", chapter_id);
                    Ok(())
                }
                .await;

                in_flight.remove(&chapter_id);
                result
            })
            .await;

        match submitted {
            // Fire-and-forget: drop the handle, the job runs on.
            Ok(_handle) => {}
            Err(e) => {
                self.quiz_in_flight.remove(&chapter.id);
                error!(
                    "Could not dispatch quiz authoring for chapter {}: {}",
                    chapter.id, e
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackpressurePolicy;
    use crate::engine::testutil::{MockLessons, MockQuizzes, MockStore};
    use std::time::Duration;

    fn service(
        store: Arc<MockStore>,
        quizzes: Arc<MockQuizzes>,
    ) -> Arc<ChapterService> {
        Arc::new(ChapterService::new(
            store,
            Arc::new(MockLessons::default()),
            quizzes,
            TaskPool::new("curriculum", 10, 32, BackpressurePolicy::Block),
        ))
    }

    async fn seeded_store() -> Arc<MockStore> {
        let store = Arc::new(MockStore::new());
        store
            .seed_curriculum("ada@example.com", "Rust", &["Ownership", "Borrowing"])
            .await;
        store
    }

    #[tokio::test]
    async fn continue_course_returns_the_lesson_for_the_next_chapter() {
        let store = seeded_store().await;
        let svc = service(store.clone(), Arc::new(MockQuizzes::default()));

        let outcome = svc.continue_course("ada@example.com", "Rust").await.unwrap();
        match outcome {
            ContinueOutcome::Lesson {
                title, quiz_ready, ..
            } => {
                assert_eq!(title, "Ownership");
                assert!(!quiz_ready);
            }
            other => panic!("expected a lesson, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn continue_course_rejects_an_unenrolled_subject() {
        let store = seeded_store().await;
        let svc = service(store.clone(), Arc::new(MockQuizzes::default()));

        let err = svc
            .continue_course("ada@example.com", "Piano")
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
    }

    #[tokio::test]
    async fn continue_course_scopes_to_the_newest_enrollment() {
        let store = Arc::new(MockStore::new());
        store
            .seed_curriculum("ada@example.com", "Rust", &["Old Intro"])
            .await;
        store
            .seed_curriculum("ada@example.com", "Rust", &["New Intro"])
            .await;
        let svc = service(store.clone(), Arc::new(MockQuizzes::default()));

        match svc.continue_course("ada@example.com", "Rust").await.unwrap() {
            ContinueOutcome::Lesson { title, .. } => assert_eq!(title, "New Intro"),
            other => panic!("expected a lesson, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn all_chapters_complete_is_reported_not_errored() {
        let store = seeded_store().await;
        store.complete_all_chapters();
        let svc = service(store.clone(), Arc::new(MockQuizzes::default()));

        let outcome = svc.continue_course("ada@example.com", "Rust").await.unwrap();
        assert!(matches!(outcome, ContinueOutcome::AllComplete { .. }));
    }

    #[tokio::test]
    async fn concurrent_continue_requests_author_the_quiz_exactly_once() {
        let store = seeded_store().await;
        // Slow generation keeps both requests inside the race window.
        let quizzes = Arc::new(MockQuizzes::with_delay(Duration::from_millis(50)));
        let svc = service(store.clone(), quizzes.clone());

        let a = {
            let svc = Arc::clone(&svc);
            tokio::spawn(async move { svc.continue_course("ada@example.com", "Rust").await })
        };
        let b = {
            let svc = Arc::clone(&svc);
            tokio::spawn(async move { svc.continue_course("ada@example.com", "Rust").await })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        // Wait for the fire-and-forget authoring to land.
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(quizzes.generation_count(), 1);
        assert_eq!(store.quiz_insert_count(), 1);
    }

    #[tokio::test]
    async fn second_continue_reports_the_quiz_ready_once_persisted() {
        let store = seeded_store().await;
        let svc = service(store.clone(), Arc::new(MockQuizzes::default()));

        svc.continue_course("ada@example.com", "Rust").await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let outcome = svc.continue_course("ada@example.com", "Rust").await.unwrap();
        match outcome {
            ContinueOutcome::Lesson { quiz_ready, .. } => assert!(quiz_ready),
            other => panic!("expected a lesson, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn start_quiz_rejects_unknown_chapters_and_missing_questions() {
        let store = seeded_store().await;
        let svc = service(store.clone(), Arc::new(MockQuizzes::default()));

        let err = svc.start_quiz(999).await.unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));

        // Chapter exists but has no questions yet.
        let err = svc.start_quiz(1).await.unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
    }
}
