//! services/api/src/engine/chat.rs
//!
//! One conversational turn, end to end: session lookup, history trimming,
//! feedback-summary refresh, context assembly, the tutor call, and streak
//! bookkeeping.

use crate::engine::engagement::EngagementService;
use crate::engine::session::SessionStore;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{info, warn};
use tutor_core::domain::{ConversationTurn, Role};
use tutor_core::history;
use tutor_core::ports::{
    CurriculumStore, FeedbackSummaryService, PortResult, Tokenizer, TutorService,
};

pub struct ChatService {
    sessions: Arc<SessionStore>,
    store: Arc<dyn CurriculumStore>,
    tutor: Arc<dyn TutorService>,
    summarizer: Arc<dyn FeedbackSummaryService>,
    tokenizer: Arc<dyn Tokenizer>,
    engagement: Arc<EngagementService>,
    token_budget: usize,
}

impl ChatService {
    pub fn new(
        sessions: Arc<SessionStore>,
        store: Arc<dyn CurriculumStore>,
        tutor: Arc<dyn TutorService>,
        summarizer: Arc<dyn FeedbackSummaryService>,
        tokenizer: Arc<dyn Tokenizer>,
        engagement: Arc<EngagementService>,
        token_budget: usize,
    ) -> Self {
        Self {
            sessions,
            store,
            tutor,
            summarizer,
            tokenizer,
            engagement,
            token_budget,
        }
    }

    /// Handles one user turn and returns the assistant's reply.
    pub async fn handle_turn(
        &self,
        owner: &str,
        input: &str,
        today: NaiveDate,
    ) -> PortResult<String> {
        // Trim the transcript to budget up front; the trimmed form is both
        // what we prompt with and what the session keeps.
        let (history, cached_summary) = self.sessions.with_session(owner, |session| {
            session.transcript =
                history::trim(&session.transcript, self.token_budget, self.tokenizer.as_ref());
            let cached = if session.feedback_dirty {
                None
            } else {
                session.feedback_summary.clone()
            };
            (session.transcript.clone(), cached)
        });
        let first_turn = history.is_empty();

        let summary = match cached_summary {
            Some(summary) => summary,
            None => self.refresh_feedback_summary(owner).await,
        };

        let context = if first_turn {
            self.initial_context(owner, &summary, input, today).await
        } else {
            turn_context(&summary, &history, input)
        };

        let reply = self.tutor.respond(owner, &context).await?;

        self.sessions.with_session(owner, |session| {
            session
                .transcript
                .push(ConversationTurn::new(Role::User, input));
            session
                .transcript
                .push(ConversationTurn::new(Role::Assistant, reply.clone()));
        });

        // A streak hiccup must not cost the user their answer.
        if let Err(e) = self.engagement.record_activity(owner, today).await {
            warn!("Failed to record engagement for {}: {}", owner, e);
        }

        Ok(reply)
    }

    /// Stores new feedback and invalidates the owner's cached summary so
    /// the next turn refreshes it. Last-writer-wins on the cache is the
    /// session store's documented behavior.
    pub async fn submit_feedback(&self, owner: &str, text: &str) -> PortResult<()> {
        self.store.insert_feedback(owner, text).await?;
        self.sessions.mark_feedback_dirty(owner);
        info!("Feedback stored for {}; summary marked stale.", owner);
        Ok(())
    }

    /// Fetches and summarizes recent feedback, caching the result. A
    /// summarizer failure degrades this turn to the no-feedback
    /// placeholder without touching the cache or the dirty flag, so the
    /// next turn retries instead of serving the placeholder all session.
    async fn refresh_feedback_summary(&self, owner: &str) -> String {
        match self.fetch_and_summarize(owner).await {
            Ok(summary) => {
                self.sessions.with_session(owner, |session| {
                    session.feedback_summary = Some(summary.clone());
                    session.feedback_dirty = false;
                });
                summary
            }
            Err(e) => {
                warn!("Feedback summary refresh failed for {}: {}", owner, e);
                "No past feedback found.".to_string()
            }
        }
    }

    async fn fetch_and_summarize(&self, owner: &str) -> PortResult<String> {
        let entries: Vec<String> = self
            .store
            .fetch_feedback(owner)
            .await?
            .into_iter()
            .map(|entry| entry.text)
            .collect();
        self.summarizer.summarize(&entries).await
    }

    /// The first-turn context: feedback summary plus today's scheduled
    /// chapters, so the tutor can nudge the user back into their courses.
    async fn initial_context(
        &self,
        owner: &str,
        summary: &str,
        input: &str,
        today: NaiveDate,
    ) -> String {
        let scheduled = match self.store.chapters_scheduled_on(owner, today).await {
            Ok(scheduled) => scheduled,
            Err(e) => {
                warn!("Could not fetch today's schedule for {}: {}", owner, e);
                Vec::new()
            }
        };

        if scheduled.is_empty() {
            format!(
                "**Summarized Feedback:**\n{}\n\n\
                 User doesn't have any scheduled chapters for today. \
                 Encourage them to continue their learning journey.\n\n\
                 **User Query**\n{}",
                summary, input
            )
        } else {
            let subjects: Vec<String> = scheduled
                .iter()
                .map(|(chapter, subject)| format!("- {} ({})", subject, chapter.title))
                .collect();
            format!(
                "**Summarized Feedback:**\n{}\n\n\
                 **Today's Date:** {}\n\
                 **Available Subjects:**\n{}\n\n\
                 Encourage them to continue their learning journey.\n\n\
                 **User Query**\n{}",
                summary,
                today,
                subjects.join("\n"),
                input
            )
        }
    }
}

/// The context for every turn after the first: summary, trimmed history,
/// and the new query.
fn turn_context(summary: &str, history: &[ConversationTurn], input: &str) -> String {
    let rendered: Vec<String> = history.iter().map(|turn| turn.prompt_text()).collect();
    format!(
        "**Summarized Feedback:**\n{}\n\n\
         **Conversation So Far:**\n{}\n\n\
         **User Query**\n{}",
        summary,
        rendered.join("\n"),
        input
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::tokenizer::CharEstimator;
    use crate::engine::testutil::{MockStore, MockSummarizer, MockTutor};

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    struct Fixture {
        store: Arc<MockStore>,
        tutor: Arc<MockTutor>,
        summarizer: Arc<MockSummarizer>,
        chat: ChatService,
    }

    fn fixture_with_budget(budget: usize) -> Fixture {
        build_fixture(budget, Arc::new(MockSummarizer::default()))
    }

    fn build_fixture(budget: usize, summarizer: Arc<MockSummarizer>) -> Fixture {
        let store = Arc::new(MockStore::new());
        let tutor = Arc::new(MockTutor::default());
        let sessions = Arc::new(SessionStore::new());
        let chat = ChatService::new(
            sessions,
            store.clone(),
            tutor.clone(),
            summarizer.clone(),
            Arc::new(CharEstimator),
            Arc::new(EngagementService::new(store.clone())),
            budget,
        );
        Fixture {
            store,
            tutor,
            summarizer,
            chat,
        }
    }

    fn fixture() -> Fixture {
        fixture_with_budget(3000)
    }

    #[tokio::test]
    async fn first_turn_context_carries_todays_schedule() {
        let f = fixture();
        f.store
            .seed_curriculum_starting(
                "ada@example.com",
                "Rust",
                &["Ownership"],
                date("2024-05-01"),
            )
            .await;

        f.chat
            .handle_turn("ada@example.com", "hi", date("2024-05-01"))
            .await
            .unwrap();

        let context = f.tutor.last_context();
        assert!(context.contains("**Today's Date:** 2024-05-01"));
        assert!(context.contains("- Rust (Ownership)"));
        assert!(context.contains("**User Query**\nhi"));
    }

    #[tokio::test]
    async fn later_turns_reuse_the_cached_summary_and_include_history() {
        let f = fixture();

        f.chat
            .handle_turn("ada@example.com", "first", date("2024-05-01"))
            .await
            .unwrap();
        f.chat
            .handle_turn("ada@example.com", "second", date("2024-05-01"))
            .await
            .unwrap();

        assert_eq!(f.summarizer.call_count(), 1);
        let context = f.tutor.last_context();
        assert!(context.contains("user: first"));
        assert!(context.contains("**User Query**\nsecond"));
    }

    #[tokio::test]
    async fn a_failed_summary_refresh_is_retried_on_the_next_turn() {
        let f = build_fixture(3000, Arc::new(MockSummarizer::failing(1)));

        // The failed refresh must not poison the cache.
        f.chat
            .handle_turn("ada@example.com", "first", date("2024-05-01"))
            .await
            .unwrap();
        f.chat
            .handle_turn("ada@example.com", "second", date("2024-05-01"))
            .await
            .unwrap();
        assert_eq!(f.summarizer.call_count(), 2);

        // Once a refresh succeeds it is cached again.
        f.chat
            .handle_turn("ada@example.com", "third", date("2024-05-01"))
            .await
            .unwrap();
        assert_eq!(f.summarizer.call_count(), 2);
    }

    #[tokio::test]
    async fn new_feedback_invalidates_the_cached_summary() {
        let f = fixture();

        f.chat
            .handle_turn("ada@example.com", "first", date("2024-05-01"))
            .await
            .unwrap();
        f.chat
            .submit_feedback("ada@example.com", "Please use shorter answers.")
            .await
            .unwrap();
        f.chat
            .handle_turn("ada@example.com", "second", date("2024-05-01"))
            .await
            .unwrap();

        assert_eq!(f.summarizer.call_count(), 2);
        assert_eq!(f.store.feedback_count("ada@example.com"), 1);
    }

    #[tokio::test]
    async fn a_tiny_budget_keeps_the_transcript_bounded() {
        let f = fixture_with_budget(10);

        for i in 0..5 {
            f.chat
                .handle_turn(
                    "ada@example.com",
                    &format!("question number {}", i),
                    date("2024-05-01"),
                )
                .await
                .unwrap();
        }

        // Each stored turn costs at least a few tokens; with a 10-token
        // budget the retained prefix of old turns must stay small.
        let context = f.tutor.last_context();
        assert!(!context.contains("question number 0"));
    }

    #[tokio::test]
    async fn a_turn_records_engagement_for_the_day() {
        let f = fixture();

        f.chat
            .handle_turn("ada@example.com", "hi", date("2024-05-01"))
            .await
            .unwrap();
        f.chat
            .handle_turn("ada@example.com", "hello again", date("2024-05-01"))
            .await
            .unwrap();

        let record = f.store.engagement_of("ada@example.com").unwrap();
        assert_eq!(record.current_streak, 1);
        assert_eq!(f.store.engagement_write_count(), 1);
    }
}
