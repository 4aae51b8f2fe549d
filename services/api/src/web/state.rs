//! services/api/src/web/state.rs
//!
//! The shared application state handed to every handler.

use crate::config::Config;
use crate::engine::{
    ChapterService, ChatService, CurriculumService, EngagementService, QuizService,
};
use std::sync::Arc;

/// Created once at startup and cloned into the router.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub chat: Arc<ChatService>,
    pub curricula: Arc<CurriculumService>,
    pub chapters: Arc<ChapterService>,
    pub quizzes: Arc<QuizService>,
    pub engagement: Arc<EngagementService>,
}
