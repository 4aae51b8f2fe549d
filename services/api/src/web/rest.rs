//! services/api/src/web/rest.rs
//!
//! Axum handlers for the REST API. Payload structs live next to the
//! handlers that use them; port errors are mapped to HTTP statuses in one
//! place.

use crate::engine::{ContinueOutcome, StudyIntention};
use crate::web::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use tutor_core::domain::{Cadence, ChapterOutline, Curriculum, QuizAttempt, QuizQuestion};
use tutor_core::ports::PortError;

//=========================================================================================
// Error Mapping
//=========================================================================================

fn port_error_response(e: PortError) -> (StatusCode, String) {
    match e {
        PortError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        PortError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
        PortError::PoolSaturated(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        PortError::Unexpected(msg) => {
            error!("Unexpected port error: {}", msg);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal error occurred.".to_string(),
            )
        }
    }
}

//=========================================================================================
// Chat & Feedback
//=========================================================================================

#[derive(Deserialize)]
pub struct ChatRequest {
    pub owner: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

/// One conversational turn.
pub async fn chat_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<ChatRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let reply = app_state
        .chat
        .handle_turn(&payload.owner, &payload.message, Utc::now().date_naive())
        .await
        .map_err(port_error_response)?;
    Ok(Json(ChatResponse { reply }))
}

#[derive(Deserialize)]
pub struct FeedbackRequest {
    pub owner: String,
    pub text: String,
}

/// Stores tutoring feedback; the owner's cached summary is refreshed on
/// their next turn.
pub async fn feedback_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<FeedbackRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    app_state
        .chat
        .submit_feedback(&payload.owner, &payload.text)
        .await
        .map_err(port_error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Curricula
//=========================================================================================

#[derive(Deserialize)]
pub struct ChapterOutlinePayload {
    pub title: String,
    pub description: String,
}

#[derive(Deserialize)]
pub struct CurriculumRequest {
    pub owner: String,
    pub subject: String,
    pub cadence: String,
    pub start_date: NaiveDate,
    pub goal_description: String,
    pub learning_goal: String,
    pub chapters: Vec<ChapterOutlinePayload>,
}

impl CurriculumRequest {
    fn into_intention(self) -> StudyIntention {
        StudyIntention {
            owner: self.owner,
            subject: self.subject,
            cadence: Cadence::parse(&self.cadence),
            start_date: self.start_date,
            goal_description: self.goal_description,
            learning_goal: self.learning_goal,
            outlines: self
                .chapters
                .into_iter()
                .map(|c| ChapterOutline {
                    title: c.title,
                    description: c.description,
                })
                .collect(),
        }
    }
}

#[derive(Serialize)]
pub struct CreateCurriculumResponse {
    pub curriculum_id: i64,
}

/// Creates a curriculum synchronously; the caller gets its id.
pub async fn create_curriculum_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<CurriculumRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let curriculum_id = app_state
        .curricula
        .create_curriculum(&payload.into_intention())
        .await
        .map_err(port_error_response)?;
    Ok((
        StatusCode::CREATED,
        Json(CreateCurriculumResponse { curriculum_id }),
    ))
}

#[derive(Serialize)]
pub struct IntakeResponse {
    pub message: String,
}

/// Accepts a study intention; the curriculum is created in the background.
pub async fn study_intention_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<CurriculumRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let message = app_state
        .curricula
        .intake(payload.into_intention())
        .await
        .map_err(port_error_response)?;
    Ok((StatusCode::ACCEPTED, Json(IntakeResponse { message })))
}

#[derive(Deserialize)]
pub struct OwnerQuery {
    pub owner: String,
}

#[derive(Serialize)]
pub struct CurriculumSummary {
    pub id: i64,
    pub subject: String,
    pub cadence: String,
    pub start_date: NaiveDate,
    pub goal_description: String,
    pub learning_goal: String,
}

impl From<Curriculum> for CurriculumSummary {
    fn from(c: Curriculum) -> Self {
        Self {
            id: c.id,
            subject: c.subject,
            cadence: c.cadence.as_str().to_string(),
            start_date: c.start_date,
            goal_description: c.goal_description,
            learning_goal: c.learning_goal,
        }
    }
}

/// Lists the owner's curricula, newest first.
pub async fn list_curricula_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<OwnerQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let curricula = app_state
        .curricula
        .enrollments(&query.owner)
        .await
        .map_err(port_error_response)?;
    let summaries: Vec<CurriculumSummary> =
        curricula.into_iter().map(CurriculumSummary::from).collect();
    Ok(Json(summaries))
}

//=========================================================================================
// Chapters & Quizzes
//=========================================================================================

#[derive(Deserialize)]
pub struct ContinueRequest {
    pub owner: String,
    pub subject: String,
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ContinueResponse {
    Lesson {
        chapter_id: i64,
        title: String,
        lesson: String,
        quiz_ready: bool,
    },
    AllComplete {
        subject: String,
    },
}

/// Advances the owner to their next incomplete chapter.
pub async fn continue_course_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<ContinueRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let outcome = app_state
        .chapters
        .continue_course(&payload.owner, &payload.subject)
        .await
        .map_err(port_error_response)?;
    let response = match outcome {
        ContinueOutcome::Lesson {
            chapter_id,
            title,
            lesson,
            quiz_ready,
        } => ContinueResponse::Lesson {
            chapter_id,
            title,
            lesson,
            quiz_ready,
        },
        ContinueOutcome::AllComplete { subject } => ContinueResponse::AllComplete { subject },
    };
    Ok(Json(response))
}

#[derive(Serialize)]
pub struct QuizQuestionPayload {
    pub question: String,
    pub options: [String; 4],
    pub correct_option: char,
}

impl From<QuizQuestion> for QuizQuestionPayload {
    fn from(q: QuizQuestion) -> Self {
        Self {
            question: q.question,
            options: q.options,
            correct_option: q.correct_option,
        }
    }
}

/// Fetches the persisted quiz for a chapter.
pub async fn start_quiz_handler(
    State(app_state): State<Arc<AppState>>,
    Path(chapter_id): Path<i64>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let questions = app_state
        .chapters
        .start_quiz(chapter_id)
        .await
        .map_err(port_error_response)?;
    let payload: Vec<QuizQuestionPayload> =
        questions.into_iter().map(QuizQuestionPayload::from).collect();
    Ok(Json(payload))
}

#[derive(Deserialize)]
pub struct AttemptRequest {
    pub owner: String,
    pub chapter_id: i64,
    pub score: u32,
    pub total_questions: u32,
    pub reflection: String,
}

#[derive(Serialize)]
pub struct AttemptResponse {
    pub state: String,
    pub feedback: Option<String>,
}

/// Submits a quiz attempt and reports the chapter's resulting state.
pub async fn submit_attempt_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<AttemptRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let attempt = QuizAttempt {
        chapter_id: payload.chapter_id,
        owner: payload.owner,
        score: payload.score,
        total_questions: payload.total_questions,
        reflection: payload.reflection,
        taken_at: Utc::now(),
    };
    let result = app_state
        .quizzes
        .submit_attempt(attempt)
        .await
        .map_err(port_error_response)?;
    Ok(Json(AttemptResponse {
        state: result.state.to_string(),
        feedback: result.feedback,
    }))
}

//=========================================================================================
// Engagement
//=========================================================================================

#[derive(Serialize)]
pub struct EngagementResponse {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_active_date: Option<NaiveDate>,
}

/// The owner's streak standing; all zeroes if they have never been active.
pub async fn engagement_handler(
    State(app_state): State<Arc<AppState>>,
    Path(owner): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let record = app_state
        .engagement
        .current(&owner)
        .await
        .map_err(port_error_response)?;
    let response = match record {
        Some(record) => EngagementResponse {
            current_streak: record.current_streak,
            longest_streak: record.longest_streak,
            last_active_date: Some(record.last_active_date),
        },
        None => EngagementResponse {
            current_streak: 0,
            longest_streak: 0,
            last_active_date: None,
        },
    };
    Ok(Json(response))
}
