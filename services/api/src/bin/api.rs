//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        db::DbAdapter, feedback_llm::OpenAiFeedbackAdapter, judge_llm::OpenAiJudgeAdapter,
        lesson_llm::OpenAiLessonAdapter, quiz_llm::OpenAiQuizAdapter, tokenizer::CharEstimator,
        tutor_llm::OpenAiTutorAdapter,
    },
    config::Config,
    engine::{
        ChapterService, ChatService, CurriculumService, EngagementService, QuizService,
        SessionStore, SessionSweeper, TaskPool,
    },
    error::ApiError,
    web::{
        chat_handler, continue_course_handler, create_curriculum_handler, engagement_handler,
        feedback_handler, list_curricula_handler, start_quiz_handler, state::AppState,
        study_intention_handler, submit_attempt_handler,
    },
};
use async_openai::{config::OpenAIConfig, Client};
use axum::{
    routing::{get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let store = Arc::new(DbAdapter::new(db_pool.clone()));
    info!("Running database migrations...");
    store.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize the Language-Model Adapters ---
    let openai_config = OpenAIConfig::new().with_api_key(
        config
            .openai_api_key
            .as_ref()
            .ok_or_else(|| ApiError::Internal("OPENAI_API_KEY is required".to_string()))?,
    );
    let openai_client = Client::with_config(openai_config);

    let tutor = Arc::new(OpenAiTutorAdapter::new(
        openai_client.clone(),
        config.tutor_model.clone(),
    ));
    let lessons = Arc::new(OpenAiLessonAdapter::new(
        openai_client.clone(),
        config.lesson_model.clone(),
    ));
    let quizzes = Arc::new(OpenAiQuizAdapter::new(
        openai_client.clone(),
        config.quiz_model.clone(),
    ));
    let judge = Arc::new(OpenAiJudgeAdapter::new(
        openai_client.clone(),
        config.judge_model.clone(),
    ));
    let summarizer = Arc::new(OpenAiFeedbackAdapter::new(
        openai_client.clone(),
        config.feedback_model.clone(),
    ));

    // --- 4. Build the Engine ---
    let curriculum_pool = TaskPool::new(
        "curriculum",
        config.curriculum_pool_size,
        config.pool_queue_capacity,
        config.pool_backpressure,
    );
    let intake_pool = TaskPool::new(
        "intake",
        config.intake_pool_size,
        config.pool_queue_capacity,
        config.pool_backpressure,
    );

    let sessions = Arc::new(SessionStore::new());
    let sweeper = SessionSweeper::spawn(
        Arc::clone(&sessions),
        config.session_ttl,
        config.sweep_interval,
    );

    let engagement = Arc::new(EngagementService::new(store.clone()));
    let chat = Arc::new(ChatService::new(
        Arc::clone(&sessions),
        store.clone(),
        tutor,
        summarizer,
        Arc::new(CharEstimator),
        Arc::clone(&engagement),
        config.history_token_budget,
    ));
    let curricula = Arc::new(CurriculumService::new(
        store.clone(),
        curriculum_pool.clone(),
        intake_pool,
    ));
    let chapters = Arc::new(ChapterService::new(
        store.clone(),
        lessons,
        quizzes,
        curriculum_pool,
    ));
    let quiz_service = Arc::new(QuizService::new(store.clone(), judge));

    let app_state = Arc::new(AppState {
        config: config.clone(),
        chat,
        curricula,
        chapters,
        quizzes: quiz_service,
        engagement,
    });

    // --- 5. Create the Web Router ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/chat", post(chat_handler))
        .route("/feedback", post(feedback_handler))
        .route(
            "/curricula",
            post(create_curriculum_handler).get(list_curricula_handler),
        )
        .route("/study-intentions", post(study_intention_handler))
        .route("/chapters/continue", post(continue_course_handler))
        .route("/chapters/{chapter_id}/quiz", get(start_quiz_handler))
        .route("/quiz/attempts", post(submit_attempt_handler))
        .route("/engagement/{owner}", get(engagement_handler))
        .layer(cors)
        .with_state(app_state);

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped. Shutting down the session sweeper...");
    sweeper.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    // If the signal handler cannot be installed we still want to serve.
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
