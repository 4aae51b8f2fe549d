//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// What `TaskPool::submit` does when both the workers and the queue are full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackpressurePolicy {
    /// Wait for a queue slot to free up.
    Block,
    /// Fail fast with a pool-saturated error.
    Reject,
}

impl BackpressurePolicy {
    fn parse(var: &str, value: &str) -> Result<Self, ConfigError> {
        match value.to_lowercase().as_str() {
            "block" => Ok(Self::Block),
            "reject" => Ok(Self::Reject),
            other => Err(ConfigError::InvalidValue(
                var.to_string(),
                format!("'{}' is not 'block' or 'reject'", other),
            )),
        }
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub openai_api_key: Option<String>,
    pub tutor_model: String,
    pub lesson_model: String,
    pub quiz_model: String,
    pub judge_model: String,
    pub feedback_model: String,
    /// Inactivity window after which a session is eligible for eviction.
    pub session_ttl: Duration,
    /// How often the sweeper scans for expired sessions.
    pub sweep_interval: Duration,
    /// Token budget applied to each session's transcript before a turn.
    pub history_token_budget: usize,
    /// In-flight job cap for the curriculum-scale worker pool.
    pub curriculum_pool_size: usize,
    /// In-flight job cap for the study-intention intake pool.
    pub intake_pool_size: usize,
    /// Pending submissions each pool accepts beyond its in-flight cap.
    pub pool_queue_capacity: usize,
    pub pool_backpressure: BackpressurePolicy,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load API Keys (as optional) ---
        let openai_api_key = std::env::var("OPENAI_API_KEY").ok();

        // --- Load Adapter-specific Settings ---
        let tutor_model = std::env::var("TUTOR_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());
        let lesson_model = std::env::var("LESSON_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());
        let quiz_model = std::env::var("QUIZ_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());
        let judge_model =
            std::env::var("JUDGE_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let feedback_model =
            std::env::var("FEEDBACK_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

        // --- Load Engine Settings ---
        let session_ttl = Duration::from_secs(parse_var("SESSION_TTL_SECS", 3600)?);
        let sweep_interval = Duration::from_secs(parse_var("SWEEP_INTERVAL_SECS", 300)?);
        let history_token_budget = parse_var("HISTORY_TOKEN_BUDGET", 3000)? as usize;
        let curriculum_pool_size = parse_var("CURRICULUM_POOL_SIZE", 10)? as usize;
        let intake_pool_size = parse_var("INTAKE_POOL_SIZE", 4)? as usize;
        let pool_queue_capacity = parse_var("POOL_QUEUE_CAPACITY", 32)? as usize;

        let pool_backpressure_str =
            std::env::var("POOL_BACKPRESSURE").unwrap_or_else(|_| "block".to_string());
        let pool_backpressure =
            BackpressurePolicy::parse("POOL_BACKPRESSURE", &pool_backpressure_str)?;

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            openai_api_key,
            tutor_model,
            lesson_model,
            quiz_model,
            judge_model,
            feedback_model,
            session_ttl,
            sweep_interval,
            history_token_budget,
            curriculum_pool_size,
            intake_pool_size,
            pool_queue_capacity,
            pool_backpressure,
        })
    }
}

fn parse_var(var: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(var) {
        Ok(value) => value
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidValue(var.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}
