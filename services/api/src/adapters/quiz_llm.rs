//! services/api/src/adapters/quiz_llm.rs
//!
//! This module contains the adapter for the quiz-authoring LLM.
//! It implements the `QuizAuthoringService` port from the `core` crate.
//!
//! Model output is parsed in two explicit stages: a strict `serde_json`
//! parse of the whole response first, then a lenient regex extraction of
//! the first JSON array when the model wrapped it in prose or code fences.
//! Both stages log distinctly so malformed responses are diagnosable.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};
use tutor_core::domain::QuizQuestion;
use tutor_core::ports::{PortError, PortResult, QuizAuthoringService};

const SYSTEM_INSTRUCTIONS: &str = r#"You are an expert quiz creator. Based on the chapter the
user provides, create 6 multiple-choice questions (MCQs) in strict JSON format. Each question
must have four options and indicate the correct option (A, B, C, or D).

The output must be a JSON array of objects like this:
[
    {
        "question": "What is the capital of France?",
        "options": ["Paris", "Madrid", "Berlin", "Rome"],
        "correct_option": "A"
    }
]

Respond with the JSON array only."#;

/// The shape a question takes in the model's JSON before validation.
#[derive(Deserialize)]
struct RawQuestion {
    question: String,
    options: Vec<String>,
    correct_option: String,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `QuizAuthoringService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiQuizAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiQuizAdapter {
    /// Creates a new `OpenAiQuizAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

/// Strict parse first; lenient array extraction as the documented fallback.
fn parse_questions(content: &str) -> PortResult<Vec<QuizQuestion>> {
    let raw: Vec<RawQuestion> = match serde_json::from_str(content) {
        Ok(parsed) => parsed,
        Err(strict_err) => {
            debug!("Strict quiz JSON parse failed: {}", strict_err);
            let array_re = Regex::new(r"(?s)(\[.*\])")
                .map_err(|e| PortError::Unexpected(e.to_string()))?;
            let fragment = array_re
                .captures(content)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str())
                .ok_or_else(|| {
                    PortError::Validation(
                        "No JSON array found in quiz LLM response.".to_string(),
                    )
                })?;
            let parsed = serde_json::from_str(fragment).map_err(|lenient_err| {
                PortError::Validation(format!(
                    "Extracted quiz JSON fragment did not parse: {}",
                    lenient_err
                ))
            })?;
            warn!("Quiz JSON recovered via lenient array extraction.");
            parsed
        }
    };

    raw.into_iter().map(validate_question).collect()
}

fn validate_question(raw: RawQuestion) -> PortResult<QuizQuestion> {
    let correct = raw.correct_option.trim().to_uppercase();
    let correct_option = match correct.as_str() {
        "A" | "B" | "C" | "D" => correct.chars().next().unwrap_or('A'),
        other => {
            return Err(PortError::Validation(format!(
                "Invalid correct_option '{}' in generated question.",
                other
            )))
        }
    };

    let options: [String; 4] = raw.options.try_into().map_err(|bad: Vec<String>| {
        PortError::Validation(format!(
            "Generated question has {} options, expected 4.",
            bad.len()
        ))
    })?;

    if raw.question.trim().is_empty() {
        return Err(PortError::Validation(
            "Generated question has empty text.".to_string(),
        ));
    }

    Ok(QuizQuestion {
        question: raw.question,
        options,
        correct_option,
    })
}

//=========================================================================================
// `QuizAuthoringService` Trait Implementation
//=========================================================================================

#[async_trait]
impl QuizAuthoringService for OpenAiQuizAdapter {
    async fn generate_questions(
        &self,
        title: &str,
        description: &str,
    ) -> PortResult<Vec<QuizQuestion>> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_INSTRUCTIONS)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(format!(
                    "Chapter titled \"{}\" with the following description:\n\"{}\"",
                    title, description
                ))
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::Unexpected("Quiz LLM response contained no text content.".to_string())
            })?;

        parse_questions(content.trim())
    }
}
