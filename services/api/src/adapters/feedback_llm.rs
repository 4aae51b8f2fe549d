//! services/api/src/adapters/feedback_llm.rs
//!
//! This module contains the adapter for the feedback-summarizing LLM.
//! It implements the `FeedbackSummaryService` port from the `core` crate.

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
use tutor_core::ports::{FeedbackSummaryService, PortError, PortResult};

const SYSTEM_INSTRUCTIONS: &str = "Summarize the feedback of users to improve future prompts. \
Provide in actionable format and make it short and concise. Generalize the feedback to \
improve the model.";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `FeedbackSummaryService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiFeedbackAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiFeedbackAdapter {
    /// Creates a new `OpenAiFeedbackAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

//=========================================================================================
// `FeedbackSummaryService` Trait Implementation
//=========================================================================================

#[async_trait]
impl FeedbackSummaryService for OpenAiFeedbackAdapter {
    async fn summarize(&self, entries: &[String]) -> PortResult<String> {
        if entries.is_empty() {
            return Ok("No past feedback found.".to_string());
        }

        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_INSTRUCTIONS)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(format!("Feedback entries:\n- {}", entries.join("\n- ")))
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
                PortError::Unexpected(
                    "Feedback summary LLM response contained no text content.".to_string(),
                )
            })?;

        Ok(content.trim().to_string())
    }
}
