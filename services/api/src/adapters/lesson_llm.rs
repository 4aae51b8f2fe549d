//! services/api/src/adapters/lesson_llm.rs
//!
//! This module contains the adapter for the lesson-authoring LLM.
//! It implements the `LessonService` port from the `core` crate.

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
use tutor_core::ports::{LessonService, PortError, PortResult};

const SYSTEM_INSTRUCTIONS: &str = "You are a highly experienced and engaging teacher with \
expertise in making complex topics accessible. Create a comprehensive, step-by-step lesson \
plan for the requested chapter. Include: 1) Key Learning Objectives, 2) Core Content \
(explanations, real-world examples, questions), 3) Interactive Exercises, 4) Conclusion and \
Recap. Ask the user if they have any questions at the end.";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `LessonService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiLessonAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiLessonAdapter {
    /// Creates a new `OpenAiLessonAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

//=========================================================================================
// `LessonService` Trait Implementation
//=========================================================================================

#[async_trait]
impl LessonService for OpenAiLessonAdapter {
    async fn generate_lesson(
        &self,
        subject: &str,
        title: &str,
        description: &str,
    ) -> PortResult<String> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_INSTRUCTIONS)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(format!(
                    "The user is studying the course: {}\nChapter Title: \"{}\"\nChapter Description: \"{}\"",
                    subject, title, description
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
                PortError::Unexpected("Lesson LLM response contained no text content.".to_string())
            })?;

        Ok(content.trim().to_string())
    }
}
