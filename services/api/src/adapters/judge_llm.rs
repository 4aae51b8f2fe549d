//! services/api/src/adapters/judge_llm.rs
//!
//! This module contains the adapter for the completion-judgment LLM.
//! It implements the `JudgmentService` port from the `core` crate.
//!
//! The verdict is returned as free-form text; the progress engine owns the
//! parsing and its fail-safe default. This adapter never decides completion.

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
use tutor_core::ports::{JudgmentService, PortError, PortResult};

const SYSTEM_INSTRUCTIONS: &str = "The user just completed a chapter quiz. \
1. Provide detailed feedback on the user's performance. Highlight areas where they excelled \
and areas where they need improvement. \
2. Recommend what the user should focus on next based on their current progress. \
3. Respond with 'Passed' if the user is ready to complete this chapter, or 'Failed' if they \
need more practice. \
4. You must end off with a question to the user like \"Would you like to continue learning?\".";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `JudgmentService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiJudgeAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiJudgeAdapter {
    /// Creates a new `OpenAiJudgeAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

//=========================================================================================
// `JudgmentService` Trait Implementation
//=========================================================================================

#[async_trait]
impl JudgmentService for OpenAiJudgeAdapter {
    async fn judge(
        &self,
        chapter_id: i64,
        score: u32,
        total_questions: u32,
        reflection: &str,
    ) -> PortResult<String> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_INSTRUCTIONS)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(format!(
                    "Chapter ID: {}\nScore: {}/{}\nReflection: \"{}\"",
                    chapter_id, score, total_questions, reflection
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
                PortError::Unexpected(
                    "Judgment LLM response contained no text content.".to_string(),
                )
            })?;

        Ok(content.trim().to_string())
    }
}
