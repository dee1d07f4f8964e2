//! services/api/src/adapters/openai_summarizer.rs
//!
//! This module contains the adapter for summarizing with an OpenAI chat model.
//! It implements the `SummarizationBackend` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use study_assistant_core::ports::{
    GenerationRequest, PortError, PortResult, SummarizationBackend,
};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `SummarizationBackend` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiSummarizer {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiSummarizer {
    /// Creates a new `OpenAiSummarizer`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

fn system_message(request: &GenerationRequest) -> String {
    format!(
        "You are a summarization model. Write a single plain-prose summary of the text you \
         are given, following any instructions at its start. Aim for between {} and {} tokens. \
         Do not add headings, lists or commentary.",
        request.min_length, request.max_length
    )
}

//=========================================================================================
// `SummarizationBackend` Trait Implementation
//=========================================================================================

#[async_trait]
impl SummarizationBackend for OpenAiSummarizer {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn summarize(&self, request: &GenerationRequest) -> PortResult<String> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system_message(request))
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(request.prompt.as_str())
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&self.model)
            .messages(messages)
            .n(1)
            .max_completion_tokens(request.max_length);
        if request.deterministic {
            builder.temperature(0.0);
        }
        let chat_request = builder
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(chat_request)
            .await
            .map_err(|e: OpenAIError| match e {
                OpenAIError::ApiError(api) => PortError::Remote {
                    status: None,
                    message: api.message,
                },
                other => PortError::Remote {
                    status: None,
                    message: other.to_string(),
                },
            })?;

        // Extract the text content from the first choice in the response.
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty());

        content.ok_or_else(|| PortError::Remote {
            status: None,
            message: "summarization LLM response contained no text content".to_string(),
        })
    }
}
