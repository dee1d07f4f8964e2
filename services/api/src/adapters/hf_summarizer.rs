//! services/api/src/adapters/hf_summarizer.rs
//!
//! This module contains the adapter for a hosted Hugging Face summarization model.
//! It implements the `SummarizationBackend` port from the `core` crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use study_assistant_core::ports::{
    GenerationRequest, PortError, PortResult, SummarizationBackend,
};
use tracing::debug;

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    parameters: InferenceParameters,
}

#[derive(Debug, Serialize)]
struct InferenceParameters {
    max_length: u32,
    min_length: u32,
    do_sample: bool,
}

#[derive(Debug, Deserialize)]
struct SummaryItem {
    summary_text: String,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// Calls `POST {base_url}/{model}` on the Hugging Face inference API.
#[derive(Clone)]
pub struct HuggingFaceSummarizer {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl HuggingFaceSummarizer {
    /// Creates a new `HuggingFaceSummarizer` whose calls give up after `timeout`.
    pub fn new(
        base_url: String,
        model: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> PortResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PortError::Unexpected(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/{}", self.base_url, self.model)
    }
}

//=========================================================================================
// `SummarizationBackend` Trait Implementation
//=========================================================================================

#[async_trait]
impl SummarizationBackend for HuggingFaceSummarizer {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn summarize(&self, request: &GenerationRequest) -> PortResult<String> {
        let body = InferenceRequest {
            inputs: &request.prompt,
            parameters: InferenceParameters {
                max_length: request.max_length,
                min_length: request.min_length,
                do_sample: !request.deterministic,
            },
        };

        let mut call = self.client.post(self.endpoint()).json(&body);
        if let Some(key) = &self.api_key {
            call = call.bearer_auth(key);
        }

        let response = call.send().await.map_err(|e| PortError::Remote {
            status: None,
            message: format!("request to {} failed: {}", self.model, e),
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PortError::Remote {
                status: Some(status.as_u16()),
                message: format!("inference API error {}: {}", status, body),
            });
        }

        let items: Vec<SummaryItem> = response.json().await.map_err(|e| PortError::Remote {
            status: None,
            message: format!("unreadable inference response: {}", e),
        })?;
        debug!(model = %self.model, items = items.len(), "Inference response received");

        items
            .into_iter()
            .next()
            .map(|item| item.summary_text)
            .ok_or_else(|| PortError::Remote {
                status: None,
                message: "inference API returned no summaries".to_string(),
            })
    }
}
