//! crates/study_assistant_core/src/summarizer.rs
//!
//! The summarization orchestrator. It checks ownership, pulls normalized text
//! through the extraction cache, decides whether the text must be chunked,
//! drives the remote backend once per chunk and stores the final artifact.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::chunking::{char_len, split_into_chunks};
use crate::domain::{ContentKind, GeneratedContent, NewGeneratedContent, PageRange, SummaryPayload};
use crate::extraction::ExtractionCache;
use crate::ports::{
    DatabaseService, GenerationRequest, PageTextExtractor, PortError, PortResult,
    SummarizationBackend,
};
use crate::prompt::build_prompt;

//=========================================================================================
// Settings, Requests and Outcomes
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummarySettings {
    /// Text longer than this (in characters) is chunked.
    pub max_chunk_chars: usize,
    /// Pause between consecutive chunk calls, for the remote endpoint's sake.
    pub chunk_delay: Duration,
}

impl Default for SummarySettings {
    fn default() -> Self {
        Self {
            max_chunk_chars: 3000,
            chunk_delay: Duration::from_millis(500),
        }
    }
}

/// A request to summarize a page range of a document on behalf of a session.
#[derive(Debug, Clone)]
pub struct SummaryRequest {
    pub session_id: Uuid,
    pub document_id: Uuid,
    pub start_page: i64,
    pub end_page: i64,
    /// Recorded verbatim; unrecognised values get the generic instruction.
    pub academic_level: String,
}

#[derive(Debug, Clone)]
pub struct SummaryOutcome {
    pub content_id: Uuid,
    pub summary: String,
    pub model_id: String,
    /// Wall-clock time of the whole operation, persistence included.
    pub generation_ms: u64,
    pub chunk_count: usize,
}

//=========================================================================================
// The Orchestrator
//=========================================================================================

#[derive(Clone)]
pub struct SummaryService {
    db: Arc<dyn DatabaseService>,
    extraction: ExtractionCache,
    backend: Arc<dyn SummarizationBackend>,
    settings: SummarySettings,
}

impl SummaryService {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        extractor: Arc<dyn PageTextExtractor>,
        backend: Arc<dyn SummarizationBackend>,
        settings: SummarySettings,
    ) -> Self {
        Self {
            extraction: ExtractionCache::new(db.clone(), extractor),
            db,
            backend,
            settings,
        }
    }

    pub fn model_id(&self) -> &str {
        self.backend.model_id()
    }

    /// Generates, stores and returns a summary of the requested pages.
    ///
    /// Nothing is extracted, sent or stored unless the range is well formed,
    /// the document belongs to the requesting session and the range fits it.
    #[tracing::instrument(
        skip(self, request),
        fields(
            document_id = %request.document_id,
            start_page = request.start_page,
            end_page = request.end_page,
            academic_level = %request.academic_level,
        )
    )]
    pub async fn generate_summary(&self, request: SummaryRequest) -> PortResult<SummaryOutcome> {
        let started = Instant::now();

        let range = PageRange::new(request.start_page, request.end_page)?;
        let document = self.db.get_document_by_id(request.document_id).await?;
        if document.session_id != request.session_id {
            warn!("Session does not own the requested document");
            return Err(PortError::Unauthorized);
        }
        range.ensure_within(document.page_count)?;

        if let Err(e) = self.db.touch_document(document.id).await {
            warn!(error = %e, "Failed to update document access time");
        }

        let extraction = self
            .extraction
            .get_or_extract(document.id, &document.file_path, range)
            .await?;

        let (summary, chunk_count) = self
            .summarize_text(&extraction.text, &request.academic_level)
            .await?;

        let model_id = self.backend.model_id().to_string();
        let stored = self
            .db
            .create_generated_content(NewGeneratedContent {
                session_id: request.session_id,
                document_id: document.id,
                kind: ContentKind::Summary,
                academic_level: request.academic_level.clone(),
                input_pages: range.to_string(),
                output: SummaryPayload {
                    summary: summary.clone(),
                    pages: range.to_string(),
                    academic_level: request.academic_level,
                },
                model: model_id.clone(),
                generation_ms: started.elapsed().as_millis() as u64,
            })
            .await?;

        let generation_ms = started.elapsed().as_millis() as u64;
        info!(content_id = %stored.id, chunk_count, generation_ms, "Summary generated");

        Ok(SummaryOutcome {
            content_id: stored.id,
            summary,
            model_id,
            generation_ms,
            chunk_count,
        })
    }

    /// Summarizes already-normalized text, returning the summary and the
    /// number of chunks it was split into (1 for the direct path).
    ///
    /// Multi-chunk results are labelled `Section N:` and joined as-is; they are
    /// deliberately not summarized a second time.
    pub async fn summarize_text(
        &self,
        text: &str,
        academic_level: &str,
    ) -> PortResult<(String, usize)> {
        let text_chars = char_len(text);
        if text_chars <= self.settings.max_chunk_chars {
            let summary = self.call_backend(text, academic_level).await?;
            return Ok((summary, 1));
        }

        let chunks = split_into_chunks(text, self.settings.max_chunk_chars);
        if chunks.is_empty() {
            // Nothing survived the paragraph filters; send the text whole.
            warn!(text_chars, "Chunker produced no chunks, summarizing directly");
            let summary = self.call_backend(text, academic_level).await?;
            return Ok((summary, 1));
        }

        info!(
            text_chars,
            chunk_count = chunks.len(),
            "Text too large, summarizing in chunks"
        );

        let mut summaries = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            if i > 0 && !self.settings.chunk_delay.is_zero() {
                tokio::time::sleep(self.settings.chunk_delay).await;
            }
            debug!(
                chunk = i + 1,
                of = chunks.len(),
                chars = char_len(chunk),
                "Summarizing chunk"
            );
            let summary = self
                .call_backend(chunk, academic_level)
                .await
                .map_err(|e| PortError::ChunkSummarizationFailed {
                    chunk_index: i + 1,
                    message: e.to_string(),
                })?;
            summaries.push(summary);
        }

        let chunk_count = summaries.len();
        if chunk_count == 1 {
            return Ok((summaries.remove(0), 1));
        }
        Ok((combine_sections(&summaries), chunk_count))
    }

    async fn call_backend(&self, text: &str, academic_level: &str) -> PortResult<String> {
        let request = GenerationRequest::new(
            build_prompt(text, academic_level),
            self.backend.generation_params(),
        );
        self.backend.summarize(&request).await
    }

    /// Returns a stored artifact to the session that created it.
    pub async fn get_generated(
        &self,
        content_id: Uuid,
        session_id: Uuid,
    ) -> PortResult<GeneratedContent> {
        let content = self.db.get_generated_content(content_id).await?;
        if content.session_id != session_id {
            return Err(PortError::Unauthorized);
        }
        Ok(content)
    }

    pub async fn list_generated(&self, session_id: Uuid) -> PortResult<Vec<GeneratedContent>> {
        self.db.get_generated_content_for_session(session_id).await
    }
}

/// Labels chunk summaries `Section 1:`, `Section 2:` … separated by blank lines.
pub fn combine_sections(summaries: &[String]) -> String {
    summaries
        .iter()
        .enumerate()
        .map(|(i, summary)| format!("Section {}: {}", i + 1, summary.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_are_numbered_in_order_and_blank_line_separated() {
        let combined = combine_sections(&["first".to_string(), " second ".to_string()]);
        assert_eq!(combined, "Section 1: first\n\nSection 2: second");
    }

    #[test]
    fn default_settings_match_the_bart_window() {
        let settings = SummarySettings::default();
        assert_eq!(settings.max_chunk_chars, 3000);
        assert_eq!(settings.chunk_delay, Duration::from_millis(500));
    }
}
