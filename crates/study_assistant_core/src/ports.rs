//! crates/study_assistant_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the database, the PDF library and the remote model.

use async_trait::async_trait;
use std::path::Path;
use uuid::Uuid;

use crate::domain::{
    BrowserSession, Document, ExtractedContent, GeneratedContent, NewDocument,
    NewGeneratedContent, PageRange,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// The error type shared by every port and every core service.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Invalid page range {start}-{end}: {reason}")]
    InvalidRange { start: i64, end: i64, reason: String },
    #[error("Text extraction failed: {0}")]
    ExtractionFailed(String),
    /// A remote call for one chunk failed; `chunk_index` is 1-based.
    #[error("Failed to summarize chunk {chunk_index}: {message}")]
    ChunkSummarizationFailed { chunk_index: usize, message: String },
    #[error("Remote summarizer error (status {status:?}): {message}")]
    Remote { status: Option<u16>, message: String },
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Remote Generation Types
//=========================================================================================

/// Length bounds and sampling mode sent with every summarization call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationParams {
    pub max_length: u32,
    pub min_length: u32,
    pub deterministic: bool,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_length: 350,
            min_length: 120,
            deterministic: true,
        }
    }
}

/// One request to a summarization backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub max_length: u32,
    pub min_length: u32,
    pub deterministic: bool,
}

impl GenerationRequest {
    pub fn new(prompt: String, params: GenerationParams) -> Self {
        Self {
            prompt,
            max_length: params.max_length,
            min_length: params.min_length,
            deterministic: params.deterministic,
        }
    }
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Browser Sessions ---
    async fn create_browser_session(
        &self,
        ip_address: &str,
        user_agent: &str,
    ) -> PortResult<BrowserSession>;

    /// Returns the session only while it is active.
    async fn get_active_browser_session(&self, session_id: Uuid) -> PortResult<BrowserSession>;

    async fn touch_browser_session(&self, session_id: Uuid) -> PortResult<()>;

    // --- Documents (soft-deleted rows are invisible to every read) ---
    async fn create_document(&self, document: NewDocument) -> PortResult<Document>;

    async fn get_document_by_id(&self, document_id: Uuid) -> PortResult<Document>;

    async fn get_documents_for_session(&self, session_id: Uuid) -> PortResult<Vec<Document>>;

    async fn touch_document(&self, document_id: Uuid) -> PortResult<()>;

    async fn soft_delete_document(&self, document_id: Uuid) -> PortResult<()>;

    // --- Extraction Cache ---
    /// Exact-key lookup. A miss is `Ok(None)`, not an error.
    async fn get_extracted_content(
        &self,
        document_id: Uuid,
        range: PageRange,
    ) -> PortResult<Option<ExtractedContent>>;

    /// Inserts or fully replaces the entry for `(document_id, range)`.
    async fn upsert_extracted_content(&self, content: &ExtractedContent) -> PortResult<()>;

    // --- Generated Content ---
    async fn create_generated_content(
        &self,
        content: NewGeneratedContent,
    ) -> PortResult<GeneratedContent>;

    async fn get_generated_content(&self, content_id: Uuid) -> PortResult<GeneratedContent>;

    async fn get_generated_content_for_session(
        &self,
        session_id: Uuid,
    ) -> PortResult<Vec<GeneratedContent>>;
}

#[async_trait]
pub trait PageTextExtractor: Send + Sync {
    /// Counts the pages of the document at `file_path`.
    async fn page_count(&self, file_path: &Path) -> PortResult<u32>;

    /// Returns the verbatim text of `range`, with a `--- Page N ---` marker
    /// ahead of every page. Fails with `ExtractionFailed` when nothing
    /// readable is found.
    async fn extract_pages(&self, file_path: &Path, range: PageRange) -> PortResult<String>;
}

/// A remote summarization backend: one model, its parameters and its endpoint.
#[async_trait]
pub trait SummarizationBackend: Send + Sync {
    /// The identifier recorded with every artifact this backend produces.
    fn model_id(&self) -> &str;

    fn generation_params(&self) -> GenerationParams {
        GenerationParams::default()
    }

    /// Produces one summary for `request.prompt`. Any non-success response is
    /// a hard failure; retries are not attempted here.
    async fn summarize(&self, request: &GenerationRequest) -> PortResult<String>;
}
