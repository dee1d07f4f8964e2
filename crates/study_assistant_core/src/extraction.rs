//! crates/study_assistant_core/src/extraction.rs
//!
//! Memoizes normalized page text per exact `(document, page range)` key so
//! repeated requests skip both PDF parsing and the repair pipeline.

use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{ExtractedContent, PageRange};
use crate::normalizer::normalize;
use crate::ports::{DatabaseService, PageTextExtractor, PortError, PortResult};

/// Normalized text for a page range, and what it cost to produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub text: String,
    /// Extraction plus normalization time. A cache hit reports the duration
    /// recorded when the entry was first produced.
    pub duration_ms: u64,
    pub cache_hit: bool,
}

#[derive(Clone)]
pub struct ExtractionCache {
    db: Arc<dyn DatabaseService>,
    extractor: Arc<dyn PageTextExtractor>,
}

impl ExtractionCache {
    pub fn new(db: Arc<dyn DatabaseService>, extractor: Arc<dyn PageTextExtractor>) -> Self {
        Self { db, extractor }
    }

    /// Returns cached text for the exact key, or extracts, normalizes and caches it.
    ///
    /// The range must already be validated against the document. Extraction
    /// failures propagate; a failed cache write is logged and ignored because
    /// the text is already in hand.
    #[tracing::instrument(skip(self, file_path), fields(document_id = %document_id, pages = %range))]
    pub async fn get_or_extract(
        &self,
        document_id: Uuid,
        file_path: &Path,
        range: PageRange,
    ) -> PortResult<Extraction> {
        if let Some(cached) = self.db.get_extracted_content(document_id, range).await? {
            info!(chars = cached.content.len(), "Extraction cache hit");
            return Ok(Extraction {
                text: cached.content,
                duration_ms: cached.extraction_ms,
                cache_hit: true,
            });
        }

        let started = Instant::now();
        let raw = self.extractor.extract_pages(file_path, range).await?;
        let text = normalize(&raw);
        if text.is_empty() {
            return Err(PortError::ExtractionFailed(
                "no readable text remained after cleanup".to_string(),
            ));
        }
        let duration_ms = started.elapsed().as_millis() as u64;

        let entry = ExtractedContent {
            document_id,
            range,
            content: text,
            extraction_ms: duration_ms,
            created_at: Utc::now(),
        };
        if let Err(e) = self.db.upsert_extracted_content(&entry).await {
            warn!(error = %e, "Failed to cache extracted content");
        }

        info!(chars = entry.content.len(), duration_ms, "Extracted and cached page text");
        Ok(Extraction {
            text: entry.content,
            duration_ms,
            cache_hit: false,
        })
    }
}
