//! services/api/src/adapters/pdf.rs
//!
//! Page-level PDF text extraction with `lopdf`. Parsing is CPU-bound, so every
//! call runs on the blocking thread pool.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use study_assistant_core::domain::PageRange;
use study_assistant_core::ports::{PageTextExtractor, PortError, PortResult};
use tracing::debug;

pub const NO_TEXT_MESSAGE: &str = "no text could be extracted (PDF may be image-based or scanned)";

/// An adapter that implements `PageTextExtractor` over files on local disk.
#[derive(Clone, Default)]
pub struct LopdfExtractor;

impl LopdfExtractor {
    pub fn new() -> Self {
        Self
    }
}

fn load(path: &Path) -> PortResult<lopdf::Document> {
    lopdf::Document::load(path).map_err(|e| {
        PortError::ExtractionFailed(format!("could not open {}: {}", path.display(), e))
    })
}

fn extract_blocking(path: PathBuf, range: PageRange) -> PortResult<String> {
    let document = load(&path)?;
    let page_count = document.get_pages().len() as u32;
    range.ensure_within(page_count)?;

    let mut text = String::new();
    for page in range.pages() {
        // A page without a readable content stream contributes nothing.
        let page_text = match document.extract_text(&[page]) {
            Ok(t) => t,
            Err(e) => {
                debug!(page, error = %e, "Skipping page without extractable text");
                continue;
            }
        };
        if page_text.trim().is_empty() {
            continue;
        }
        text.push_str(&format!("--- Page {} ---\n{}\n\n", page, page_text.trim_end()));
    }

    if text.trim().is_empty() {
        return Err(PortError::ExtractionFailed(NO_TEXT_MESSAGE.to_string()));
    }
    Ok(text)
}

async fn run_blocking<T, F>(f: F) -> PortResult<T>
where
    F: FnOnce() -> PortResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| PortError::Unexpected(format!("PDF worker failed: {}", e)))?
}

#[async_trait]
impl PageTextExtractor for LopdfExtractor {
    async fn page_count(&self, file_path: &Path) -> PortResult<u32> {
        let path = file_path.to_path_buf();
        run_blocking(move || Ok(load(&path)?.get_pages().len() as u32)).await
    }

    async fn extract_pages(&self, file_path: &Path, range: PageRange) -> PortResult<String> {
        let path = file_path.to_path_buf();
        run_blocking(move || extract_blocking(path, range)).await
    }
}
