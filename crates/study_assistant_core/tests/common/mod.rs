#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use study_assistant_core::{
    BrowserSession, DatabaseService, Document, ExtractedContent, GeneratedContent,
    GenerationRequest, NewDocument, NewGeneratedContent, PageRange, PageTextExtractor, PortError,
    PortResult, SummarizationBackend,
};

//=========================================================================================
// In-memory DatabaseService
//=========================================================================================

#[derive(Default)]
struct DbState {
    sessions: HashMap<Uuid, BrowserSession>,
    documents: HashMap<Uuid, Document>,
    extracted: HashMap<(Uuid, u32, u32), ExtractedContent>,
    generated: HashMap<Uuid, GeneratedContent>,
    generated_order: Vec<Uuid>,
}

#[derive(Default)]
pub struct InMemoryDb {
    state: Mutex<DbState>,
    pub fail_cache_writes: std::sync::atomic::AtomicBool,
    pub cache_writes: AtomicUsize,
}

impl InMemoryDb {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_document(&self, session_id: Uuid, page_count: u32) -> Document {
        let document = Document {
            id: Uuid::new_v4(),
            session_id,
            original_filename: "history.pdf".to_string(),
            stored_filename: "stored_history.pdf".to_string(),
            file_path: PathBuf::from("/uploads/stored_history.pdf"),
            file_size: 1024,
            page_count,
            uploaded_at: Utc::now(),
            last_accessed_at: None,
            is_deleted: false,
        };
        self.state
            .lock()
            .unwrap()
            .documents
            .insert(document.id, document.clone());
        document
    }

    pub fn generated_count(&self) -> usize {
        self.state.lock().unwrap().generated.len()
    }

    pub fn extracted_count(&self) -> usize {
        self.state.lock().unwrap().extracted.len()
    }

    pub fn raw_document(&self, id: Uuid) -> Option<Document> {
        self.state.lock().unwrap().documents.get(&id).cloned()
    }
}

#[async_trait]
impl DatabaseService for InMemoryDb {
    async fn create_browser_session(
        &self,
        ip_address: &str,
        user_agent: &str,
    ) -> PortResult<BrowserSession> {
        let now = Utc::now();
        let session = BrowserSession {
            id: Uuid::new_v4(),
            ip_address: ip_address.to_string(),
            user_agent: user_agent.to_string(),
            created_at: now,
            last_accessed_at: now,
            is_active: true,
        };
        self.state
            .lock()
            .unwrap()
            .sessions
            .insert(session.id, session.clone());
        Ok(session)
    }

    async fn get_active_browser_session(&self, session_id: Uuid) -> PortResult<BrowserSession> {
        self.state
            .lock()
            .unwrap()
            .sessions
            .get(&session_id)
            .filter(|s| s.is_active)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Session {} not found", session_id)))
    }

    async fn touch_browser_session(&self, session_id: Uuid) -> PortResult<()> {
        if let Some(session) = self.state.lock().unwrap().sessions.get_mut(&session_id) {
            session.last_accessed_at = Utc::now();
        }
        Ok(())
    }

    async fn create_document(&self, document: NewDocument) -> PortResult<Document> {
        let document = Document {
            id: Uuid::new_v4(),
            session_id: document.session_id,
            original_filename: document.original_filename,
            stored_filename: document.stored_filename,
            file_path: document.file_path,
            file_size: document.file_size,
            page_count: document.page_count,
            uploaded_at: Utc::now(),
            last_accessed_at: None,
            is_deleted: false,
        };
        self.state
            .lock()
            .unwrap()
            .documents
            .insert(document.id, document.clone());
        Ok(document)
    }

    async fn get_document_by_id(&self, document_id: Uuid) -> PortResult<Document> {
        self.state
            .lock()
            .unwrap()
            .documents
            .get(&document_id)
            .filter(|d| !d.is_deleted)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Document {} not found", document_id)))
    }

    async fn get_documents_for_session(&self, session_id: Uuid) -> PortResult<Vec<Document>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .documents
            .values()
            .filter(|d| d.session_id == session_id && !d.is_deleted)
            .cloned()
            .collect())
    }

    async fn touch_document(&self, document_id: Uuid) -> PortResult<()> {
        if let Some(document) = self.state.lock().unwrap().documents.get_mut(&document_id) {
            document.last_accessed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn soft_delete_document(&self, document_id: Uuid) -> PortResult<()> {
        if let Some(document) = self.state.lock().unwrap().documents.get_mut(&document_id) {
            document.is_deleted = true;
        }
        Ok(())
    }

    async fn get_extracted_content(
        &self,
        document_id: Uuid,
        range: PageRange,
    ) -> PortResult<Option<ExtractedContent>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .extracted
            .get(&(document_id, range.start(), range.end()))
            .cloned())
    }

    async fn upsert_extracted_content(&self, content: &ExtractedContent) -> PortResult<()> {
        if self.fail_cache_writes.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("disk full".to_string()));
        }
        self.cache_writes.fetch_add(1, Ordering::SeqCst);
        self.state.lock().unwrap().extracted.insert(
            (content.document_id, content.range.start(), content.range.end()),
            content.clone(),
        );
        Ok(())
    }

    async fn create_generated_content(
        &self,
        content: NewGeneratedContent,
    ) -> PortResult<GeneratedContent> {
        let stored = GeneratedContent {
            id: Uuid::new_v4(),
            session_id: content.session_id,
            document_id: content.document_id,
            kind: content.kind,
            academic_level: content.academic_level,
            input_pages: content.input_pages,
            output: content.output,
            model: content.model,
            generation_ms: content.generation_ms,
            created_at: Utc::now(),
        };
        let mut state = self.state.lock().unwrap();
        state.generated_order.push(stored.id);
        state.generated.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_generated_content(&self, content_id: Uuid) -> PortResult<GeneratedContent> {
        self.state
            .lock()
            .unwrap()
            .generated
            .get(&content_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Content {} not found", content_id)))
    }

    async fn get_generated_content_for_session(
        &self,
        session_id: Uuid,
    ) -> PortResult<Vec<GeneratedContent>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .generated_order
            .iter()
            .filter_map(|id| state.generated.get(id))
            .filter(|c| c.session_id == session_id)
            .cloned()
            .collect())
    }
}

//=========================================================================================
// Fake PageTextExtractor
//=========================================================================================

/// Serves `pages[n - 1]` for page `n`, wrapped in page markers.
pub struct FakeExtractor {
    pages: Vec<String>,
    pub calls: AtomicUsize,
    /// Simulated parse time, observable under a paused clock.
    pub latency: Duration,
    pub failure: Option<String>,
}

impl FakeExtractor {
    pub fn with_pages(pages: Vec<String>) -> Arc<Self> {
        Arc::new(Self {
            pages,
            calls: AtomicUsize::new(0),
            latency: Duration::from_millis(40),
            failure: None,
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            pages: Vec::new(),
            calls: AtomicUsize::new(0),
            latency: Duration::ZERO,
            failure: Some(message.to_string()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageTextExtractor for FakeExtractor {
    async fn page_count(&self, _file_path: &Path) -> PortResult<u32> {
        Ok(self.pages.len() as u32)
    }

    async fn extract_pages(&self, _file_path: &Path, range: PageRange) -> PortResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if let Some(message) = &self.failure {
            return Err(PortError::ExtractionFailed(message.clone()));
        }
        let mut text = String::new();
        for page in range.pages() {
            let body = self
                .pages
                .get(page as usize - 1)
                .ok_or_else(|| PortError::ExtractionFailed(format!("page {} missing", page)))?;
            text.push_str(&format!("--- Page {} ---\n{}\n\n", page, body));
        }
        Ok(text)
    }
}

//=========================================================================================
// Scripted SummarizationBackend
//=========================================================================================

/// Answers `summary N` for the N-th call and records every request.
pub struct ScriptedBackend {
    pub requests: Mutex<Vec<(Instant, GenerationRequest)>>,
    /// 1-based call number that fails, if any.
    pub fail_on_call: Option<usize>,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            fail_on_call: None,
        })
    }

    pub fn failing_on(call: usize) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            fail_on_call: Some(call),
        })
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(_, r)| r.prompt.clone())
            .collect()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.requests.lock().unwrap().iter().map(|(t, _)| *t).collect()
    }
}

pub const TEST_MODEL: &str = "test/bart-like";

#[async_trait]
impl SummarizationBackend for ScriptedBackend {
    fn model_id(&self) -> &str {
        TEST_MODEL
    }

    async fn summarize(&self, request: &GenerationRequest) -> PortResult<String> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push((Instant::now(), request.clone()));
            requests.len()
        };
        if self.fail_on_call == Some(call) {
            return Err(PortError::Remote {
                status: Some(503),
                message: "model is loading".to_string(),
            });
        }
        Ok(format!("summary {}", call))
    }
}

//=========================================================================================
// Text Fixtures
//=========================================================================================

/// A page of roughly `chars` characters whose sentences name the page.
pub fn page_text(page: u32, chars: usize) -> String {
    let mut text = String::new();
    let mut n = 0;
    while text.len() < chars {
        n += 1;
        text.push_str(&format!(
            "Page {page} topic sentence {n} describes how trade and politics shaped the region. "
        ));
    }
    text.trim_end().to_string()
}
