#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

use api_lib::config::Config;
use api_lib::web::{api_router, state::AppState};
use study_assistant_core::{
    BrowserSession, DatabaseService, Document, ExtractedContent, GeneratedContent,
    GenerationRequest, NewDocument, NewGeneratedContent, PageRange, PageTextExtractor, PortError,
    PortResult, SummarizationBackend,
};

//=========================================================================================
// In-memory Ports
//=========================================================================================

#[derive(Default)]
pub struct MemoryDb {
    sessions: Mutex<HashMap<Uuid, BrowserSession>>,
    documents: Mutex<HashMap<Uuid, Document>>,
    extracted: Mutex<HashMap<(Uuid, u32, u32), ExtractedContent>>,
    generated: Mutex<Vec<GeneratedContent>>,
}

impl MemoryDb {
    pub fn session_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }
}

#[async_trait]
impl DatabaseService for MemoryDb {
    async fn create_browser_session(
        &self,
        ip_address: &str,
        user_agent: &str,
    ) -> PortResult<BrowserSession> {
        let session = BrowserSession {
            id: Uuid::new_v4(),
            ip_address: ip_address.to_string(),
            user_agent: user_agent.to_string(),
            created_at: Utc::now(),
            last_accessed_at: Utc::now(),
            is_active: true,
        };
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id, session.clone());
        Ok(session)
    }

    async fn get_active_browser_session(&self, session_id: Uuid) -> PortResult<BrowserSession> {
        self.sessions
            .lock()
            .unwrap()
            .get(&session_id)
            .filter(|s| s.is_active)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Session {} not found", session_id)))
    }

    async fn touch_browser_session(&self, _session_id: Uuid) -> PortResult<()> {
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
        self.documents
            .lock()
            .unwrap()
            .insert(document.id, document.clone());
        Ok(document)
    }

    async fn get_document_by_id(&self, document_id: Uuid) -> PortResult<Document> {
        self.documents
            .lock()
            .unwrap()
            .get(&document_id)
            .filter(|d| !d.is_deleted)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Document {} not found", document_id)))
    }

    async fn get_documents_for_session(&self, session_id: Uuid) -> PortResult<Vec<Document>> {
        Ok(self
            .documents
            .lock()
            .unwrap()
            .values()
            .filter(|d| d.session_id == session_id && !d.is_deleted)
            .cloned()
            .collect())
    }

    async fn touch_document(&self, document_id: Uuid) -> PortResult<()> {
        if let Some(d) = self.documents.lock().unwrap().get_mut(&document_id) {
            d.last_accessed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn soft_delete_document(&self, document_id: Uuid) -> PortResult<()> {
        if let Some(d) = self.documents.lock().unwrap().get_mut(&document_id) {
            d.is_deleted = true;
        }
        Ok(())
    }

    async fn get_extracted_content(
        &self,
        document_id: Uuid,
        range: PageRange,
    ) -> PortResult<Option<ExtractedContent>> {
        Ok(self
            .extracted
            .lock()
            .unwrap()
            .get(&(document_id, range.start(), range.end()))
            .cloned())
    }

    async fn upsert_extracted_content(&self, content: &ExtractedContent) -> PortResult<()> {
        self.extracted.lock().unwrap().insert(
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
        self.generated.lock().unwrap().push(stored.clone());
        Ok(stored)
    }

    async fn get_generated_content(&self, content_id: Uuid) -> PortResult<GeneratedContent> {
        self.generated
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.id == content_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Content {} not found", content_id)))
    }

    async fn get_generated_content_for_session(
        &self,
        session_id: Uuid,
    ) -> PortResult<Vec<GeneratedContent>> {
        Ok(self
            .generated
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.session_id == session_id)
            .cloned()
            .collect())
    }
}

/// Every upload has `pages` pages; `None` simulates an unreadable file.
pub struct StubExtractor {
    pub pages: Option<u32>,
}

#[async_trait]
impl PageTextExtractor for StubExtractor {
    async fn page_count(&self, _file_path: &Path) -> PortResult<u32> {
        self.pages
            .ok_or_else(|| PortError::ExtractionFailed("not a PDF".to_string()))
    }

    async fn extract_pages(&self, _file_path: &Path, range: PageRange) -> PortResult<String> {
        Ok(range
            .pages()
            .map(|p| {
                format!(
                    "--- Page {} ---\nThe harbour towns of page {} grew rich on the grain trade.\n\n",
                    p, p
                )
            })
            .collect())
    }
}

pub struct EchoBackend;

#[async_trait]
impl SummarizationBackend for EchoBackend {
    fn model_id(&self) -> &str {
        "test/echo"
    }

    async fn summarize(&self, request: &GenerationRequest) -> PortResult<String> {
        Ok(format!("A summary of {} characters.", request.prompt.chars().count()))
    }
}

//=========================================================================================
// Router Harness
//=========================================================================================

pub struct TestApp {
    pub router: Router,
    pub db: Arc<MemoryDb>,
    pub upload_dir: tempfile::TempDir,
}

impl TestApp {
    pub fn new(pages: Option<u32>) -> Self {
        let upload_dir = tempfile::tempdir().unwrap();
        let upload_path = upload_dir.path().to_string_lossy().into_owned();
        let vars: HashMap<&str, String> = HashMap::from([
            ("DATABASE_URL", "postgres://unused/test".to_string()),
            ("UPLOAD_DIR", upload_path),
            ("MAX_FILE_SIZE", "4096".to_string()),
            ("CHUNK_DELAY_MS", "0".to_string()),
        ]);
        let config = Config::from_lookup(|key| vars.get(key).cloned()).unwrap();

        let db = Arc::new(MemoryDb::default());
        let state = Arc::new(AppState::new(
            Arc::new(config),
            db.clone(),
            Arc::new(StubExtractor { pages }),
            Arc::new(EchoBackend),
        ));
        Self {
            router: api_router(state),
            db,
            upload_dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub fn stored_files(&self) -> usize {
        std::fs::read_dir(self.upload_dir.path()).unwrap().count()
    }
}

//=========================================================================================
// Request and Response Helpers
//=========================================================================================

pub const BOUNDARY: &str = "study-boundary";

pub fn upload_request(cookie: Option<&str>, filename: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/documents/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body)).unwrap()
}

pub fn json_request(method: &str, uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn empty_request(method: &str, uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

/// The `session_id=<uuid>` pair from a response's `Set-Cookie`, if any.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
