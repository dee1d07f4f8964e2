//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::response::{success, ApiFailure, ErrorInfo};
use crate::web::state::{AppState, SessionId};
use axum::{
    extract::{rejection::JsonRejection, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path as FsPath;
use std::sync::Arc;
use study_assistant_core::domain::{ContentKind, Document, GeneratedContent};
use study_assistant_core::ports::PortError;
use study_assistant_core::{StoredUpload, SummaryRequest};
use tracing::{error, info, warn};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        upload_document_handler,
        list_documents_handler,
        get_document_handler,
        delete_document_handler,
        generate_study_material_handler,
        list_content_handler,
        get_content_handler,
        health_handler,
    ),
    components(
        schemas(
            UploadResponse,
            DocumentInfo,
            DeleteResponse,
            GenerateRequest,
            GenerateResponse,
            SummaryContent,
            ContentResponse,
            HealthResponse,
            ErrorInfo
        )
    ),
    tags(
        (name = "Study Assistant API", description = "Upload PDFs and generate study summaries of page ranges.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// The payload returned after a successful upload.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub document_id: Uuid,
    pub filename: String,
    pub page_count: u32,
    pub file_size: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DocumentInfo {
    pub id: Uuid,
    pub filename: String,
    pub page_count: u32,
    pub file_size: i64,
    pub upload_date: DateTime<Utc>,
    pub last_accessed: Option<DateTime<Utc>>,
}

impl From<Document> for DocumentInfo {
    fn from(d: Document) -> Self {
        Self {
            id: d.id,
            filename: d.original_filename,
            page_count: d.page_count,
            file_size: d.file_size,
            upload_date: d.uploaded_at,
            last_accessed: d.last_accessed_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteResponse {
    pub document_id: Uuid,
    pub deleted: bool,
}

/// A request to generate study material from a page range.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GenerateRequest {
    pub document_id: Uuid,
    pub page_start: i64,
    pub page_end: i64,
    /// Only `summary` is supported; omitted or empty means `summary`.
    #[serde(default)]
    pub material_type: Option<String>,
    /// `high_school`, `undergraduate`, `graduate` or anything else for a general audience.
    #[serde(default)]
    pub academic_level: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GenerateResponse {
    pub content_id: Uuid,
    pub material_type: String,
    pub summary: String,
    pub model_used: String,
    /// Milliseconds.
    pub generation_time: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SummaryContent {
    pub summary: String,
    pub pages: String,
    pub academic_level: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ContentResponse {
    pub content_id: Uuid,
    pub document_id: Uuid,
    pub material_type: String,
    pub content: SummaryContent,
    pub academic_level: String,
    pub pages: String,
    pub model_used: String,
    pub generation_time: u64,
    pub created_at: DateTime<Utc>,
}

impl From<GeneratedContent> for ContentResponse {
    fn from(c: GeneratedContent) -> Self {
        Self {
            content_id: c.id,
            document_id: c.document_id,
            material_type: c.kind.as_str().to_string(),
            content: SummaryContent {
                summary: c.output.summary,
                pages: c.output.pages,
                academic_level: c.output.academic_level,
            },
            academic_level: c.academic_level,
            pages: c.input_pages,
            model_used: c.model,
            generation_time: c.generation_ms,
            created_at: c.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Seconds since the server started.
    pub uptime: u64,
}

//=========================================================================================
// Helpers
//=========================================================================================

fn parse_id(raw: &str) -> Result<Uuid, ApiFailure> {
    Uuid::parse_str(raw).map_err(|_| ApiFailure::bad_request("INVALID_ID", "Invalid ID"))
}

fn is_pdf(filename: &str) -> bool {
    FsPath::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// Reduces a client-supplied name to a safe basename for storage.
fn storage_name(filename: &str) -> String {
    let base = FsPath::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload.pdf");
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}_{}", Uuid::new_v4(), cleaned)
}

fn multipart_failure(e: axum::extract::multipart::MultipartError) -> ApiFailure {
    let status = e.status();
    let code = if status == StatusCode::PAYLOAD_TOO_LARGE {
        "FILE_TOO_LARGE"
    } else {
        "PARSE_ERROR"
    };
    ApiFailure::new(status, code, e.body_text())
}

//=========================================================================================
// Document Handlers
//=========================================================================================

/// Upload a PDF for the current browser session.
///
/// Accepts a multipart/form-data request with a `file` part.
#[utoipa::path(
    post,
    path = "/api/documents/upload",
    request_body(content_type = "multipart/form-data", description = "The PDF to upload, in a part named `file`."),
    responses(
        (status = 201, description = "Document stored", body = UploadResponse),
        (status = 400, description = "Missing file, wrong type or unreadable PDF", body = ErrorInfo),
        (status = 413, description = "File exceeds the size limit", body = ErrorInfo),
        (status = 500, description = "Internal server error", body = ErrorInfo)
    )
)]
pub async fn upload_document_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(SessionId(session_id)): Extension<SessionId>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiFailure> {
    let config = &app_state.config;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_failure)? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiFailure::bad_request("NO_FILE", "No file provided"))?;
        let data = field.bytes().await.map_err(multipart_failure)?;
        upload = Some((filename, data));
        break;
    }
    let (filename, data) =
        upload.ok_or_else(|| ApiFailure::bad_request("NO_FILE", "No file provided"))?;

    if data.len() > config.max_file_size {
        return Err(ApiFailure::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            "FILE_TOO_LARGE",
            format!(
                "File size exceeds {} MB limit",
                config.max_file_size / 1024 / 1024
            ),
        ));
    }
    if !is_pdf(&filename) {
        return Err(ApiFailure::bad_request(
            "INVALID_FILE_TYPE",
            "Only PDF files are allowed",
        ));
    }
    if data.is_empty() {
        return Err(ApiFailure::bad_request("NO_FILE", "Uploaded file is empty"));
    }

    let stored_filename = storage_name(&filename);
    let file_path = config.upload_dir.join(&stored_filename);
    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .map_err(|e| {
            error!("Failed to create upload directory: {:?}", e);
            ApiFailure::internal("UPLOAD_ERROR", "Failed to prepare upload")
        })?;
    tokio::fs::write(&file_path, &data).await.map_err(|e| {
        error!("Failed to write upload: {:?}", e);
        ApiFailure::internal("UPLOAD_ERROR", "Failed to save file")
    })?;

    let stored = StoredUpload {
        original_filename: filename,
        stored_filename,
        file_path: file_path.clone(),
        file_size: data.len() as i64,
    };
    let document = match app_state.documents.register_upload(session_id, stored).await {
        Ok(document) => document,
        Err(e) => {
            if let Err(rm) = tokio::fs::remove_file(&file_path).await {
                warn!(path = %file_path.display(), error = %rm, "Failed to remove rejected upload");
            }
            return Err(match e {
                PortError::ExtractionFailed(message) => {
                    ApiFailure::bad_request("INVALID_PDF", message)
                }
                other => other.into(),
            });
        }
    };

    let response = UploadResponse {
        document_id: document.id,
        filename: document.original_filename,
        page_count: document.page_count,
        file_size: document.file_size,
    };
    Ok(success(StatusCode::CREATED, response))
}

/// List the live documents of the current browser session.
#[utoipa::path(
    get,
    path = "/api/documents",
    responses(
        (status = 200, description = "Documents of this session, newest first", body = [DocumentInfo])
    )
)]
pub async fn list_documents_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(SessionId(session_id)): Extension<SessionId>,
) -> Result<impl IntoResponse, ApiFailure> {
    let documents = app_state.documents.list_for_session(session_id).await?;
    let infos: Vec<DocumentInfo> = documents.into_iter().map(DocumentInfo::from).collect();
    Ok(success(StatusCode::OK, infos))
}

/// Get one document owned by the current browser session.
#[utoipa::path(
    get,
    path = "/api/documents/{id}",
    params(("id" = Uuid, Path, description = "Document id")),
    responses(
        (status = 200, description = "The document", body = DocumentInfo),
        (status = 403, description = "Owned by another session", body = ErrorInfo),
        (status = 404, description = "No such live document", body = ErrorInfo)
    )
)]
pub async fn get_document_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(SessionId(session_id)): Extension<SessionId>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiFailure> {
    let document_id = parse_id(&id)?;
    let document = app_state.documents.get_owned(document_id, session_id).await?;
    Ok(success(StatusCode::OK, DocumentInfo::from(document)))
}

/// Soft-delete a document owned by the current browser session.
#[utoipa::path(
    delete,
    path = "/api/documents/{id}",
    params(("id" = Uuid, Path, description = "Document id")),
    responses(
        (status = 200, description = "Document removed", body = DeleteResponse),
        (status = 403, description = "Owned by another session", body = ErrorInfo),
        (status = 404, description = "No such live document", body = ErrorInfo)
    )
)]
pub async fn delete_document_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(SessionId(session_id)): Extension<SessionId>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiFailure> {
    let document_id = parse_id(&id)?;
    app_state
        .documents
        .delete_owned(document_id, session_id)
        .await?;
    Ok(success(
        StatusCode::OK,
        DeleteResponse {
            document_id,
            deleted: true,
        },
    ))
}

//=========================================================================================
// Study Material Handlers
//=========================================================================================

/// Generate a summary of a page range.
#[utoipa::path(
    post,
    path = "/api/study/generate",
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "Summary generated and stored", body = GenerateResponse),
        (status = 400, description = "Malformed request, bad page range or unsupported material type", body = ErrorInfo),
        (status = 403, description = "Document owned by another session", body = ErrorInfo),
        (status = 404, description = "No such live document", body = ErrorInfo),
        (status = 422, description = "No text could be extracted", body = ErrorInfo),
        (status = 502, description = "The summarization service failed", body = ErrorInfo)
    )
)]
pub async fn generate_study_material_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(SessionId(session_id)): Extension<SessionId>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiFailure> {
    let Json(request) =
        payload.map_err(|e| ApiFailure::bad_request("INVALID_JSON", e.body_text()))?;

    let material_type = request
        .material_type
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(ContentKind::Summary.as_str());
    if ContentKind::parse(material_type).is_none() {
        return Err(ApiFailure::bad_request(
            "UNSUPPORTED_TYPE",
            "Only 'summary' material is supported",
        ));
    }
    let academic_level = request
        .academic_level
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| "undergraduate".to_string());

    let outcome = app_state
        .summaries
        .generate_summary(SummaryRequest {
            session_id,
            document_id: request.document_id,
            start_page: request.page_start,
            end_page: request.page_end,
            academic_level,
        })
        .await
        .map_err(|e| {
            error!("Failed to generate summary: {}", e);
            ApiFailure::from(e)
        })?;
    info!(content_id = %outcome.content_id, chunks = outcome.chunk_count, "Summary served");

    let response = GenerateResponse {
        content_id: outcome.content_id,
        material_type: ContentKind::Summary.as_str().to_string(),
        summary: outcome.summary,
        model_used: outcome.model_id,
        generation_time: outcome.generation_ms,
    };
    Ok(success(StatusCode::OK, response))
}

/// List the study material generated by the current browser session.
#[utoipa::path(
    get,
    path = "/api/study/content",
    responses(
        (status = 200, description = "Generated content, oldest first", body = [ContentResponse])
    )
)]
pub async fn list_content_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(SessionId(session_id)): Extension<SessionId>,
) -> Result<impl IntoResponse, ApiFailure> {
    let contents = app_state.summaries.list_generated(session_id).await?;
    let responses: Vec<ContentResponse> =
        contents.into_iter().map(ContentResponse::from).collect();
    Ok(success(StatusCode::OK, responses))
}

/// Get one piece of generated study material.
#[utoipa::path(
    get,
    path = "/api/study/content/{id}",
    params(("id" = Uuid, Path, description = "Content id")),
    responses(
        (status = 200, description = "The stored content", body = ContentResponse),
        (status = 403, description = "Generated by another session", body = ErrorInfo),
        (status = 404, description = "No such content", body = ErrorInfo)
    )
)]
pub async fn get_content_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(SessionId(session_id)): Extension<SessionId>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiFailure> {
    let content_id = parse_id(&id)?;
    let content = app_state
        .summaries
        .get_generated(content_id, session_id)
        .await?;
    Ok(success(StatusCode::OK, ContentResponse::from(content)))
}

//=========================================================================================
// Health
//=========================================================================================

#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_handler(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    success(
        StatusCode::OK,
        HealthResponse {
            status: "healthy".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime: app_state.started_at.elapsed().as_secs(),
        },
    )
}
