//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::path::PathBuf;
use study_assistant_core::domain::{
    BrowserSession, ContentKind, Document, ExtractedContent, GeneratedContent, NewDocument,
    NewGeneratedContent, PageRange, SummaryPayload,
};
use study_assistant_core::ports::{DatabaseService, PortError, PortResult};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn not_found_or_unexpected(e: sqlx::Error, what: String) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound(what),
        _ => PortError::Unexpected(e.to_string()),
    }
}

const DOCUMENT_COLUMNS: &str = "id, session_id, original_filename, stored_filename, file_path, \
     file_size, page_count, uploaded_at, last_accessed_at, is_deleted";

const GENERATED_COLUMNS: &str = "id, session_id, document_id, content_type, academic_level, \
     input_pages, output_content, model_used, generation_ms, created_at";

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct BrowserSessionRecord {
    id: Uuid,
    ip_address: String,
    user_agent: String,
    created_at: DateTime<Utc>,
    last_accessed_at: DateTime<Utc>,
    is_active: bool,
}
impl BrowserSessionRecord {
    fn to_domain(self) -> BrowserSession {
        BrowserSession {
            id: self.id,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            created_at: self.created_at,
            last_accessed_at: self.last_accessed_at,
            is_active: self.is_active,
        }
    }
}

#[derive(FromRow)]
struct DocumentRecord {
    id: Uuid,
    session_id: Uuid,
    original_filename: String,
    stored_filename: String,
    file_path: String,
    file_size: i64,
    page_count: i32,
    uploaded_at: DateTime<Utc>,
    last_accessed_at: Option<DateTime<Utc>>,
    is_deleted: bool,
}
impl DocumentRecord {
    fn to_domain(self) -> Document {
        Document {
            id: self.id,
            session_id: self.session_id,
            original_filename: self.original_filename,
            stored_filename: self.stored_filename,
            file_path: PathBuf::from(self.file_path),
            file_size: self.file_size,
            page_count: self.page_count.max(0) as u32,
            uploaded_at: self.uploaded_at,
            last_accessed_at: self.last_accessed_at,
            is_deleted: self.is_deleted,
        }
    }
}

#[derive(FromRow)]
struct ExtractedContentRecord {
    document_id: Uuid,
    page_start: i32,
    page_end: i32,
    content: String,
    extraction_ms: i64,
    created_at: DateTime<Utc>,
}
impl ExtractedContentRecord {
    fn to_domain(self) -> PortResult<ExtractedContent> {
        Ok(ExtractedContent {
            document_id: self.document_id,
            range: PageRange::new(i64::from(self.page_start), i64::from(self.page_end))?,
            content: self.content,
            extraction_ms: self.extraction_ms.max(0) as u64,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct GeneratedContentRecord {
    id: Uuid,
    session_id: Uuid,
    document_id: Uuid,
    content_type: String,
    academic_level: String,
    input_pages: String,
    output_content: String,
    model_used: String,
    generation_ms: i64,
    created_at: DateTime<Utc>,
}
impl GeneratedContentRecord {
    fn to_domain(self) -> PortResult<GeneratedContent> {
        let kind = ContentKind::parse(&self.content_type).ok_or_else(|| {
            PortError::Unexpected(format!("Unknown content type '{}'", self.content_type))
        })?;
        let output: SummaryPayload = serde_json::from_str(&self.output_content)
            .map_err(|e| PortError::Unexpected(format!("Corrupt stored content: {}", e)))?;
        Ok(GeneratedContent {
            id: self.id,
            session_id: self.session_id,
            document_id: self.document_id,
            kind,
            academic_level: self.academic_level,
            input_pages: self.input_pages,
            output,
            model: self.model_used,
            generation_ms: self.generation_ms.max(0) as u64,
            created_at: self.created_at,
        })
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    // --- Browser Sessions ---

    async fn create_browser_session(
        &self,
        ip_address: &str,
        user_agent: &str,
    ) -> PortResult<BrowserSession> {
        let record = sqlx::query_as::<_, BrowserSessionRecord>(
            "INSERT INTO browser_sessions (id, ip_address, user_agent) VALUES ($1, $2, $3) \
             RETURNING id, ip_address, user_agent, created_at, last_accessed_at, is_active",
        )
        .bind(Uuid::new_v4())
        .bind(ip_address)
        .bind(user_agent)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_active_browser_session(&self, session_id: Uuid) -> PortResult<BrowserSession> {
        let record = sqlx::query_as::<_, BrowserSessionRecord>(
            "SELECT id, ip_address, user_agent, created_at, last_accessed_at, is_active \
             FROM browser_sessions WHERE id = $1 AND is_active",
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or_unexpected(e, format!("Session {} not found", session_id)))?;
        Ok(record.to_domain())
    }

    async fn touch_browser_session(&self, session_id: Uuid) -> PortResult<()> {
        sqlx::query("UPDATE browser_sessions SET last_accessed_at = NOW() WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    // --- Documents ---

    async fn create_document(&self, document: NewDocument) -> PortResult<Document> {
        let sql = format!(
            "INSERT INTO documents (id, session_id, original_filename, stored_filename, file_path, \
             file_size, page_count) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            DOCUMENT_COLUMNS
        );
        let page_count = i32::try_from(document.page_count)
            .map_err(|_| PortError::Unexpected("page count out of range".to_string()))?;
        let record = sqlx::query_as::<_, DocumentRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(document.session_id)
            .bind(document.original_filename)
            .bind(document.stored_filename)
            .bind(document.file_path.to_string_lossy().into_owned())
            .bind(document.file_size)
            .bind(page_count)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_document_by_id(&self, document_id: Uuid) -> PortResult<Document> {
        let sql = format!(
            "SELECT {} FROM documents WHERE id = $1 AND NOT is_deleted",
            DOCUMENT_COLUMNS
        );
        let record = sqlx::query_as::<_, DocumentRecord>(&sql)
            .bind(document_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                not_found_or_unexpected(e, format!("Document {} not found", document_id))
            })?;
        Ok(record.to_domain())
    }

    async fn get_documents_for_session(&self, session_id: Uuid) -> PortResult<Vec<Document>> {
        let sql = format!(
            "SELECT {} FROM documents WHERE session_id = $1 AND NOT is_deleted \
             ORDER BY uploaded_at DESC",
            DOCUMENT_COLUMNS
        );
        let records = sqlx::query_as::<_, DocumentRecord>(&sql)
            .bind(session_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;

        let documents = records.into_iter().map(|r| r.to_domain()).collect();
        Ok(documents)
    }

    async fn touch_document(&self, document_id: Uuid) -> PortResult<()> {
        sqlx::query("UPDATE documents SET last_accessed_at = NOW() WHERE id = $1")
            .bind(document_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn soft_delete_document(&self, document_id: Uuid) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE documents SET is_deleted = TRUE WHERE id = $1 AND NOT is_deleted",
        )
        .bind(document_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "Document {} not found",
                document_id
            )));
        }
        Ok(())
    }

    // --- Extraction Cache ---

    async fn get_extracted_content(
        &self,
        document_id: Uuid,
        range: PageRange,
    ) -> PortResult<Option<ExtractedContent>> {
        let record = sqlx::query_as::<_, ExtractedContentRecord>(
            "SELECT document_id, page_start, page_end, content, extraction_ms, created_at \
             FROM extracted_content WHERE document_id = $1 AND page_start = $2 AND page_end = $3",
        )
        .bind(document_id)
        .bind(range.start() as i32)
        .bind(range.end() as i32)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        record.map(|r| r.to_domain()).transpose()
    }

    async fn upsert_extracted_content(&self, content: &ExtractedContent) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO extracted_content \
             (id, document_id, page_start, page_end, content, extraction_ms, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (document_id, page_start, page_end) DO UPDATE SET \
             content = EXCLUDED.content, extraction_ms = EXCLUDED.extraction_ms, \
             created_at = EXCLUDED.created_at",
        )
        .bind(Uuid::new_v4())
        .bind(content.document_id)
        .bind(content.range.start() as i32)
        .bind(content.range.end() as i32)
        .bind(&content.content)
        .bind(content.extraction_ms as i64)
        .bind(content.created_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    // --- Generated Content ---

    async fn create_generated_content(
        &self,
        content: NewGeneratedContent,
    ) -> PortResult<GeneratedContent> {
        let output = serde_json::to_string(&content.output)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let sql = format!(
            "INSERT INTO generated_content (id, session_id, document_id, content_type, \
             academic_level, input_pages, output_content, model_used, generation_ms) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {}",
            GENERATED_COLUMNS
        );
        let record = sqlx::query_as::<_, GeneratedContentRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(content.session_id)
            .bind(content.document_id)
            .bind(content.kind.as_str())
            .bind(content.academic_level)
            .bind(content.input_pages)
            .bind(output)
            .bind(content.model)
            .bind(content.generation_ms as i64)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        record.to_domain()
    }

    async fn get_generated_content(&self, content_id: Uuid) -> PortResult<GeneratedContent> {
        let sql = format!(
            "SELECT {} FROM generated_content WHERE id = $1",
            GENERATED_COLUMNS
        );
        let record = sqlx::query_as::<_, GeneratedContentRecord>(&sql)
            .bind(content_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| not_found_or_unexpected(e, format!("Content {} not found", content_id)))?;
        record.to_domain()
    }

    async fn get_generated_content_for_session(
        &self,
        session_id: Uuid,
    ) -> PortResult<Vec<GeneratedContent>> {
        let sql = format!(
            "SELECT {} FROM generated_content WHERE session_id = $1 ORDER BY created_at ASC",
            GENERATED_COLUMNS
        );
        let records = sqlx::query_as::<_, GeneratedContentRecord>(&sql)
            .bind(session_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }
}
