//! crates/study_assistant_core/src/documents.rs
//!
//! Session-scoped document operations: registering an upload, reading and
//! soft-deleting documents the caller owns.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{Document, NewDocument};
use crate::ports::{DatabaseService, PageTextExtractor, PortError, PortResult};

/// A file already written to storage, waiting to be registered.
#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub original_filename: String,
    pub stored_filename: String,
    pub file_path: PathBuf,
    pub file_size: i64,
}

#[derive(Clone)]
pub struct DocumentService {
    db: Arc<dyn DatabaseService>,
    extractor: Arc<dyn PageTextExtractor>,
}

impl DocumentService {
    pub fn new(db: Arc<dyn DatabaseService>, extractor: Arc<dyn PageTextExtractor>) -> Self {
        Self { db, extractor }
    }

    /// Reads the page count of a stored upload and records it for `session_id`.
    pub async fn register_upload(
        &self,
        session_id: Uuid,
        upload: StoredUpload,
    ) -> PortResult<Document> {
        let page_count = self.extractor.page_count(&upload.file_path).await?;
        let document = self
            .db
            .create_document(NewDocument {
                session_id,
                original_filename: upload.original_filename,
                stored_filename: upload.stored_filename,
                file_path: upload.file_path,
                file_size: upload.file_size,
                page_count,
            })
            .await?;
        info!(
            document_id = %document.id,
            page_count,
            filename = %document.original_filename,
            "Document registered"
        );
        Ok(document)
    }

    /// Fetches a live document, failing `Unauthorized` for other sessions.
    pub async fn get_owned(&self, document_id: Uuid, session_id: Uuid) -> PortResult<Document> {
        let document = self.db.get_document_by_id(document_id).await?;
        if document.session_id != session_id {
            return Err(PortError::Unauthorized);
        }
        if let Err(e) = self.db.touch_document(document_id).await {
            warn!(document_id = %document_id, error = %e, "Failed to update document access time");
        }
        Ok(document)
    }

    pub async fn list_for_session(&self, session_id: Uuid) -> PortResult<Vec<Document>> {
        self.db.get_documents_for_session(session_id).await
    }

    /// Soft-deletes an owned document; its file and history are kept.
    pub async fn delete_owned(&self, document_id: Uuid, session_id: Uuid) -> PortResult<()> {
        let document = self.db.get_document_by_id(document_id).await?;
        if document.session_id != session_id {
            return Err(PortError::Unauthorized);
        }
        self.db.soft_delete_document(document_id).await?;
        info!(document_id = %document_id, "Document soft-deleted");
        Ok(())
    }
}
