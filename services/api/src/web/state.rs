//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the per-request session marker.

use crate::config::Config;
use std::sync::Arc;
use std::time::Instant;
use study_assistant_core::ports::{DatabaseService, PageTextExtractor, SummarizationBackend};
use study_assistant_core::{DocumentService, SummaryService};
use uuid::Uuid;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    pub documents: DocumentService,
    pub summaries: SummaryService,
    pub started_at: Instant,
}

impl AppState {
    /// Wires the core services over the given adapters.
    pub fn new(
        config: Arc<Config>,
        db: Arc<dyn DatabaseService>,
        extractor: Arc<dyn PageTextExtractor>,
        backend: Arc<dyn SummarizationBackend>,
    ) -> Self {
        let documents = DocumentService::new(db.clone(), extractor.clone());
        let summaries =
            SummaryService::new(db.clone(), extractor, backend, config.summary_settings());
        Self {
            db,
            config,
            documents,
            summaries,
            started_at: Instant::now(),
        }
    }
}

//=========================================================================================
// Request Extensions
//=========================================================================================

/// The browser session a request belongs to, attached by the session middleware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionId(pub Uuid);
