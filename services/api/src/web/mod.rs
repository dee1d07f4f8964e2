pub mod middleware;
pub mod response;
pub mod rest;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::web::state::AppState;

pub use middleware::browser_session;
pub use rest::{
    delete_document_handler, generate_study_material_handler, get_content_handler,
    get_document_handler, health_handler, list_content_handler, list_documents_handler,
    upload_document_handler,
};

/// Multipart framing on top of the file itself.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Builds the `/api` router. Every route except health runs inside a browser session.
pub fn api_router(app_state: Arc<AppState>) -> Router {
    let body_limit = app_state.config.max_file_size + MULTIPART_OVERHEAD;

    let session_routes = Router::new()
        .route("/api/documents/upload", post(upload_document_handler))
        .route("/api/documents", get(list_documents_handler))
        .route(
            "/api/documents/{id}",
            get(get_document_handler).delete(delete_document_handler),
        )
        .route("/api/study/generate", post(generate_study_material_handler))
        .route("/api/study/content", get(list_content_handler))
        .route("/api/study/content/{id}", get(get_content_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            browser_session,
        ));

    Router::new()
        .merge(session_routes)
        .route("/api/health", get(health_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(app_state)
}
