//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        db::DbAdapter, hf_summarizer::HuggingFaceSummarizer,
        openai_summarizer::OpenAiSummarizer, pdf::LopdfExtractor,
    },
    config::{Config, SummaryBackendKind},
    error::ApiError,
    web::{api_router, rest::ApiDoc, state::AppState},
};
use async_openai::{config::OpenAIConfig, Client};
use axum::http::{header::{ACCEPT, CONTENT_TYPE}, HeaderValue, Method};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use study_assistant_core::ports::SummarizationBackend;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

fn build_backend(config: &Config) -> Result<Arc<dyn SummarizationBackend>, ApiError> {
    match config.summary_backend {
        SummaryBackendKind::HuggingFace => {
            if config.huggingface_api_key.is_none() {
                info!("HUGGINGFACE_API_KEY not set; calling the inference API anonymously");
            }
            let backend = HuggingFaceSummarizer::new(
                config.huggingface_api_url.clone(),
                config.summary_model.clone(),
                config.huggingface_api_key.clone(),
                config.remote_timeout(),
            )?;
            Ok(Arc::new(backend))
        }
        SummaryBackendKind::OpenAi => {
            let api_key = config
                .openai_api_key
                .as_ref()
                .ok_or_else(|| ApiError::Internal("OPENAI_API_KEY is required".to_string()))?;
            let client = Client::with_config(OpenAIConfig::new().with_api_key(api_key));
            Ok(Arc::new(OpenAiSummarizer::new(
                client,
                config.summary_model.clone(),
            )))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    tokio::fs::create_dir_all(&config.upload_dir).await?;
    let extractor = Arc::new(LopdfExtractor::new());
    let backend = build_backend(&config)?;
    info!(
        model = backend.model_id(),
        max_chunk_chars = config.max_chunk_chars,
        "Summarization backend ready"
    );

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(
        config.clone(),
        db_adapter,
        extractor,
        backend,
    ));

    let origin = config.allowed_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid ALLOWED_ORIGIN '{}': {}", config.allowed_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    let app = Router::new()
        .merge(api_router(app_state).layer(cors))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
