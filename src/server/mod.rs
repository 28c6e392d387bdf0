use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::backend::probe_endpoint;
use crate::config::Config;
use crate::loaders::{self, SaveFailure, ScanError};
use crate::rag::{KnowledgeEngine, QueryMode};

/// Dashboard state. The engine is optional: without it the dashboard
/// still serves status, configuration, scanning and uploads.
pub struct AppState {
    pub config: Config,
    pub client: reqwest::Client,
    pub engine: Option<KnowledgeEngine>,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    #[serde(default)]
    pub mode: QueryMode,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub answer: String,
    pub mode: QueryMode,
}

#[derive(Debug, Serialize)]
pub struct ServiceStatus {
    pub name: String,
    pub online: bool,
    pub endpoint: String,
    pub model: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub services: Vec<ServiceStatus>,
    pub documents: Option<usize>,
    pub indexed_chunks: Option<usize>,
    pub indexed_sources: Option<Vec<String>>,
    pub rag_enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/config", get(show_config))
        .route("/documents", get(list_documents).post(upload_documents))
        .route("/ingest", post(ingest))
        .route("/query", post(query))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let llm_endpoint = state.config.llm_endpoint();
    let embed_endpoint = state.config.embedding_endpoint();

    let (llm_online, embed_online) = tokio::join!(
        probe_endpoint(&state.client, &llm_endpoint),
        probe_endpoint(&state.client, &embed_endpoint),
    );

    let documents = loaders::scan_directory(&state.config, &state.config.storage.docs_dir)
        .map(|entries| entries.len())
        .ok();

    let (indexed_chunks, indexed_sources) = match &state.engine {
        Some(engine) => (
            engine.chunk_count().await.ok(),
            engine.sources().await.ok(),
        ),
        None => (None, None),
    };

    Json(StatusResponse {
        services: vec![
            ServiceStatus {
                name: "llm".to_string(),
                online: llm_online,
                endpoint: llm_endpoint,
                model: state.config.llm.model.clone(),
            },
            ServiceStatus {
                name: "embedding".to_string(),
                online: embed_online,
                endpoint: embed_endpoint,
                model: state.config.embedding.model.clone(),
            },
        ],
        documents,
        indexed_chunks,
        indexed_sources,
        rag_enabled: state.engine.is_some(),
    })
}

async fn show_config(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.config.clone())
}

async fn list_documents(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match loaders::scan_directory(&state.config, &state.config.storage.docs_dir) {
        Ok(entries) => Json(entries).into_response(),
        Err(e @ ScanError::DirectoryMissing(_)) => {
            error_response(StatusCode::NOT_FOUND, e.to_string())
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn upload_documents(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut uploads: Vec<(String, Vec<u8>)> = Vec::new();
    let mut read_failures: Vec<SaveFailure> = Vec::new();

    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                let Some(filename) = field.file_name().map(|s| s.to_string()) else {
                    continue;
                };

                match field.bytes().await {
                    Ok(bytes) => uploads.push((filename, bytes.to_vec())),
                    Err(e) => read_failures.push(SaveFailure {
                        name: filename,
                        error: e.to_string(),
                    }),
                }
            }
            Ok(None) => break,
            Err(e) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    format!("Failed to read multipart body: {}", e),
                );
            }
        }
    }

    let mut report = loaders::save_uploads(&uploads, &state.config.storage.docs_dir);
    report.failed.extend(read_failures);

    Json(report).into_response()
}

async fn ingest(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let Some(engine) = &state.engine else {
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "RAG engine is not wired in; restart without --no-rag",
        );
    };

    match engine.ingest_directory(&state.config.storage.docs_dir).await {
        Ok(report) => Json(report).into_response(),
        Err(e @ ScanError::DirectoryMissing(_)) => {
            error_response(StatusCode::NOT_FOUND, e.to_string())
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn query(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QueryRequest>,
) -> impl IntoResponse {
    if req.question.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Question must not be empty");
    }

    let Some(engine) = &state.engine else {
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "RAG engine is not wired in; restart without --no-rag",
        );
    };

    let answer = engine.answer(&req.question, req.mode).await;

    Json(QueryResponse {
        answer,
        mode: req.mode,
    })
    .into_response()
}

pub async fn run_server(state: Arc<AppState>, host: &str, port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    let app = create_router(state);

    tracing::info!("Starting dashboard on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
