//! HTTP API over the ingestion and retrieval core.
//!
//! # Endpoints
//!
//! | Method   | Path                         | Description |
//! |----------|------------------------------|-------------|
//! | `POST`   | `/api/upload`                | Multipart upload; schedules ingestion per file |
//! | `POST`   | `/api/query`                 | Answer a question against the index |
//! | `GET`    | `/api/metadata`              | List documents with status |
//! | `DELETE` | `/api/documents/{filename}`  | Remove a document's index entries and ledger rows |
//! | `GET`    | `/health`                    | Health check |
//!
//! Upload acceptance is unconditional once the file is received: the
//! handler writes each part to the upload directory, schedules a
//! fire-and-forget pipeline task, and acknowledges. Processing outcomes
//! are observable only through `/api/metadata`.
//!
//! # Error contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "no files were provided" } }
//! ```

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path as AxumPath, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::index::VectorIndex;
use crate::ingest::IngestionPipeline;
use crate::ledger::DocumentLedger;
use crate::models::format_ts_iso;
use crate::query::QueryEngine;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub ledger: DocumentLedger,
    pub index: Arc<dyn VectorIndex>,
    pub pipeline: Arc<IngestionPipeline>,
    pub engine: Arc<QueryEngine>,
}

/// Start the HTTP server on the configured bind address. Runs until the
/// process is terminated.
pub async fn run_server(state: AppState) -> anyhow::Result<()> {
    let bind_addr = state.config.server.bind.clone();

    std::fs::create_dir_all(&state.config.upload.dir)?;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/api/upload", post(handle_upload))
        .route("/api/query", post(handle_query))
        .route("/api/metadata", get(handle_metadata))
        .route("/api/documents/{filename}", delete(handle_delete))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    tracing::info!(bind = %bind_addr, "server listening");

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn internal_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /api/upload ============

#[derive(Serialize)]
struct UploadResponse {
    message: String,
}

/// Accept one or more files and schedule each for background ingestion.
///
/// Filenames are taken from the multipart part and must be bare names;
/// anything containing a path separator is rejected rather than
/// interpreted as a path.
async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut scheduled = 0usize;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("invalid multipart body: {}", e)))?
    {
        let filename = match field.file_name() {
            Some(name) => name.to_string(),
            None => continue,
        };
        if filename.is_empty() || filename.contains('/') || filename.contains('\\') {
            return Err(bad_request(format!("invalid filename: {:?}", filename)));
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| bad_request(format!("failed to read upload: {}", e)))?;

        let path = state.config.upload.dir.join(&filename);
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| internal_error(format!("failed to store upload: {}", e)))?;

        state.pipeline.schedule(path, filename);
        scheduled += 1;
    }

    if scheduled == 0 {
        return Err(bad_request("no files were provided"));
    }

    Ok(Json(UploadResponse {
        message: format!("{} files received and scheduled for processing", scheduled),
    }))
}

// ============ POST /api/query ============

#[derive(Deserialize)]
struct QueryRequest {
    query: String,
}

#[derive(Serialize)]
struct QueryResponse {
    answer: String,
}

async fn handle_query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, AppError> {
    if request.query.trim().is_empty() {
        return Err(bad_request("query must not be empty"));
    }

    let answer = state
        .engine
        .answer(&request.query)
        .await
        .map_err(|e| internal_error(e.to_string()))?;

    Ok(Json(QueryResponse { answer }))
}

// ============ GET /api/metadata ============

#[derive(Serialize)]
struct DocumentMetadata {
    filename: String,
    upload_date: String,
    processing_status: String,
}

async fn handle_metadata(
    State(state): State<AppState>,
) -> Result<Json<Vec<DocumentMetadata>>, AppError> {
    let docs = state
        .ledger
        .list()
        .await
        .map_err(|e| internal_error(e.to_string()))?;

    let metadata = docs
        .into_iter()
        .map(|d| DocumentMetadata {
            filename: d.filename,
            upload_date: format_ts_iso(d.upload_date),
            processing_status: d.status.to_string(),
        })
        .collect();

    Ok(Json(metadata))
}

// ============ DELETE /api/documents/{filename} ============

#[derive(Serialize)]
struct DeleteResponse {
    message: String,
}

/// Remove a document by filename: index entries and ledger rows are
/// deleted as independent best-effort calls (no two-phase commit).
/// Deleting a filename with zero records is a no-op, not an error.
async fn handle_delete(
    State(state): State<AppState>,
    AxumPath(filename): AxumPath<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    state
        .index
        .delete_by_source(&filename)
        .await
        .map_err(|e| internal_error(e.to_string()))?;

    state
        .ledger
        .delete_by_filename(&filename)
        .await
        .map_err(|e| internal_error(e.to_string()))?;

    Ok(Json(DeleteResponse {
        message: format!("{} deleted", filename),
    }))
}
