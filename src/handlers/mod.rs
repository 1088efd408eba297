use crate::engines::{FilterMode, LibreOfficeEngine};
use crate::error::{AppError, Result};
use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

pub struct AppState {
    pub engine: LibreOfficeEngine,
    /// Conversions share one engine process name, so only one may run at a time
    conversion_lock: Mutex<()>,
}

impl AppState {
    pub fn new(engine: LibreOfficeEngine) -> Self {
        Self {
            engine,
            conversion_lock: Mutex::new(()),
        }
    }
}

/// Build the HTTP application around a configured engine
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/convert", post(convert_handler))
        .route("/health", get(health_handler))
        .route("/info", get(info_handler))
        .route("/", get(info_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Upload an office document and receive the PDF
pub async fn convert_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Response> {
    let request_id = Uuid::new_v4();
    let mut file_data: Option<(String, Vec<u8>)> = None;
    let max_timeout = state.engine.config().default_timeout;
    let mut timeout = max_timeout;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        AppError::InvalidRequest(format!("Failed to parse multipart data: {}", e))
    })? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                let filename = field
                    .file_name()
                    .and_then(|f| Path::new(f).file_name())
                    .and_then(|f| f.to_str())
                    .ok_or_else(|| AppError::InvalidRequest("No filename provided".to_string()))?
                    .to_string();

                let data = field.bytes().await.map_err(|e| {
                    AppError::InvalidRequest(format!("Failed to read file data: {}", e))
                })?;

                info!(%request_id, "Received file: {} ({} bytes)", filename, data.len());
                file_data = Some((filename, data.to_vec()));
            }
            "timeoutSecs" => {
                let value = field.text().await.unwrap_or_default();
                let secs = value.trim().parse::<u64>().ok().filter(|s| *s > 0).ok_or_else(|| {
                    AppError::InvalidRequest(format!("Invalid timeoutSecs: '{}'", value))
                })?;
                // Clients may shorten the deadline, never extend it
                timeout = Duration::from_secs(secs).min(max_timeout);
            }
            _ => {
                // Ignore unknown fields
            }
        }
    }

    let (filename, data) = file_data.ok_or(AppError::NoFileProvided)?;

    // Reject before touching the disk or waiting for the lock
    if !FilterMode::from_path(Path::new(&filename)).is_supported() {
        return Err(AppError::UnsupportedFormat(format!(
            "No filter for '{}'",
            filename
        )));
    }

    let work_dir = tempfile::tempdir()?;
    let input_path = work_dir.path().join(&filename);
    tokio::fs::write(&input_path, &data).await?;

    let pdf_path = {
        let _guard = state.conversion_lock.lock().await;
        state
            .engine
            .convert(&input_path, Some(work_dir.path()), timeout)
            .await?
    };

    let pdf = tokio::fs::read(&pdf_path).await?;

    let pdf_name = pdf_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output.pdf".to_string());
    info!(%request_id, "Converted {} ({} bytes)", pdf_name, pdf.len());

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, mime::APPLICATION_PDF.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", pdf_name),
            ),
        ],
        pdf,
    )
        .into_response())
}

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "docmill"
    }))
}

/// Service information: supported formats and engine policies
pub async fn info_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let config = state.engine.config();
    let formats: serde_json::Map<String, serde_json::Value> = FilterMode::SUPPORTED
        .into_iter()
        .map(|mode| {
            (
                mode.name().to_string(),
                json!({
                    "filter": mode.export_filter(),
                    "extensions": mode.extensions(),
                }),
            )
        })
        .collect();

    Json(json!({
        "service": "docmill",
        "version": env!("CARGO_PKG_VERSION"),
        "engine": {
            "path": config.soffice_path.display().to_string(),
            "worker_name": config.worker_name,
            "deadline": config.deadline,
            "default_timeout_secs": config.default_timeout.as_secs(),
            "kill_after_success": config.kill_after_success,
        },
        "supported_formats": formats,
        "endpoints": {
            "convert": {
                "path": "/convert",
                "method": "POST",
                "content_type": "multipart/form-data",
                "fields": {
                    "file": "The office document to convert (required)",
                    "timeoutSecs": "Conversion deadline in seconds, capped at default_timeout_secs (optional)"
                }
            },
            "health": {
                "path": "/health",
                "method": "GET"
            },
            "info": {
                "path": "/info",
                "method": "GET"
            }
        }
    }))
}
