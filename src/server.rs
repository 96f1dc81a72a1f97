//! HTTP server for document views.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/api/view/document` | Stream the rendered view of a document |
//! | `GET`  | `/api/view/promotion` | View a static content promotion (always 501) |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! `/api/view/document` takes `reference` (required), `database`,
//! `highlight` (comma-separated terms) and `output_type` query parameters.
//! The response carries the view server's `Content-Type` (so a non-HTML
//! `output_type` is served as such), `text/html` for raw content, and an
//! `x-docview-strategy` header naming the strategy used.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "document not found: doc-42" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `not_implemented` (501),
//! `render_error` (502), `backend_error` (502), `internal` (500).
//!
//! Resolution errors always produce an error response. Once the first byte
//! of a document has been sent, a later failure can only truncate the body;
//! it is logged.

use axum::{
    body::{Body, Bytes},
    extract::{Query, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use docview_core::models::{ViewOptions, ViewRequest};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tower_http::cors::{Any, CorsLayer};

use crate::error::ViewError;
use crate::view::ViewService;

/// Capacity of the in-process pipe between the view pipeline and the
/// response body.
const STREAM_BUFFER_BYTES: usize = 64 * 1024;

/// Media type used when the view backend does not report one.
const DEFAULT_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    service: Arc<ViewService>,
}

/// Build the application router. Exposed separately from [`run_server`]
/// so tests can serve it on an ephemeral listener.
pub fn router(service: Arc<ViewService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/view/document", get(handle_view_document))
        .route("/api/view/promotion", get(handle_view_promotion))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(AppState { service })
}

/// Starts the HTTP server on `bind` and serves until the process is
/// terminated.
pub async fn run_server(bind: &str, service: Arc<ViewService>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!("docview server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(service)).await?;
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

/// Internal error type that converts into an Axum HTTP response.
#[derive(Debug)]
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl AppError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<ViewError> for AppError {
    fn from(err: ViewError) -> Self {
        let message = err.to_string();
        match err {
            ViewError::NotFound { .. } => AppError::new(StatusCode::NOT_FOUND, "not_found", message),
            ViewError::Render { .. } => {
                AppError::new(StatusCode::BAD_GATEWAY, "render_error", message)
            }
            ViewError::Backend(_) => AppError::new(StatusCode::BAD_GATEWAY, "backend_error", message),
            ViewError::NotImplemented(_) => {
                AppError::new(StatusCode::NOT_IMPLEMENTED, "not_implemented", message)
            }
            ViewError::UriConstruction(_) | ViewError::Io(_) => {
                tracing::error!(error = %message, "internal error while viewing document");
                AppError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
            }
        }
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

// ============ GET /api/view/document ============

#[derive(Debug, Deserialize)]
struct ViewDocumentParams {
    reference: Option<String>,
    #[serde(default)]
    database: String,
    highlight: Option<String>,
    output_type: Option<String>,
}

impl ViewDocumentParams {
    fn into_request(self) -> Result<ViewRequest, AppError> {
        let reference = self
            .reference
            .filter(|r| !r.trim().is_empty())
            .ok_or_else(|| {
                AppError::new(StatusCode::BAD_REQUEST, "bad_request", "reference must not be empty")
            })?;

        let options = ViewOptions {
            highlight_expressions: self
                .highlight
                .map(|h| h.split(',').map(|t| t.trim().to_string()).collect())
                .unwrap_or_default(),
            output_type: self.output_type,
            ..Default::default()
        };

        Ok(ViewRequest::new(reference, self.database).with_options(options))
    }
}

/// Handler for `GET /api/view/document`.
///
/// Resolves the document first so that not-found and configuration errors
/// map to proper status codes, then streams the view through a bounded
/// in-process pipe. The pipeline runs in its own task; if the client goes
/// away the pipe closes and the task stops, releasing the backend response.
async fn handle_view_document(
    State(state): State<AppState>,
    Query(params): Query<ViewDocumentParams>,
) -> Result<Response, AppError> {
    let request = params.into_request()?;
    let resolved = state.service.resolve(&request).await?;
    let strategy = resolved.strategy_name();

    let (mut writer, reader) = tokio::io::duplex(STREAM_BUFFER_BYTES);
    let content_type = Arc::new(Mutex::new(None::<String>));
    let service = state.service.clone();
    let reported = content_type.clone();
    let task = tokio::spawn(async move {
        let mut on_content_type = move |ct: &str| *reported.lock() = Some(ct.to_string());
        service
            .stream_with_content_type(resolved, &mut writer, &mut on_content_type)
            .await
    });

    // Wait for the first bytes (or the end of the stream) so failures
    // before any output still become error responses. The content type is
    // reported before the first byte.
    let mut reader = BufReader::with_capacity(STREAM_BUFFER_BYTES, reader);
    let has_output = match reader.fill_buf().await {
        Ok(buf) => !buf.is_empty(),
        Err(_) => false,
    };

    if !has_output {
        return match task.await {
            Ok(Ok(_)) => {
                let content_type = content_type.lock().take();
                Ok(view_response(Body::empty(), strategy, content_type))
            }
            Ok(Err(e)) => Err(e.into()),
            Err(e) => Err(AppError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
                e.to_string(),
            )),
        };
    }
    let content_type = content_type.lock().take();

    let reference = request.reference;
    tokio::spawn(async move {
        match task.await {
            Ok(Ok(written)) => tracing::debug!(%reference, written, "view streamed"),
            Ok(Err(e)) => tracing::warn!(%reference, error = %e, "view stream aborted"),
            Err(e) => tracing::error!(%reference, error = %e, "view task panicked"),
        }
    });

    let body = futures::stream::try_unfold(reader, |mut reader| async move {
        let chunk = reader.fill_buf().await?;
        if chunk.is_empty() {
            return Ok::<_, std::io::Error>(None);
        }
        let bytes = Bytes::copy_from_slice(chunk);
        reader.consume(bytes.len());
        Ok(Some((bytes, reader)))
    });

    Ok(view_response(Body::from_stream(body), strategy, content_type))
}

/// Build a streamed view response. The backend's media type is passed
/// through; without one the body is served as HTML.
fn view_response(body: Body, strategy: &'static str, content_type: Option<String>) -> Response {
    let content_type = content_type
        .and_then(|ct| HeaderValue::from_str(&ct).ok())
        .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));

    let mut response = body.into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, content_type);
    headers.insert(
        HeaderName::from_static("x-docview-strategy"),
        HeaderValue::from_static(strategy),
    );
    response
}

// ============ GET /api/view/promotion ============

#[derive(Debug, Deserialize)]
struct ViewPromotionParams {
    #[serde(default)]
    reference: String,
}

async fn handle_view_promotion(
    State(state): State<AppState>,
    Query(params): Query<ViewPromotionParams>,
) -> Result<Response, AppError> {
    let mut sink = tokio::io::sink();
    let written = state
        .service
        .view_static_content_promotion(&params.reference, &mut sink)
        .await?;
    tracing::debug!(reference = %params.reference, written, "promotion viewed");
    Ok(StatusCode::OK.into_response())
}
