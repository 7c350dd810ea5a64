//! HTTP transport: axum routes over the operation router.
//!
//! This layer is deliberately thin: it extracts session claims from the
//! authenticator's headers, hands the raw path string to the router, and
//! maps results to JSON bodies or a streamed download. All path and
//! authorization decisions happen below it.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use protocol::error::{ErrorBody, ErrorCode};
use protocol::messages::{
    CreateFolderRequest, DeleteRequest, ListResponse, UploadReport,
};
use serde::Deserialize;
use tokio_util::io::ReaderStream;
use tower_http::trace::TraceLayer;

use crate::files::UploadFile;
use crate::router::{OperationRouter, RouterError};
use crate::session::{ClaimsResolver, SessionClaims};

/// Shared state for all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    router: Arc<OperationRouter>,
    claims: Arc<dyn ClaimsResolver>,
}

impl AppState {
    /// Create the handler state.
    pub fn new(router: Arc<OperationRouter>, claims: Arc<dyn ClaimsResolver>) -> Self {
        Self { router, claims }
    }

    fn authenticate(&self, headers: &HeaderMap) -> Result<SessionClaims, ApiError> {
        self.claims
            .resolve(headers)
            .ok_or(ApiError::Unauthenticated)
    }
}

/// Errors produced at the HTTP boundary.
#[derive(Debug)]
pub enum ApiError {
    /// No authenticated session on the request.
    Unauthenticated,
    /// Malformed request (bad multipart, empty batch).
    BadRequest(String),
    /// Error from the operation router.
    Router(RouterError),
}

impl From<RouterError> for ApiError {
    fn from(e: RouterError) -> Self {
        ApiError::Router(e)
    }
}

/// HTTP status for each wire error code.
fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::PathEscape | ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::AlreadyExists => StatusCode::CONFLICT,
        ErrorCode::InvalidArgument => StatusCode::BAD_REQUEST,
        ErrorCode::Io => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorCode::Unauthenticated => StatusCode::UNAUTHORIZED,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self {
            ApiError::Unauthenticated => {
                ErrorBody::new(ErrorCode::Unauthenticated, "authentication required")
            }
            ApiError::BadRequest(message) => ErrorBody::new(ErrorCode::InvalidArgument, message),
            ApiError::Router(e) => e.to_error_body(),
        };
        (status_for(body.code), Json(body)).into_response()
    }
}

/// Query parameter carrying the relative path; defaults to the root.
#[derive(Debug, Deserialize)]
struct PathQuery {
    #[serde(default)]
    path: String,
}

/// Build the HTTP router.
///
/// `max_body_size` bounds upload request bodies; everything else uses
/// axum's default limit.
pub fn build_router(state: AppState, max_body_size: usize) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/list", get(list))
        .route("/api/download", get(download))
        .route("/api/upload", post(upload))
        .route("/api/folders", post(create_folder))
        .route("/api/delete", post(delete))
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn list(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<PathQuery>,
) -> Result<Json<ListResponse>, ApiError> {
    let claims = state.authenticate(&headers)?;
    Ok(Json(state.router.list(&claims, &query.path)?))
}

async fn download(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<PathQuery>,
) -> Result<Response, ApiError> {
    let claims = state.authenticate(&headers)?;
    let download = state.router.download(&claims, &query.path)?;

    let stream = ReaderStream::new(tokio::fs::File::from_std(download.file));
    let mut response = Response::new(Body::from_stream(stream));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    response
        .headers_mut()
        .insert(header::CONTENT_LENGTH, HeaderValue::from(download.size));
    response.headers_mut().insert(
        header::CONTENT_DISPOSITION,
        attachment_header(&download.name),
    );
    Ok(response)
}

async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<PathQuery>,
    mut multipart: Multipart,
) -> Result<Json<UploadReport>, ApiError> {
    let claims = state.authenticate(&headers)?;

    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        let name = field
            .file_name()
            .map(str::to_string)
            .or_else(|| field.name().map(str::to_string))
            .unwrap_or_default();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("failed to read file {name:?}: {e}")))?;
        files.push(UploadFile { name, data });
    }

    if files.is_empty() {
        return Err(ApiError::BadRequest("No files uploaded.".to_string()));
    }

    Ok(Json(state.router.upload(&claims, &query.path, files)?))
}

async fn create_folder(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateFolderRequest>,
) -> Result<Json<protocol::messages::CreateFolderResponse>, ApiError> {
    let claims = state.authenticate(&headers)?;
    Ok(Json(state.router.create_folder(
        &claims,
        &request.path,
        &request.folder_name,
    )?))
}

async fn delete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<DeleteRequest>,
) -> Result<Json<protocol::messages::DeleteResponse>, ApiError> {
    let claims = state.authenticate(&headers)?;
    Ok(Json(state.router.delete(&claims, &request.path)?))
}

/// Content-Disposition attachment header for a download name.
///
/// Names have already had control characters stripped; quotes are
/// substituted so the header stays parseable, and a bare `attachment`
/// is the fallback for names no header value can carry.
fn attachment_header(name: &str) -> HeaderValue {
    let sanitized = name.replace('"', "'");
    HeaderValue::from_str(&format!("attachment; filename=\"{sanitized}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}
