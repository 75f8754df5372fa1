//! Route handlers.
//!
//! Filesystem work runs on the blocking pool; lock operations are cheap and
//! run inline.

use super::AppState;
use crate::documents::{self, Document, NEW_DOCUMENT};
use crate::error::{QuillError, Result};
use crate::locks::Acquisition;
use crate::workspace::{DEFAULT_DOCUMENT, validate_resource_name};
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderName, StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use serde::Deserialize;

/// Request and response header carrying the lock token.
pub const LOCK_HEADER: &str = "x-lock";

/// Header carrying a document's current name.
pub const FILENAME_HEADER: &str = "x-filename";

const EDITOR_PAGE: &str = include_str!("../../static/index.html");

#[derive(Debug, Default, Deserialize)]
pub struct FileQuery {
    #[serde(default)]
    pub file: Option<String>,
}

pub async fn editor_page() -> Html<&'static str> {
    Html(EDITOR_PAGE)
}

pub async fn lock(
    State(state): State<AppState>,
    Query(query): Query<FileQuery>,
    headers: HeaderMap,
) -> Result<Response> {
    let name = query.file.unwrap_or_default();
    validate_resource_name(&name)?;
    let token = header_text(&headers, LOCK_HEADER).unwrap_or_default();

    match state.locks().acquire(&name, &token) {
        Acquisition::Created(token) => Ok(with_token(StatusCode::CREATED, token)),
        Acquisition::Refreshed(token) => Ok(with_token(StatusCode::OK, token)),
        Acquisition::Refused => Err(QuillError::LockDenied(name)),
    }
}

pub async fn unlock(
    State(state): State<AppState>,
    Query(query): Query<FileQuery>,
    headers: HeaderMap,
) -> Result<StatusCode> {
    let name = query.file.unwrap_or_default();
    validate_resource_name(&name)?;
    let token = header_text(&headers, LOCK_HEADER).unwrap_or_default();

    if state.locks().release(&name, &token) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(QuillError::LockDenied(name))
    }
}

pub async fn save(
    State(state): State<AppState>,
    Query(query): Query<FileQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    let name = query
        .file
        .filter(|f| !f.is_empty())
        .or_else(|| header_text(&headers, FILENAME_HEADER).filter(|f| !f.is_empty()))
        .unwrap_or_else(|| DEFAULT_DOCUMENT.to_string());
    let token = header_text(&headers, LOCK_HEADER).unwrap_or_default();

    let pipeline = state.pipeline.clone();
    let outcome = blocking(move || pipeline.save(&name, &body, &token)).await?;

    Ok((
        StatusCode::NO_CONTENT,
        [(HeaderName::from_static(FILENAME_HEADER), outcome.name)],
    )
        .into_response())
}

pub async fn index(State(state): State<AppState>) -> Result<Response> {
    let workspace = state.workspace().clone();
    let document = blocking(move || documents::load_index(&workspace)).await?;
    Ok(text_document(document))
}

pub async fn open(State(state): State<AppState>) -> Result<Response> {
    let workspace = state.workspace().clone();
    let document = blocking(move || documents::open_latest(&workspace)).await?;
    Ok(text_document(document))
}

pub async fn new_document(State(state): State<AppState>) -> Result<Response> {
    let workspace = state.workspace().clone();
    let created = blocking(move || documents::create_blank(&workspace, NEW_DOCUMENT)).await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, NEW_DOCUMENT).into_response())
}

/// Run `f` on the blocking thread pool.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| QuillError::Io(format!("background task failed: {}", e)))?
}

fn header_text(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| std::str::from_utf8(value.as_bytes()).ok())
        .map(|value| value.trim().to_string())
}

fn with_token(status: StatusCode, token: String) -> Response {
    (status, [(HeaderName::from_static(LOCK_HEADER), token)]).into_response()
}

fn text_document(document: Document) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (HeaderName::from_static(FILENAME_HEADER), document.name),
        ],
        document.content,
    )
        .into_response()
}
