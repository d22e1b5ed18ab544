mod adaptive;
mod concepts;
mod health;
mod learners;

use axum::body::Bytes;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get};
use axum::Router;
use serde::de::DeserializeOwned;

use crate::response::{json_error, AppError};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/concepts",
            get(concepts::list).post(concepts::create).fallback(fallback_handler),
        )
        .route(
            "/api/concepts/:id",
            get(concepts::get_one)
                .put(concepts::update)
                .delete(concepts::remove)
                .fallback(fallback_handler),
        )
        .route(
            "/api/concepts/:id/prerequisites",
            get(concepts::prerequisites).fallback(fallback_handler),
        )
        .route(
            "/api/concepts/:id/dependents",
            get(concepts::dependents).fallback(fallback_handler),
        )
        .route(
            "/api/edges",
            get(concepts::list_edges).post(concepts::add_edge).fallback(fallback_handler),
        )
        .route(
            "/api/edges/:from/:to",
            delete(concepts::remove_edge).fallback(fallback_handler),
        )
        .nest("/api/learners", learners::router().merge(adaptive::router()))
        .nest("/health", health::router())
        .fallback(fallback_handler)
        .with_state(state)
}

/// Decodes a JSON body, answering malformed payloads with the standard error envelope.
pub(crate) fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, Response> {
    serde_json::from_slice(body)
        .map_err(|err| AppError::validation(format!("invalid request body: {err}")).into_response())
}

/// Parses an optional numeric query parameter.
pub(crate) fn parse_query_usize(name: &str, raw: Option<&str>) -> Result<Option<usize>, Response> {
    let Some(raw) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    raw.parse::<usize>().map(Some).map_err(|_| {
        AppError::validation(format!("{name} must be a non-negative integer")).into_response()
    })
}

pub(crate) fn parse_query_bool(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

async fn fallback_handler() -> Response {
    json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "endpoint not found").into_response()
}
