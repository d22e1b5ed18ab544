use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use crate::response::{respond, AppError};
use crate::routes::{parse_query_bool, parse_query_usize};
use crate::services::gaps::{detect_gaps, GapOptions, GapType};
use crate::services::learning_path::{generate_learning_path, DEFAULT_MAX_CONCEPTS};
use crate::services::psychometric::adjust_for_profile;
use crate::services::remediation::{generate_remediation_plan, RemediationOptions};
use crate::services::review::review_queue;
use crate::services::zpd::{compute_zpd, ZpdOptions};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:user_id/zpd", get(zpd))
        .route("/:user_id/gaps", get(gaps))
        .route("/:user_id/learning-path", get(learning_path))
        .route("/:user_id/remediation", get(remediation))
        .route("/:user_id/reviews", get(reviews))
        .route("/:user_id/adjustment", get(adjustment))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdaptiveQuery {
    limit: Option<String>,
    #[serde(rename = "type")]
    gap_type: Option<String>,
    include_recommendations: Option<String>,
    max_concepts: Option<String>,
    max_steps: Option<String>,
    focus_type: Option<String>,
}

fn gap_type(raw: Option<&str>) -> Result<Option<GapType>, Response> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(value) => GapType::parse(value)
            .map(Some)
            .map_err(|err| AppError::from(err).into_response()),
    }
}

async fn zpd(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<AdaptiveQuery>,
) -> Response {
    let mut options = ZpdOptions::default();
    match parse_query_usize("limit", query.limit.as_deref()) {
        Ok(Some(limit)) => options.limit = limit,
        Ok(None) => {}
        Err(res) => return res,
    }
    respond(compute_zpd(state.graph(), state.derivation(), &user_id, options).await)
}

async fn gaps(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<AdaptiveQuery>,
) -> Response {
    let gap_type = match gap_type(query.gap_type.as_deref()) {
        Ok(value) => value,
        Err(res) => return res,
    };
    let options = GapOptions {
        gap_type,
        include_recommendations: parse_query_bool(query.include_recommendations.as_deref()),
    };
    respond(detect_gaps(state.graph(), &user_id, options).await)
}

async fn learning_path(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<AdaptiveQuery>,
) -> Response {
    let max_concepts = match parse_query_usize("maxConcepts", query.max_concepts.as_deref()) {
        Ok(value) => value.unwrap_or(DEFAULT_MAX_CONCEPTS),
        Err(res) => return res,
    };
    respond(generate_learning_path(state.graph(), state.derivation(), &user_id, max_concepts).await)
}

async fn remediation(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<AdaptiveQuery>,
) -> Response {
    let mut options = RemediationOptions::default();
    match parse_query_usize("maxSteps", query.max_steps.as_deref()) {
        Ok(Some(max_steps)) => options.max_steps = max_steps,
        Ok(None) => {}
        Err(res) => return res,
    }
    match gap_type(query.focus_type.as_deref()) {
        Ok(focus) => options.focus_type = focus,
        Err(res) => return res,
    }
    respond(generate_remediation_plan(state.graph(), state.derivation(), &user_id, options).await)
}

async fn reviews(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<AdaptiveQuery>,
) -> Response {
    let limit = match parse_query_usize("limit", query.limit.as_deref()) {
        Ok(value) => value,
        Err(res) => return res,
    };
    respond(review_queue(state.graph(), &user_id, limit).await)
}

async fn adjustment(State(state): State<AppState>, Path(user_id): Path<String>) -> Response {
    respond(
        state
            .graph()
            .require_profile(&user_id)
            .await
            .map(|profile| adjust_for_profile(&profile, state.derivation())),
    )
}
