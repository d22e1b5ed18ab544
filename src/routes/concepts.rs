use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::graph::traversal::{DEFAULT_CHAIN_DEPTH, MAX_CHAIN_DEPTH};
use crate::graph::types::{ConceptInput, EdgeStrength, PrerequisiteEdge};
use crate::response::{created, ok, respond, AppError};
use crate::routes::{parse_body, parse_query_usize};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ChainQuery {
    depth: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EdgeRequest {
    from: String,
    to: String,
    #[serde(default = "default_strength")]
    strength: EdgeStrength,
    #[serde(default)]
    reason: Option<String>,
}

fn default_strength() -> EdgeStrength {
    EdgeStrength::Required
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChainResponse {
    concept_id: String,
    depth: usize,
    direct: Vec<PrerequisiteEdge>,
    levels: Vec<Vec<String>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConceptDeleted {
    concept_id: String,
    edges_removed: usize,
}

pub async fn list(State(state): State<AppState>) -> Response {
    respond(state.graph().list_concepts().await)
}

pub async fn create(State(state): State<AppState>, body: Bytes) -> Response {
    let input: ConceptInput = match parse_body(&body) {
        Ok(value) => value,
        Err(res) => return res,
    };
    match state.graph().put_concept(input).await {
        Ok(concept) => created(concept),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn get_one(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    respond(state.graph().require_concept(&id).await)
}

/// The path id wins over any id in the body.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Response {
    let mut value: serde_json::Value = match parse_body(&body) {
        Ok(value) => value,
        Err(res) => return res,
    };
    let Some(object) = value.as_object_mut() else {
        return AppError::validation("request body must be a JSON object").into_response();
    };
    object.insert("id".to_string(), serde_json::Value::String(id));

    let input: ConceptInput = match serde_json::from_value(value) {
        Ok(input) => input,
        Err(err) => {
            return AppError::validation(format!("invalid request body: {err}")).into_response()
        }
    };
    respond(state.graph().put_concept(input).await)
}

pub async fn remove(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    respond(
        state
            .graph()
            .delete_concept(&id)
            .await
            .map(|edges_removed| ConceptDeleted {
                concept_id: id,
                edges_removed,
            }),
    )
}

pub async fn prerequisites(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ChainQuery>,
) -> Response {
    chain(state, id, query, Direction::Prerequisites).await
}

pub async fn dependents(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ChainQuery>,
) -> Response {
    chain(state, id, query, Direction::Dependents).await
}

enum Direction {
    Prerequisites,
    Dependents,
}

async fn chain(state: AppState, id: String, query: ChainQuery, direction: Direction) -> Response {
    let depth = match parse_query_usize("depth", query.depth.as_deref()) {
        Ok(depth) => depth.unwrap_or(DEFAULT_CHAIN_DEPTH).clamp(1, MAX_CHAIN_DEPTH),
        Err(res) => return res,
    };

    let graph = state.graph();
    let result = match direction {
        Direction::Prerequisites => match graph.prerequisite_chain(&id, depth).await {
            Ok(levels) => graph.prerequisites_of(&id).await.map(|direct| (direct, levels)),
            Err(err) => Err(err),
        },
        Direction::Dependents => match graph.dependent_chain(&id, depth).await {
            Ok(levels) => graph.dependents_of(&id).await.map(|direct| (direct, levels)),
            Err(err) => Err(err),
        },
    };

    respond(result.map(|(direct, levels)| ChainResponse {
        concept_id: id,
        depth,
        direct,
        levels,
    }))
}

pub async fn list_edges(State(state): State<AppState>) -> Response {
    respond(state.graph().list_edges().await)
}

pub async fn add_edge(State(state): State<AppState>, body: Bytes) -> Response {
    let request: EdgeRequest = match parse_body(&body) {
        Ok(value) => value,
        Err(res) => return res,
    };
    match state
        .graph()
        .add_edge(&request.from, &request.to, request.strength, request.reason)
        .await
    {
        Ok(edge) => created(edge),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub async fn remove_edge(
    State(state): State<AppState>,
    Path((from, to)): Path<(String, String)>,
) -> Response {
    match state.graph().remove_edge(&from, &to).await {
        Ok(()) => ok(serde_json::json!({ "from": from, "to": to })),
        Err(err) => AppError::from(err).into_response(),
    }
}
