use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::graph::types::{KnowledgeStateUpdate, MisconceptionInput, ProfileInput};
use crate::response::{created, ok, respond, AppError};
use crate::routes::parse_body;
use crate::services::decay::{predict_decay, DecayPrediction};
use crate::services::review::{record_review, schedule_next_review, ReviewPerformance, ReviewSchedule};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/:user_id",
            get(get_profile).put(upsert_profile).delete(delete_profile),
        )
        .route("/:user_id/knowledge", get(list_knowledge))
        .route(
            "/:user_id/knowledge/:concept_id",
            get(get_knowledge).put(set_knowledge),
        )
        .route(
            "/:user_id/knowledge/:concept_id/misconceptions",
            post(add_misconception),
        )
        .route(
            "/:user_id/knowledge/:concept_id/misconceptions/:misconception_id/resolve",
            post(resolve_misconception),
        )
        .route("/:user_id/knowledge/:concept_id/review", post(review))
        .route("/:user_id/knowledge/:concept_id/decay", get(decay))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewRequest {
    performance: ReviewPerformance,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LearnerDeleted {
    user_id: String,
    states_removed: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DecayResponse {
    concept_id: String,
    decay: DecayPrediction,
    schedule: ReviewSchedule,
}

async fn get_profile(State(state): State<AppState>, Path(user_id): Path<String>) -> Response {
    respond(state.graph().require_profile(&user_id).await)
}

async fn upsert_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    body: Bytes,
) -> Response {
    let input: ProfileInput = match parse_body(&body) {
        Ok(value) => value,
        Err(res) => return res,
    };
    respond(state.graph().upsert_profile(&user_id, input).await)
}

async fn delete_profile(State(state): State<AppState>, Path(user_id): Path<String>) -> Response {
    respond(
        state
            .graph()
            .delete_profile(&user_id)
            .await
            .map(|states_removed| LearnerDeleted {
                user_id,
                states_removed,
            }),
    )
}

async fn list_knowledge(State(state): State<AppState>, Path(user_id): Path<String>) -> Response {
    let graph = state.graph();
    if let Err(err) = graph.require_profile(&user_id).await {
        return AppError::from(err).into_response();
    }
    respond(graph.list_knowledge_states(&user_id).await)
}

async fn get_knowledge(
    State(state): State<AppState>,
    Path((user_id, concept_id)): Path<(String, String)>,
) -> Response {
    respond(state.graph().require_knowledge_state(&user_id, &concept_id).await)
}

async fn set_knowledge(
    State(state): State<AppState>,
    Path((user_id, concept_id)): Path<(String, String)>,
    body: Bytes,
) -> Response {
    let update: KnowledgeStateUpdate = match parse_body(&body) {
        Ok(value) => value,
        Err(res) => return res,
    };
    respond(
        state
            .graph()
            .set_knowledge_state(&user_id, &concept_id, update)
            .await,
    )
}

async fn add_misconception(
    State(state): State<AppState>,
    Path((user_id, concept_id)): Path<(String, String)>,
    body: Bytes,
) -> Response {
    let input: MisconceptionInput = match parse_body(&body) {
        Ok(value) => value,
        Err(res) => return res,
    };
    match state
        .graph()
        .add_misconception(&user_id, &concept_id, input)
        .await
    {
        Ok(updated) => created(updated),
        Err(err) => AppError::from(err).into_response(),
    }
}

async fn resolve_misconception(
    State(state): State<AppState>,
    Path((user_id, concept_id, misconception_id)): Path<(String, String, String)>,
) -> Response {
    respond(
        state
            .graph()
            .resolve_misconception(&user_id, &concept_id, &misconception_id)
            .await,
    )
}

async fn review(
    State(state): State<AppState>,
    Path((user_id, concept_id)): Path<(String, String)>,
    body: Bytes,
) -> Response {
    let request: ReviewRequest = match parse_body(&body) {
        Ok(value) => value,
        Err(res) => return res,
    };
    respond(record_review(state.graph(), &user_id, &concept_id, request.performance).await)
}

async fn decay(
    State(state): State<AppState>,
    Path((user_id, concept_id)): Path<(String, String)>,
) -> Response {
    let graph = state.graph();
    let concept = match graph.require_concept(&concept_id).await {
        Ok(concept) => concept,
        Err(err) => return AppError::from(err).into_response(),
    };
    let knowledge = match graph.require_knowledge_state(&user_id, &concept_id).await {
        Ok(knowledge) => knowledge,
        Err(err) => return AppError::from(err).into_response(),
    };

    ok(DecayResponse {
        concept_id,
        decay: predict_decay(&knowledge, &concept),
        schedule: schedule_next_review(&knowledge, &concept, None),
    })
}
