#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use learning_graph_backend::graph::types::{ConceptInput, Difficulty};
use learning_graph_backend::graph::GraphStore;
use learning_graph_backend::store::Store;

pub async fn create_test_app() -> Router {
    learning_graph_backend::create_app()
}

pub fn memory_graph() -> GraphStore {
    GraphStore::new(Store::memory())
}

pub fn concept_input(id: &str, absolute: f64) -> ConceptInput {
    ConceptInput {
        id: id.to_string(),
        name: id.to_uppercase(),
        domain: "math".to_string(),
        subdomain: None,
        description: String::new(),
        difficulty: Difficulty {
            absolute,
            ..Difficulty::default()
        },
        bloom_objectives: None,
        time_estimates: None,
        tags: Vec::new(),
    }
}

pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}
