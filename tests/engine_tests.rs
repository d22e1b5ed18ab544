use chrono::{Duration, Utc};

use learning_graph_backend::error::EngineError;
use learning_graph_backend::graph::derivation::HeuristicDerivation;
use learning_graph_backend::graph::types::{
    EdgeStrength, KnowledgeStateUpdate, MisconceptionInput, PrerequisiteEdge, ProfileInput,
    ScoreInput, Severity,
};
use learning_graph_backend::graph::GraphStore;
use learning_graph_backend::services::gaps::{detect_gaps, GapOptions};
use learning_graph_backend::services::learning_path::{generate_learning_path, PathCompletion};
use learning_graph_backend::services::remediation::{generate_remediation_plan_at, RemediationOptions};
use learning_graph_backend::services::review::{record_review_at, ReviewPerformance};
use learning_graph_backend::services::zpd::{compute_zpd, ZpdOptions};
use learning_graph_backend::store::config::{SqliteConfig, StoreBackend, StoreConfig};
use learning_graph_backend::store::keys::edge_key;
use learning_graph_backend::store::sqlite::SqliteStore;
use learning_graph_backend::store::Store;

mod common;

use common::{concept_input, memory_graph};

async fn sqlite_graph() -> GraphStore {
    GraphStore::new(Store::Sqlite(SqliteStore::in_memory().await.unwrap()))
}

async fn seed_chain(graph: &GraphStore) {
    for (id, absolute) in [("a", 3.0), ("b", 5.0), ("c", 6.0)] {
        graph.put_concept(concept_input(id, absolute)).await.unwrap();
    }
    graph
        .add_edge("a", "b", EdgeStrength::Required, None)
        .await
        .unwrap();
    graph
        .add_edge("b", "c", EdgeStrength::Required, None)
        .await
        .unwrap();
    graph
        .upsert_profile("u1", ProfileInput::default())
        .await
        .unwrap();
}

async fn check_state_idempotence(graph: GraphStore) {
    seed_chain(&graph).await;
    let update = KnowledgeStateUpdate {
        mastery: Some(55.0),
        bloom_level: Some(2),
        ..Default::default()
    };
    let t0 = Utc::now() - Duration::hours(1);
    let first = graph
        .set_knowledge_state_at("u1", "a", update.clone(), t0)
        .await
        .unwrap();
    let second = graph
        .set_knowledge_state_at("u1", "a", update, t0 + Duration::minutes(5))
        .await
        .unwrap();

    assert_eq!(first.mastery, second.mastery);
    assert_eq!(first.bloom_level, second.bloom_level);
    assert_eq!(second.first_seen, first.first_seen);
    assert!(second.updated_at > first.updated_at);
    assert!(second.last_accessed > first.last_accessed);
}

#[tokio::test]
async fn test_state_merge_is_idempotent_on_memory() {
    check_state_idempotence(memory_graph()).await;
}

#[tokio::test]
async fn test_state_merge_is_idempotent_on_sqlite() {
    check_state_idempotence(sqlite_graph().await).await;
}

#[tokio::test]
async fn test_review_count_cannot_decrease() {
    let graph = memory_graph();
    seed_chain(&graph).await;
    for count in [5, 1] {
        graph
            .set_knowledge_state(
                "u1",
                "a",
                KnowledgeStateUpdate {
                    review_count: Some(count),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    let state = graph.require_knowledge_state("u1", "a").await.unwrap();
    assert_eq!(state.review_count, 5);
}

#[tokio::test]
async fn test_state_requires_existing_concept() {
    let graph = memory_graph();
    let err = graph
        .set_knowledge_state("u1", "missing", KnowledgeStateUpdate::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn test_delete_concept_cascades_edges() {
    let graph = sqlite_graph().await;
    seed_chain(&graph).await;

    let removed = graph.delete_concept("b").await.unwrap();
    assert_eq!(removed, 2);
    assert!(graph.list_edges().await.unwrap().is_empty());
    assert!(graph.get_concept("b").await.unwrap().is_none());
    assert_eq!(graph.list_concepts().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_delete_profile_cascades_states_only_for_that_learner() {
    let graph = memory_graph();
    seed_chain(&graph).await;
    graph
        .upsert_profile("u2", ProfileInput::default())
        .await
        .unwrap();
    for user in ["u1", "u2"] {
        graph
            .set_knowledge_state(user, "a", KnowledgeStateUpdate::default())
            .await
            .unwrap();
    }

    assert_eq!(graph.delete_profile("u1").await.unwrap(), 1);
    assert!(graph.get_profile("u1").await.unwrap().is_none());
    assert_eq!(graph.list_knowledge_states("u2").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_profile_scores_merge_per_domain() {
    let graph = memory_graph();
    let mut first = ProfileInput::default();
    first.psychometric_scores.insert(
        "openness".into(),
        ScoreInput {
            score: 80.0,
            confidence: 0.9,
            source: None,
            last_updated: None,
        },
    );
    let created = graph.upsert_profile("u1", first).await.unwrap();

    let mut second = ProfileInput::default();
    second.psychometric_scores.insert(
        "neuroticism".into(),
        ScoreInput {
            score: 20.0,
            confidence: 1.0,
            source: Some("survey".into()),
            last_updated: None,
        },
    );
    let merged = graph.upsert_profile("u1", second).await.unwrap();

    assert_eq!(merged.score("openness"), Some(80.0));
    assert_eq!(merged.score("neuroticism"), Some(20.0));
    assert_eq!(merged.created_at, created.created_at);
}

#[tokio::test]
async fn test_profile_rejects_out_of_range_confidence() {
    let graph = memory_graph();
    let mut input = ProfileInput::default();
    input.psychometric_scores.insert(
        "openness".into(),
        ScoreInput {
            score: 50.0,
            confidence: 1.5,
            source: None,
            last_updated: None,
        },
    );
    let err = graph.upsert_profile("u1", input).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));
    assert!(graph.get_profile("u1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_cyclic_chains_terminate() {
    let graph = memory_graph();
    seed_chain(&graph).await;
    graph
        .add_edge("c", "a", EdgeStrength::Helpful, None)
        .await
        .unwrap();

    let levels = graph.prerequisite_chain("a", 10).await.unwrap();
    assert_eq!(levels, vec![vec!["c".to_string()], vec!["b".to_string()]]);
}

#[tokio::test]
async fn test_zpd_zones_partition_concepts() {
    let graph = memory_graph();
    seed_chain(&graph).await;
    graph
        .set_knowledge_state(
            "u1",
            "a",
            KnowledgeStateUpdate {
                mastery: Some(80.0),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let result = compute_zpd(&graph, &HeuristicDerivation, "u1", ZpdOptions::default())
        .await
        .unwrap();

    let mut all: Vec<&str> = result
        .too_easy
        .iter()
        .chain(&result.zpd)
        .chain(&result.too_hard)
        .map(|z| z.concept.id.as_str())
        .collect();
    all.sort_unstable();
    assert_eq!(all, vec!["a", "b", "c"]);
    assert_eq!(result.too_easy[0].concept.id, "a");
    assert!(result.zpd.iter().any(|z| z.concept.id == "b"));
    assert_eq!(result.too_hard[0].concept.id, "c");
}

#[tokio::test]
async fn test_unknown_learner_fails_fast() {
    let graph = memory_graph();
    seed_chain(&graph).await;

    let err = detect_gaps(&graph, "ghost", GapOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
    let err = generate_learning_path(&graph, &HeuristicDerivation, "ghost", 10)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

async fn seed_dangling_prerequisite(graph: &GraphStore) {
    // An edge whose prerequisite has no concept record can only arrive through the raw store.
    let dangling = PrerequisiteEdge {
        from: "ghost".into(),
        to: "b".into(),
        strength: EdgeStrength::Required,
        reason: None,
        created_at: Utc::now(),
    };
    graph
        .store()
        .put_json(&edge_key("ghost", "b"), &dangling)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_learning_path_forces_blocked_prerequisite() {
    let graph = memory_graph();
    seed_chain(&graph).await;
    seed_dangling_prerequisite(&graph).await;

    // Scores: a 70, c 160, b 250. With a placed, c heads the queue and pulls b in.
    let path = generate_learning_path(&graph, &HeuristicDerivation, "u1", 10)
        .await
        .unwrap();

    let order: Vec<(&str, bool)> = path
        .steps
        .iter()
        .map(|s| (s.concept_id.as_str(), s.forced))
        .collect();
    assert_eq!(order, vec![("a", false), ("b", true), ("c", false)]);
    assert_eq!(path.completion, PathCompletion::Complete);
}

#[tokio::test]
async fn test_learning_path_stops_at_dangling_prerequisite() {
    let graph = memory_graph();
    seed_chain(&graph).await;
    seed_dangling_prerequisite(&graph).await;
    graph
        .set_knowledge_state(
            "u1",
            "c",
            KnowledgeStateUpdate {
                mastery: Some(85.0),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let path = generate_learning_path(&graph, &HeuristicDerivation, "u1", 10)
        .await
        .unwrap();

    let order: Vec<&str> = path.steps.iter().map(|s| s.concept_id.as_str()).collect();
    assert_eq!(order, vec!["a"]);
    assert_eq!(
        path.completion,
        PathCompletion::MissingPrerequisite {
            concept_id: "b".into(),
            prerequisite_id: "ghost".into(),
        }
    );
}

#[tokio::test]
async fn test_remediation_ranks_major_misconception_over_forgotten() {
    let graph = memory_graph();
    seed_chain(&graph).await;
    let now = Utc::now();

    graph
        .set_knowledge_state_at(
            "u1",
            "a",
            KnowledgeStateUpdate {
                mastery: Some(90.0),
                ..Default::default()
            },
            now,
        )
        .await
        .unwrap();
    graph
        .add_misconception(
            "u1",
            "a",
            MisconceptionInput {
                description: "adds denominators".into(),
                severity: Severity::Major,
            },
        )
        .await
        .unwrap();
    // Roughly 30% retention: mastery 50, stability 7.5, four days since review.
    graph
        .set_knowledge_state_at(
            "u1",
            "b",
            KnowledgeStateUpdate {
                mastery: Some(50.0),
                review_count: Some(1),
                last_reviewed: Some(now - Duration::days(4)),
                ..Default::default()
            },
            now,
        )
        .await
        .unwrap();

    let result = generate_remediation_plan_at(
        &graph,
        &HeuristicDerivation,
        "u1",
        RemediationOptions::default(),
        now,
    )
    .await
    .unwrap();

    let steps = &result.plan.steps;
    assert_eq!(steps[0].concept_id, "a");
    assert_eq!(steps[0].priority, 130.0);
    assert_eq!(steps[1].concept_id, "b");
    assert!(steps.windows(2).all(|w| w[0].priority >= w[1].priority));
    assert!(result.gaps.forgotten[0].predicted_retention < 35.0);
}

#[tokio::test]
async fn test_record_review_advances_schedule() {
    let graph = memory_graph();
    seed_chain(&graph).await;
    let now = Utc::now();
    graph
        .set_knowledge_state_at(
            "u1",
            "b",
            KnowledgeStateUpdate {
                mastery: Some(85.0),
                review_count: Some(2),
                last_reviewed: Some(now),
                ..Default::default()
            },
            now,
        )
        .await
        .unwrap();

    let outcome = record_review_at(&graph, "u1", "b", ReviewPerformance::Good, now)
        .await
        .unwrap();

    assert_eq!(outcome.state.review_count, 3);
    assert_eq!(outcome.schedule.interval_days, 7);
    assert_eq!(outcome.state.next_review, Some(now + Duration::days(7)));
    assert_eq!(outcome.state.last_reviewed, Some(now));
}

#[tokio::test]
async fn test_sqlite_file_store_persists_across_handles() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig {
        backend: StoreBackend::Sqlite,
        sqlite: SqliteConfig {
            path: dir.path().join("nested").join("graph.db"),
            ..SqliteConfig::default()
        },
    };

    {
        let graph = GraphStore::new(Store::open(&config).await.unwrap());
        seed_chain(&graph).await;
    }

    let reopened = GraphStore::new(Store::open(&config).await.unwrap());
    assert_eq!(reopened.list_concepts().await.unwrap().len(), 3);
    assert_eq!(reopened.prerequisites_of("c").await.unwrap()[0].from, "b");
    assert!(reopened.get_profile("u1").await.unwrap().is_some());
}
