//! Typed accessor over the key-value store: concepts, prerequisite edges,
//! learner profiles and per-learner knowledge states.

pub mod derivation;
pub mod merge;
pub mod snapshot;
pub mod traversal;
pub mod types;

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::graph::merge::{
    merge_concept, merge_knowledge_state, merge_profile, validate_concept_input, validate_id,
    validate_profile_input, validate_state_update,
};
use crate::graph::snapshot::GraphSnapshot;
use crate::graph::traversal::bfs_levels;
use crate::graph::types::{
    ConceptInput, ConceptNode, EdgeStrength, KnowledgeState, KnowledgeStateUpdate,
    LearnerProfile, Misconception, MisconceptionInput, PrerequisiteEdge, ProfileInput,
};
use crate::store::keys::{
    concept_key, edge_key, edges_from_prefix, learner_key, state_key, user_states_prefix,
    CONCEPT_PREFIX, EDGE_PREFIX,
};
use crate::store::{BatchOp, ScanOptions, Store};

#[derive(Clone)]
pub struct GraphStore {
    store: Store,
}

impl GraphStore {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    // ---- concepts ----

    pub async fn put_concept(&self, input: ConceptInput) -> EngineResult<ConceptNode> {
        validate_concept_input(&input)?;
        let key = concept_key(&input.id);
        let existing: Option<ConceptNode> = self.store.get_json(&key).await?;
        let concept = merge_concept(existing, input, Utc::now());
        self.store.put_json(&key, &concept).await?;
        Ok(concept)
    }

    pub async fn get_concept(&self, concept_id: &str) -> EngineResult<Option<ConceptNode>> {
        Ok(self.store.get_json(&concept_key(concept_id)).await?)
    }

    pub async fn require_concept(&self, concept_id: &str) -> EngineResult<ConceptNode> {
        self.get_concept(concept_id)
            .await?
            .ok_or_else(|| EngineError::concept_not_found(concept_id))
    }

    pub async fn list_concepts(&self) -> EngineResult<Vec<ConceptNode>> {
        Ok(self
            .store
            .scan_json(CONCEPT_PREFIX, ScanOptions::default())
            .await?)
    }

    /// Removes the concept and every edge touching it in one batch.
    /// Returns the number of edges removed.
    pub async fn delete_concept(&self, concept_id: &str) -> EngineResult<usize> {
        self.require_concept(concept_id).await?;

        let edge_keys: Vec<String> = self
            .store
            .scan_keys(EDGE_PREFIX)
            .await?
            .into_iter()
            .filter(|key| {
                parse_edge_key(key)
                    .map(|(from, to)| from == concept_id || to == concept_id)
                    .unwrap_or(false)
            })
            .collect();
        let removed = edge_keys.len();

        let mut ops: Vec<BatchOp> = edge_keys.into_iter().map(BatchOp::delete).collect();
        ops.push(BatchOp::delete(concept_key(concept_id)));
        self.store.batch(ops).await?;

        tracing::debug!(concept_id, edges_removed = removed, "concept deleted");
        Ok(removed)
    }

    // ---- edges ----

    pub async fn add_edge(
        &self,
        from: &str,
        to: &str,
        strength: EdgeStrength,
        reason: Option<String>,
    ) -> EngineResult<PrerequisiteEdge> {
        validate_id("concept", from)?;
        validate_id("concept", to)?;
        if from == to {
            return Err(EngineError::InvalidInput(format!(
                "concept {from} cannot be its own prerequisite"
            )));
        }
        self.require_concept(from).await?;
        self.require_concept(to).await?;

        let key = edge_key(from, to);
        let created_at = self
            .store
            .get_json::<PrerequisiteEdge>(&key)
            .await?
            .map(|e| e.created_at)
            .unwrap_or_else(Utc::now);

        let edge = PrerequisiteEdge {
            from: from.to_string(),
            to: to.to_string(),
            strength,
            reason,
            created_at,
        };
        self.store.put_json(&key, &edge).await?;
        Ok(edge)
    }

    pub async fn get_edge(&self, from: &str, to: &str) -> EngineResult<Option<PrerequisiteEdge>> {
        Ok(self.store.get_json(&edge_key(from, to)).await?)
    }

    pub async fn remove_edge(&self, from: &str, to: &str) -> EngineResult<()> {
        let key = edge_key(from, to);
        if self.store.get(&key).await?.is_none() {
            return Err(EngineError::NotFound(format!("edge {from} -> {to}")));
        }
        self.store.delete(&key).await?;
        Ok(())
    }

    pub async fn list_edges(&self) -> EngineResult<Vec<PrerequisiteEdge>> {
        Ok(self
            .store
            .scan_json(EDGE_PREFIX, ScanOptions::default())
            .await?)
    }

    /// Incoming edges: the direct prerequisites of `concept_id`.
    pub async fn prerequisites_of(&self, concept_id: &str) -> EngineResult<Vec<PrerequisiteEdge>> {
        let edges = self.list_edges().await?;
        Ok(edges.into_iter().filter(|e| e.to == concept_id).collect())
    }

    /// Outgoing edges: concepts that build directly on `concept_id`.
    pub async fn dependents_of(&self, concept_id: &str) -> EngineResult<Vec<PrerequisiteEdge>> {
        Ok(self
            .store
            .scan_json(&edges_from_prefix(concept_id), ScanOptions::default())
            .await?)
    }

    pub async fn prerequisite_chain(
        &self,
        concept_id: &str,
        depth: usize,
    ) -> EngineResult<Vec<Vec<String>>> {
        self.require_concept(concept_id).await?;
        let edges = self.list_edges().await?;
        let mut adjacency: HashMap<String, BTreeSet<String>> = HashMap::new();
        for edge in edges {
            adjacency.entry(edge.to).or_default().insert(edge.from);
        }
        Ok(bfs_levels(&adjacency, concept_id, depth))
    }

    pub async fn dependent_chain(
        &self,
        concept_id: &str,
        depth: usize,
    ) -> EngineResult<Vec<Vec<String>>> {
        self.require_concept(concept_id).await?;
        let edges = self.list_edges().await?;
        let mut adjacency: HashMap<String, BTreeSet<String>> = HashMap::new();
        for edge in edges {
            adjacency.entry(edge.from).or_default().insert(edge.to);
        }
        Ok(bfs_levels(&adjacency, concept_id, depth))
    }

    // ---- learner profiles ----

    pub async fn upsert_profile(
        &self,
        user_id: &str,
        input: ProfileInput,
    ) -> EngineResult<LearnerProfile> {
        validate_id("learner", user_id)?;
        validate_profile_input(&input)?;
        let key = learner_key(user_id);
        let existing: Option<LearnerProfile> = self.store.get_json(&key).await?;
        let profile = merge_profile(existing, user_id, input, Utc::now());
        self.store.put_json(&key, &profile).await?;
        Ok(profile)
    }

    pub async fn get_profile(&self, user_id: &str) -> EngineResult<Option<LearnerProfile>> {
        Ok(self.store.get_json(&learner_key(user_id)).await?)
    }

    pub async fn require_profile(&self, user_id: &str) -> EngineResult<LearnerProfile> {
        self.get_profile(user_id)
            .await?
            .ok_or_else(|| EngineError::learner_not_found(user_id))
    }

    /// Removes the profile and all of the learner's states in one batch.
    /// Returns the number of states removed.
    pub async fn delete_profile(&self, user_id: &str) -> EngineResult<usize> {
        self.require_profile(user_id).await?;
        let state_keys = self.store.scan_keys(&user_states_prefix(user_id)).await?;
        let removed = state_keys.len();

        let mut ops: Vec<BatchOp> = state_keys.into_iter().map(BatchOp::delete).collect();
        ops.push(BatchOp::delete(learner_key(user_id)));
        self.store.batch(ops).await?;

        tracing::debug!(user_id, states_removed = removed, "learner deleted");
        Ok(removed)
    }

    // ---- knowledge states ----

    pub async fn set_knowledge_state(
        &self,
        user_id: &str,
        concept_id: &str,
        update: KnowledgeStateUpdate,
    ) -> EngineResult<KnowledgeState> {
        self.set_knowledge_state_at(user_id, concept_id, update, Utc::now())
            .await
    }

    pub async fn set_knowledge_state_at(
        &self,
        user_id: &str,
        concept_id: &str,
        update: KnowledgeStateUpdate,
        now: DateTime<Utc>,
    ) -> EngineResult<KnowledgeState> {
        validate_id("learner", user_id)?;
        validate_state_update(&update)?;
        self.require_concept(concept_id).await?;

        let key = state_key(user_id, concept_id);
        let existing: Option<KnowledgeState> = self.store.get_json(&key).await?;
        let state = merge_knowledge_state(existing, user_id, concept_id, update, now);
        self.store.put_json(&key, &state).await?;
        Ok(state)
    }

    pub async fn get_knowledge_state(
        &self,
        user_id: &str,
        concept_id: &str,
    ) -> EngineResult<Option<KnowledgeState>> {
        Ok(self.store.get_json(&state_key(user_id, concept_id)).await?)
    }

    pub async fn require_knowledge_state(
        &self,
        user_id: &str,
        concept_id: &str,
    ) -> EngineResult<KnowledgeState> {
        self.get_knowledge_state(user_id, concept_id)
            .await?
            .ok_or_else(|| {
                EngineError::NotFound(format!("knowledge state {user_id}/{concept_id}"))
            })
    }

    pub async fn list_knowledge_states(&self, user_id: &str) -> EngineResult<Vec<KnowledgeState>> {
        Ok(self
            .store
            .scan_json(&user_states_prefix(user_id), ScanOptions::default())
            .await?)
    }

    pub async fn add_misconception(
        &self,
        user_id: &str,
        concept_id: &str,
        input: MisconceptionInput,
    ) -> EngineResult<KnowledgeState> {
        if input.description.trim().is_empty() {
            return Err(EngineError::InvalidInput(
                "misconception description must not be empty".into(),
            ));
        }
        let now = Utc::now();
        let mut misconceptions = self
            .get_knowledge_state(user_id, concept_id)
            .await?
            .map(|s| s.misconceptions)
            .unwrap_or_default();
        misconceptions.push(Misconception {
            id: Uuid::new_v4().to_string(),
            description: input.description,
            severity: input.severity,
            identified: now,
            resolved: false,
        });

        self.set_knowledge_state_at(
            user_id,
            concept_id,
            KnowledgeStateUpdate {
                misconceptions: Some(misconceptions),
                ..Default::default()
            },
            now,
        )
        .await
    }

    pub async fn resolve_misconception(
        &self,
        user_id: &str,
        concept_id: &str,
        misconception_id: &str,
    ) -> EngineResult<KnowledgeState> {
        let state = self.require_knowledge_state(user_id, concept_id).await?;
        let mut misconceptions = state.misconceptions;
        let entry = misconceptions
            .iter_mut()
            .find(|m| m.id == misconception_id)
            .ok_or_else(|| EngineError::NotFound(format!("misconception {misconception_id}")))?;
        entry.resolved = true;

        self.set_knowledge_state(
            user_id,
            concept_id,
            KnowledgeStateUpdate {
                misconceptions: Some(misconceptions),
                ..Default::default()
            },
        )
        .await
    }

    // ---- snapshots ----

    pub async fn load_snapshot(&self, user_id: &str) -> EngineResult<GraphSnapshot> {
        let (concepts, edges, states) = tokio::try_join!(
            self.list_concepts(),
            self.list_edges(),
            self.list_knowledge_states(user_id),
        )?;
        Ok(GraphSnapshot::new(concepts, edges, states))
    }
}

fn parse_edge_key(key: &str) -> Option<(&str, &str)> {
    key.strip_prefix(EDGE_PREFIX)?.split_once(':')
}
