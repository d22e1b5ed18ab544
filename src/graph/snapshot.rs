use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::graph::traversal::bfs_levels;
use crate::graph::types::{ConceptNode, KnowledgeState, PrerequisiteEdge};

/// In-memory view of the concept graph plus one learner's states.
///
/// Built from independent store reads; a missing state means mastery 0.
#[derive(Debug, Clone, Default)]
pub struct GraphSnapshot {
    pub concepts: BTreeMap<String, ConceptNode>,
    /// concept id -> prerequisite ids
    pub prerequisites: HashMap<String, BTreeSet<String>>,
    /// concept id -> state
    pub states: HashMap<String, KnowledgeState>,
}

impl GraphSnapshot {
    pub fn new(
        concepts: Vec<ConceptNode>,
        edges: Vec<PrerequisiteEdge>,
        states: Vec<KnowledgeState>,
    ) -> Self {
        let concepts = concepts.into_iter().map(|c| (c.id.clone(), c)).collect();

        let mut prerequisites: HashMap<String, BTreeSet<String>> = HashMap::new();
        for edge in edges {
            prerequisites.entry(edge.to).or_default().insert(edge.from);
        }

        let states = states
            .into_iter()
            .map(|s| (s.concept_id.clone(), s))
            .collect();

        Self {
            concepts,
            prerequisites,
            states,
        }
    }

    pub fn state(&self, concept_id: &str) -> Option<&KnowledgeState> {
        self.states.get(concept_id)
    }

    pub fn mastery(&self, concept_id: &str) -> f64 {
        self.states.get(concept_id).map(|s| s.mastery).unwrap_or(0.0)
    }

    pub fn is_mastered(&self, concept_id: &str, threshold: f64) -> bool {
        self.mastery(concept_id) >= threshold
    }

    pub fn prerequisites_of<'a>(&'a self, concept_id: &str) -> impl Iterator<Item = &'a String> + 'a {
        self.prerequisites.get(concept_id).into_iter().flatten()
    }

    pub fn prerequisite_count(&self, concept_id: &str) -> usize {
        self.prerequisites.get(concept_id).map_or(0, BTreeSet::len)
    }

    pub fn concept_name(&self, concept_id: &str) -> Option<&str> {
        self.concepts.get(concept_id).map(|c| c.name.as_str())
    }

    /// Names of prerequisites up to `depth` levels back, nearest first.
    /// Ids without a concept record are reported as-is.
    pub fn prerequisite_chain_names(&self, concept_id: &str, depth: usize) -> Vec<String> {
        bfs_levels(&self.prerequisites, concept_id, depth)
            .into_iter()
            .flatten()
            .map(|id| self.concept_name(&id).map(str::to_string).unwrap_or(id))
            .collect()
    }
}
