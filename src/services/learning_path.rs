//! Greedy dependency-aware ordering of unmastered concepts.
//!
//! Each round places the best-scored queued concept whose prerequisites are all mastered
//! or already placed. When nothing qualifies, the first unplaced prerequisite of the
//! best-scored queued concept is forced in, which breaks cycles at the cost of one
//! out-of-order step. No global optimality is attempted.

use std::collections::HashSet;

use serde::Serialize;

use crate::error::EngineResult;
use crate::graph::derivation::ProfileDerivation;
use crate::graph::snapshot::GraphSnapshot;
use crate::graph::types::ConceptNode;
use crate::graph::GraphStore;
use crate::services::psychometric::{adjust_for_profile, PsychometricAdjustment, ScaffoldingStrategy};
use crate::services::MASTERY_THRESHOLD;

pub const DEFAULT_MAX_CONCEPTS: usize = 10;
const MAX_STEP_STRATEGIES: usize = 3;
const MAX_UNDERSTAND_MILESTONES: usize = 2;
const MAX_APPLY_MILESTONES: usize = 1;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningPathStep {
    pub order: usize,
    pub concept_id: String,
    pub concept: ConceptNode,
    /// Minutes.
    pub estimated_duration: f64,
    pub scaffolding: Vec<ScaffoldingStrategy>,
    pub milestones: Vec<String>,
    /// Placed by fallback injection ahead of its own unmet prerequisites.
    pub forced: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum PathCompletion {
    /// Every unmastered concept was placed.
    Complete,
    /// `max_concepts` reached with concepts still queued.
    LimitReached,
    /// Fallback pointed at a prerequisite that has no concept record.
    #[serde(rename_all = "camelCase")]
    MissingPrerequisite {
        concept_id: String,
        prerequisite_id: String,
    },
    /// No queued concept had an unplaced prerequisite to inject.
    Stalled,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedPath {
    pub steps: Vec<LearningPathStep>,
    pub completion: PathCompletion,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningPath {
    pub user_id: String,
    pub steps: Vec<LearningPathStep>,
    pub total_estimated_minutes: f64,
    pub completion: PathCompletion,
}

pub async fn generate_learning_path(
    graph: &GraphStore,
    derivation: &dyn ProfileDerivation,
    user_id: &str,
    max_concepts: usize,
) -> EngineResult<LearningPath> {
    let profile = graph.require_profile(user_id).await?;
    let adjustment = adjust_for_profile(&profile, derivation);
    let snapshot = graph.load_snapshot(user_id).await?;

    let planned = plan_learning_path(&snapshot, &adjustment, max_concepts);
    if let PathCompletion::MissingPrerequisite {
        concept_id,
        prerequisite_id,
    } = &planned.completion
    {
        tracing::warn!(
            user_id,
            concept_id = %concept_id,
            prerequisite_id = %prerequisite_id,
            placed = planned.steps.len(),
            "learning path stopped early: prerequisite has no concept record"
        );
    }
    tracing::debug!(user_id, steps = planned.steps.len(), "learning path generated");

    Ok(LearningPath {
        user_id: user_id.to_string(),
        total_estimated_minutes: planned.steps.iter().map(|s| s.estimated_duration).sum(),
        steps: planned.steps,
        completion: planned.completion,
    })
}

/// Lower is better: satisfied dependencies, little existing mastery, moderate difficulty.
pub fn priority_score(snapshot: &GraphSnapshot, concept: &ConceptNode) -> f64 {
    let unmastered_prerequisites = snapshot
        .prerequisites_of(&concept.id)
        .filter(|p| !snapshot.is_mastered(p, MASTERY_THRESHOLD))
        .count();
    let mastery = snapshot.mastery(&concept.id);
    unmastered_prerequisites as f64 * 100.0
        + (100.0 - mastery) * 0.5
        + (concept.difficulty.absolute - 5.0).abs() * 10.0
}

pub fn plan_learning_path(
    snapshot: &GraphSnapshot,
    adjustment: &PsychometricAdjustment,
    max_concepts: usize,
) -> PlannedPath {
    let mut queue: Vec<(f64, &ConceptNode)> = snapshot
        .concepts
        .values()
        .filter(|c| !snapshot.is_mastered(&c.id, MASTERY_THRESHOLD))
        .map(|c| (priority_score(snapshot, c), c))
        .collect();
    queue.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.id.cmp(&b.1.id)));

    let mut placed: HashSet<String> = HashSet::new();
    let mut steps: Vec<LearningPathStep> = Vec::new();

    let satisfied = |id: &str, placed: &HashSet<String>| {
        snapshot.is_mastered(id, MASTERY_THRESHOLD) || placed.contains(id)
    };

    let completion = loop {
        if queue.is_empty() {
            break PathCompletion::Complete;
        }
        if steps.len() >= max_concepts {
            break PathCompletion::LimitReached;
        }

        let ready = queue.iter().position(|(_, concept)| {
            snapshot
                .prerequisites_of(&concept.id)
                .all(|p| satisfied(p, &placed))
        });
        if let Some(index) = ready {
            let (_, concept) = queue.remove(index);
            placed.insert(concept.id.clone());
            steps.push(build_step(steps.len() + 1, concept, adjustment, false));
            continue;
        }

        let head = queue[0].1;
        let Some(prerequisite_id) = snapshot
            .prerequisites_of(&head.id)
            .find(|p| !satisfied(p, &placed))
            .cloned()
        else {
            break PathCompletion::Stalled;
        };

        // A dangling prerequisite ends planning; it is never skipped.
        let Some(prerequisite) = snapshot.concepts.get(&prerequisite_id) else {
            break PathCompletion::MissingPrerequisite {
                concept_id: head.id.clone(),
                prerequisite_id,
            };
        };

        queue.retain(|(_, c)| c.id != prerequisite_id);
        placed.insert(prerequisite_id);
        steps.push(build_step(steps.len() + 1, prerequisite, adjustment, true));
    };

    PlannedPath { steps, completion }
}

fn build_step(
    order: usize,
    concept: &ConceptNode,
    adjustment: &PsychometricAdjustment,
    forced: bool,
) -> LearningPathStep {
    LearningPathStep {
        order,
        concept_id: concept.id.clone(),
        concept: concept.clone(),
        estimated_duration: concept.base_mastery_minutes()
            * adjustment.pace_recommendation.time_multiplier(),
        scaffolding: adjustment.top_strategies(MAX_STEP_STRATEGIES),
        milestones: milestones(concept),
        forced,
    }
}

fn milestones(concept: &ConceptNode) -> Vec<String> {
    let Some(objectives) = &concept.bloom_objectives else {
        return Vec::new();
    };
    objectives
        .understand
        .iter()
        .take(MAX_UNDERSTAND_MILESTONES)
        .chain(objectives.apply.iter().take(MAX_APPLY_MILESTONES))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::graph::types::{BloomObjectives, EdgeStrength, PrerequisiteEdge, TimeEstimates};
    use crate::services::decay::tests::{concept, state};
    use crate::services::psychometric::Pace;

    fn named(id: &str, absolute: f64) -> ConceptNode {
        let mut c = concept(absolute);
        c.id = id.to_string();
        c.name = id.to_uppercase();
        c
    }

    fn edge(from: &str, to: &str) -> PrerequisiteEdge {
        PrerequisiteEdge {
            from: from.into(),
            to: to.into(),
            strength: EdgeStrength::Required,
            reason: None,
            created_at: Utc::now(),
        }
    }

    fn ids(path: &PlannedPath) -> Vec<&str> {
        path.steps.iter().map(|s| s.concept_id.as_str()).collect()
    }

    #[test]
    fn test_chain_is_placed_in_dependency_order() {
        // Difficulty would favour c first, but b and c wait on their prerequisites.
        let snapshot = GraphSnapshot::new(
            vec![named("a", 9.0), named("b", 7.0), named("c", 5.0)],
            vec![edge("a", "b"), edge("b", "c")],
            vec![],
        );
        let path = plan_learning_path(&snapshot, &PsychometricAdjustment::default(), 10);
        assert_eq!(ids(&path), vec!["a", "b", "c"]);
        assert!(path.steps.iter().all(|s| !s.forced));
        assert_eq!(path.completion, PathCompletion::Complete);
    }

    #[test]
    fn test_mastered_concepts_are_skipped_and_unblock_dependents() {
        let mut mastered = state(90.0, 3, None);
        mastered.concept_id = "a".into();
        let snapshot = GraphSnapshot::new(
            vec![named("a", 5.0), named("b", 5.0)],
            vec![edge("a", "b")],
            vec![mastered],
        );
        let path = plan_learning_path(&snapshot, &PsychometricAdjustment::default(), 10);
        assert_eq!(ids(&path), vec!["b"]);
    }

    #[test]
    fn test_cycle_uses_forced_injection() {
        let snapshot = GraphSnapshot::new(
            vec![named("a", 5.0), named("b", 5.0)],
            vec![edge("a", "b"), edge("b", "a")],
            vec![],
        );
        let path = plan_learning_path(&snapshot, &PsychometricAdjustment::default(), 10);
        // Head of the queue is a (tie broken by id); its prerequisite b is forced in first.
        assert_eq!(ids(&path), vec!["b", "a"]);
        assert!(path.steps[0].forced);
        assert!(!path.steps[1].forced);
        assert_eq!(path.completion, PathCompletion::Complete);
    }

    #[test]
    fn test_dangling_prerequisite_terminates_early() {
        let snapshot = GraphSnapshot::new(
            vec![named("a", 5.0), named("b", 6.0)],
            vec![edge("ghost", "b"), edge("a", "b")],
            vec![],
        );
        let path = plan_learning_path(&snapshot, &PsychometricAdjustment::default(), 10);
        assert_eq!(ids(&path), vec!["a"]);
        assert_eq!(
            path.completion,
            PathCompletion::MissingPrerequisite {
                concept_id: "b".into(),
                prerequisite_id: "ghost".into(),
            }
        );
    }

    #[test]
    fn test_limit_and_pace_scaled_duration() {
        let mut with_estimate = named("a", 5.0);
        with_estimate.time_estimates = Some(TimeEstimates {
            introduction: Some(10.0),
            basic_mastery: Some(40.0),
            deep_mastery: None,
        });
        with_estimate.bloom_objectives = Some(BloomObjectives {
            understand: vec!["u1".into(), "u2".into(), "u3".into()],
            apply: vec!["p1".into(), "p2".into()],
            ..Default::default()
        });
        let snapshot = GraphSnapshot::new(
            vec![with_estimate, named("b", 6.0), named("c", 6.0)],
            vec![],
            vec![],
        );
        let slower = PsychometricAdjustment {
            pace_recommendation: Pace::Slower,
            ..Default::default()
        };
        let path = plan_learning_path(&snapshot, &slower, 2);
        assert_eq!(path.steps.len(), 2);
        assert_eq!(path.completion, PathCompletion::LimitReached);

        let a = path.steps.iter().find(|s| s.concept_id == "a").unwrap();
        assert!((a.estimated_duration - 52.0).abs() < 1e-9);
        assert_eq!(a.milestones, vec!["u1", "u2", "p1"]);

        // b and c tie on score; b wins on id and falls back to difficulty × 15.
        let b = path.steps.iter().find(|s| s.concept_id == "b").unwrap();
        assert!((b.estimated_duration - 117.0).abs() < 1e-9);
    }

    #[test]
    fn test_priority_score_formula() {
        let mut s = state(30.0, 1, None);
        s.concept_id = "b".into();
        let snapshot = GraphSnapshot::new(
            vec![named("a", 5.0), named("b", 8.0)],
            vec![edge("a", "b")],
            vec![s],
        );
        let score = priority_score(&snapshot, &snapshot.concepts["b"]);
        assert!((score - (100.0 + 35.0 + 30.0)).abs() < 1e-9);
    }
}
