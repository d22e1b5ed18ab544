//! Field-by-field merge and validation for every persisted entity.
//!
//! Sticky fields, never overwritten after the first write:
//! - `ConceptNode::created_at`
//! - `LearnerProfile::created_at`
//! - `KnowledgeState::first_seen`
//!
//! Always overwritten: every `updated_at`, plus `KnowledgeState::last_accessed`.
//! Every other field takes the incoming value when supplied and keeps the stored one otherwise.

use chrono::{DateTime, Utc};

use crate::error::{EngineError, EngineResult};
use crate::graph::types::{
    ConceptInput, ConceptNode, KnowledgeState, KnowledgeStateUpdate, LearnerProfile,
    ProfileInput, PsychometricScore,
};
use crate::store::keys::is_valid_id;

const DEFAULT_SCORE_SOURCE: &str = "assessment";

pub fn validate_id(kind: &str, id: &str) -> EngineResult<()> {
    if is_valid_id(id) {
        Ok(())
    } else {
        Err(EngineError::InvalidInput(format!(
            "{kind} id must be non-empty and must not contain ':' (got {id:?})"
        )))
    }
}

fn ensure_range(field: &str, value: f64, min: f64, max: f64) -> EngineResult<()> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(EngineError::InvalidInput(format!(
            "{field} must be within [{min}, {max}] (got {value})"
        )))
    }
}

pub fn validate_concept_input(input: &ConceptInput) -> EngineResult<()> {
    validate_id("concept", &input.id)?;
    if input.name.trim().is_empty() {
        return Err(EngineError::InvalidInput("concept name must not be empty".into()));
    }
    ensure_range("difficulty.absolute", input.difficulty.absolute, 1.0, 10.0)?;
    ensure_range("difficulty.cognitiveLoad", input.difficulty.cognitive_load, 0.0, 1.0)?;
    ensure_range("difficulty.abstractness", input.difficulty.abstractness, 0.0, 1.0)?;
    if let Some(estimates) = &input.time_estimates {
        for (field, value) in [
            ("timeEstimates.introduction", estimates.introduction),
            ("timeEstimates.basicMastery", estimates.basic_mastery),
            ("timeEstimates.deepMastery", estimates.deep_mastery),
        ] {
            if let Some(minutes) = value {
                ensure_range(field, minutes, 0.0, f64::MAX)?;
            }
        }
    }
    Ok(())
}

pub fn validate_profile_input(input: &ProfileInput) -> EngineResult<()> {
    for (domain, score) in &input.psychometric_scores {
        if domain.trim().is_empty() {
            return Err(EngineError::InvalidInput("score domain must not be empty".into()));
        }
        ensure_range(&format!("psychometricScores.{domain}.score"), score.score, 0.0, 100.0)?;
        ensure_range(
            &format!("psychometricScores.{domain}.confidence"),
            score.confidence,
            0.0,
            1.0,
        )?;
    }
    Ok(())
}

pub fn validate_state_update(update: &KnowledgeStateUpdate) -> EngineResult<()> {
    if let Some(mastery) = update.mastery {
        ensure_range("mastery", mastery, 0.0, 100.0)?;
    }
    if let Some(level) = update.bloom_level {
        if !(1..=6).contains(&level) {
            return Err(EngineError::InvalidInput(format!(
                "bloomLevel must be within [1, 6] (got {level})"
            )));
        }
    }
    if let Some(strength) = update.retention_strength {
        ensure_range("retentionStrength", strength, 0.0, 1.0)?;
    }
    Ok(())
}

pub fn merge_concept(
    existing: Option<ConceptNode>,
    input: ConceptInput,
    now: DateTime<Utc>,
) -> ConceptNode {
    let created_at = existing.map(|c| c.created_at).unwrap_or(now);
    ConceptNode {
        id: input.id,
        name: input.name,
        domain: input.domain,
        subdomain: input.subdomain,
        description: input.description,
        difficulty: input.difficulty,
        bloom_objectives: input.bloom_objectives,
        time_estimates: input.time_estimates,
        tags: input.tags,
        created_at,
        updated_at: now,
    }
}

pub fn merge_profile(
    existing: Option<LearnerProfile>,
    user_id: &str,
    input: ProfileInput,
    now: DateTime<Utc>,
) -> LearnerProfile {
    let mut profile = existing.unwrap_or_else(|| LearnerProfile {
        user_id: user_id.to_string(),
        name: String::new(),
        email: None,
        psychometric_scores: Default::default(),
        learning_style: None,
        cognitive_profile: None,
        tags: Vec::new(),
        notes: None,
        created_at: now,
        updated_at: now,
    });

    if let Some(name) = input.name {
        profile.name = name;
    }
    if let Some(email) = input.email {
        profile.email = Some(email);
    }
    for (domain, score) in input.psychometric_scores {
        profile.psychometric_scores.insert(
            domain,
            PsychometricScore {
                score: score.score,
                confidence: score.confidence,
                last_updated: score.last_updated.unwrap_or(now),
                source: score
                    .source
                    .unwrap_or_else(|| DEFAULT_SCORE_SOURCE.to_string()),
            },
        );
    }
    if let Some(style) = input.learning_style {
        profile.learning_style = Some(style);
    }
    if let Some(cognitive) = input.cognitive_profile {
        profile.cognitive_profile = Some(cognitive);
    }
    if let Some(tags) = input.tags {
        profile.tags = tags;
    }
    if let Some(notes) = input.notes {
        profile.notes = Some(notes);
    }
    profile.updated_at = now;
    profile
}

pub fn merge_knowledge_state(
    existing: Option<KnowledgeState>,
    user_id: &str,
    concept_id: &str,
    update: KnowledgeStateUpdate,
    now: DateTime<Utc>,
) -> KnowledgeState {
    let mut state = existing.unwrap_or_else(|| KnowledgeState {
        user_id: user_id.to_string(),
        concept_id: concept_id.to_string(),
        mastery: 0.0,
        bloom_level: 1,
        retention_strength: 1.0,
        review_count: 0,
        misconceptions: Vec::new(),
        first_seen: now,
        last_accessed: now,
        last_reviewed: None,
        next_review: None,
        updated_at: now,
    });

    if let Some(mastery) = update.mastery {
        state.mastery = mastery;
    }
    if let Some(level) = update.bloom_level {
        state.bloom_level = level;
    }
    if let Some(strength) = update.retention_strength {
        state.retention_strength = strength;
    }
    // Review counts only move forward.
    if let Some(count) = update.review_count {
        state.review_count = state.review_count.max(count);
    }
    if let Some(misconceptions) = update.misconceptions {
        state.misconceptions = misconceptions;
    }
    if let Some(reviewed) = update.last_reviewed {
        state.last_reviewed = Some(reviewed);
    }
    if let Some(next) = update.next_review {
        state.next_review = Some(next);
    }
    state.last_accessed = now;
    state.updated_at = now;
    state
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Duration;

    use super::*;
    use crate::graph::types::{Difficulty, ScoreInput};

    fn input(id: &str) -> ConceptInput {
        ConceptInput {
            id: id.to_string(),
            name: "Fractions".to_string(),
            domain: "math".to_string(),
            subdomain: None,
            description: String::new(),
            difficulty: Difficulty::default(),
            bloom_objectives: None,
            time_estimates: None,
            tags: Vec::new(),
        }
    }

    #[test]
    fn test_concept_validation_rejects_out_of_range_difficulty() {
        let mut bad = input("fractions");
        bad.difficulty.absolute = 11.0;
        assert!(matches!(
            validate_concept_input(&bad),
            Err(EngineError::InvalidInput(_))
        ));
        bad.difficulty.absolute = 0.5;
        assert!(validate_concept_input(&bad).is_err());
        assert!(validate_concept_input(&input("fractions")).is_ok());
        assert!(validate_concept_input(&input("bad:id")).is_err());
    }

    #[test]
    fn test_concept_merge_keeps_created_at() {
        let t0 = Utc::now();
        let t1 = t0 + Duration::hours(1);
        let first = merge_concept(None, input("fractions"), t0);
        let mut renamed = input("fractions");
        renamed.name = "Fractions II".to_string();
        let second = merge_concept(Some(first), renamed, t1);
        assert_eq!(second.created_at, t0);
        assert_eq!(second.updated_at, t1);
        assert_eq!(second.name, "Fractions II");
    }

    #[test]
    fn test_state_merge_preserves_unsupplied_fields() {
        let t0 = Utc::now();
        let t1 = t0 + Duration::minutes(5);
        let first = merge_knowledge_state(
            None,
            "u1",
            "c1",
            KnowledgeStateUpdate {
                mastery: Some(55.0),
                bloom_level: Some(3),
                ..Default::default()
            },
            t0,
        );
        let second = merge_knowledge_state(
            Some(first),
            "u1",
            "c1",
            KnowledgeStateUpdate {
                review_count: Some(2),
                ..Default::default()
            },
            t1,
        );

        assert_eq!(second.mastery, 55.0);
        assert_eq!(second.bloom_level, 3);
        assert_eq!(second.review_count, 2);
        assert_eq!(second.first_seen, t0);
        assert_eq!(second.last_accessed, t1);
        assert_eq!(second.updated_at, t1);
    }

    #[test]
    fn test_state_merge_never_lowers_review_count() {
        let t0 = Utc::now();
        let reviewed = merge_knowledge_state(
            None,
            "u1",
            "c1",
            KnowledgeStateUpdate {
                review_count: Some(5),
                ..Default::default()
            },
            t0,
        );
        let lowered = merge_knowledge_state(
            Some(reviewed),
            "u1",
            "c1",
            KnowledgeStateUpdate {
                review_count: Some(1),
                mastery: Some(40.0),
                ..Default::default()
            },
            t0 + Duration::minutes(1),
        );

        assert_eq!(lowered.review_count, 5);
        assert_eq!(lowered.mastery, 40.0);
    }

    #[test]
    fn test_profile_scores_merge_by_domain() {
        let t0 = Utc::now();
        let mut scores = BTreeMap::new();
        scores.insert(
            "openness".to_string(),
            ScoreInput {
                score: 80.0,
                confidence: 0.9,
                source: None,
                last_updated: None,
            },
        );
        let first = merge_profile(
            None,
            "u1",
            ProfileInput {
                name: Some("Ada".into()),
                psychometric_scores: scores,
                ..Default::default()
            },
            t0,
        );

        let mut more = BTreeMap::new();
        more.insert(
            "neuroticism".to_string(),
            ScoreInput {
                score: 20.0,
                confidence: 0.5,
                source: Some("survey".into()),
                last_updated: None,
            },
        );
        let second = merge_profile(
            Some(first),
            "u1",
            ProfileInput {
                psychometric_scores: more,
                ..Default::default()
            },
            t0 + Duration::seconds(1),
        );

        assert_eq!(second.name, "Ada");
        assert_eq!(second.score("openness"), Some(80.0));
        assert_eq!(second.score("neuroticism"), Some(20.0));
        assert_eq!(second.psychometric_scores["openness"].source, "assessment");
        assert_eq!(second.created_at, t0);
    }

    #[test]
    fn test_state_validation() {
        let bad = KnowledgeStateUpdate {
            bloom_level: Some(7),
            ..Default::default()
        };
        assert!(validate_state_update(&bad).is_err());
        let bad = KnowledgeStateUpdate {
            mastery: Some(-1.0),
            ..Default::default()
        };
        assert!(validate_state_update(&bad).is_err());
    }

    #[test]
    fn test_profile_validation_rejects_confidence_above_one() {
        let mut scores = BTreeMap::new();
        scores.insert(
            "openness".to_string(),
            ScoreInput {
                score: 50.0,
                confidence: 1.5,
                source: None,
                last_updated: None,
            },
        );
        let input = ProfileInput {
            psychometric_scores: scores,
            ..Default::default()
        };
        assert!(validate_profile_input(&input).is_err());
    }
}
