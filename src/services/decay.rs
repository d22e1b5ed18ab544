use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::graph::types::{ConceptNode, KnowledgeState};

const BASE_STABILITY: f64 = 7.0;
const REVIEW_BONUS_WEIGHT: f64 = 2.0;
const MASTERY_BONUS_WEIGHT: f64 = 3.0;
const DIFFICULTY_PENALTY_WEIGHT: f64 = 2.0;
const MIN_STABILITY: f64 = 1.0;
const SECONDS_PER_DAY: f64 = 86_400.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecayPrediction {
    /// 0-100
    pub predicted_retention: f64,
    pub days_since_review: f64,
    pub stability_factor: f64,
    pub decay_rate: f64,
}

pub fn predict_decay(state: &KnowledgeState, concept: &ConceptNode) -> DecayPrediction {
    predict_decay_at(state, concept, Utc::now())
}

/// Exponential forgetting curve `mastery × e^(−t / stability)`.
pub fn predict_decay_at(
    state: &KnowledgeState,
    concept: &ConceptNode,
    now: DateTime<Utc>,
) -> DecayPrediction {
    let reference = state.last_reviewed.unwrap_or(state.updated_at);
    let days_since_review = elapsed_days(reference, now);

    let stability_factor = stability_factor(state, concept);
    let decay_rate = 1.0 / stability_factor;
    let predicted_retention =
        (state.mastery * (-days_since_review * decay_rate).exp()).clamp(0.0, 100.0);

    DecayPrediction {
        predicted_retention,
        days_since_review,
        stability_factor,
        decay_rate,
    }
}

pub fn stability_factor(state: &KnowledgeState, concept: &ConceptNode) -> f64 {
    let review_bonus = f64::from(state.review_count.max(1)).log2() * REVIEW_BONUS_WEIGHT;
    let mastery_bonus = (state.mastery / 100.0) * MASTERY_BONUS_WEIGHT;
    let difficulty_penalty = (concept.difficulty.absolute / 10.0) * DIFFICULTY_PENALTY_WEIGHT;
    (BASE_STABILITY + review_bonus + mastery_bonus - difficulty_penalty).max(MIN_STABILITY)
}

/// Fractional days, never negative.
pub fn elapsed_days(from: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let millis = (now - from).num_milliseconds();
    (millis as f64 / 1000.0 / SECONDS_PER_DAY).max(0.0)
}
