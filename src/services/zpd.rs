use serde::{Deserialize, Serialize};

use crate::error::EngineResult;
use crate::graph::derivation::ProfileDerivation;
use crate::graph::snapshot::GraphSnapshot;
use crate::graph::types::{ConceptNode, LearnerProfile};
use crate::graph::GraphStore;
use crate::services::learning_path::plan_learning_path;
use crate::services::psychometric::{
    adjust_for_profile, psychometric_match, Pace, PsychometricAdjustment, ScaffoldingStrategy,
};
use crate::services::MASTERY_THRESHOLD;

pub const DEFAULT_ZPD_LIMIT: usize = 10;
const MIN_PREREQUISITES_MET: f64 = 0.7;
const MIN_ZPD_READINESS: f64 = 0.5;
const MASTERY_PENALTY_WEIGHT: f64 = 0.3;
const OPTIMAL_DIFFICULTY: f64 = 5.0;
const ALIGNMENT_BONUS: f64 = 1.1;
const CHAIN_DEPTH: usize = 3;
const MAX_LISTED_MISSING: usize = 3;
const MAX_RECOMMENDED_STRATEGIES: usize = 3;
const TOO_EASY_ORDER: f64 = 1000.0;
const TOO_HARD_ORDER: f64 = 2000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    TooEasy,
    Zpd,
    TooHard,
}

#[derive(Debug, Clone, Copy)]
pub struct ZpdOptions {
    pub limit: usize,
}

impl Default for ZpdOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_ZPD_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZonedConcept {
    pub concept: ConceptNode,
    pub zone: Zone,
    pub mastery: f64,
    /// 0-1
    pub readiness: f64,
    /// 0-1
    pub prerequisites_met: f64,
    pub missing_prerequisites: Vec<String>,
    /// Lower is sooner.
    pub recommended_order: f64,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZpdRecommendation {
    pub concept_id: String,
    pub concept_name: String,
    pub readiness: f64,
    pub prerequisite_chain: Vec<String>,
    pub estimated_mastery_minutes: f64,
    pub psychometric_match: f64,
    pub scaffolding: Vec<ScaffoldingStrategy>,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZpdSummary {
    pub total: usize,
    pub too_easy: usize,
    pub zpd: usize,
    pub too_hard: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZpdResult {
    pub user_id: String,
    pub too_easy: Vec<ZonedConcept>,
    pub zpd: Vec<ZonedConcept>,
    pub too_hard: Vec<ZonedConcept>,
    pub recommendations: Vec<ZpdRecommendation>,
    pub learning_path: Vec<String>,
    pub adjustment: PsychometricAdjustment,
    pub summary: ZpdSummary,
}

pub async fn compute_zpd(
    graph: &GraphStore,
    derivation: &dyn ProfileDerivation,
    user_id: &str,
    options: ZpdOptions,
) -> EngineResult<ZpdResult> {
    let profile = graph.require_profile(user_id).await?;
    let adjustment = adjust_for_profile(&profile, derivation);
    let snapshot = graph.load_snapshot(user_id).await?;

    let result = compute_zpd_in(&snapshot, &profile, &adjustment, options);
    tracing::debug!(
        user_id,
        too_easy = result.summary.too_easy,
        zpd = result.summary.zpd,
        too_hard = result.summary.too_hard,
        "zpd computed"
    );
    Ok(result)
}

/// Share of prerequisites already mastered; 1 when there are none.
pub fn prerequisites_met(snapshot: &GraphSnapshot, concept_id: &str) -> f64 {
    let total = snapshot.prerequisite_count(concept_id);
    if total == 0 {
        return 1.0;
    }
    let met = snapshot
        .prerequisites_of(concept_id)
        .filter(|p| snapshot.is_mastered(p, MASTERY_THRESHOLD))
        .count();
    met as f64 / total as f64
}

pub fn readiness(
    prerequisites_met: f64,
    mastery: f64,
    concept: &ConceptNode,
    adjustment: &PsychometricAdjustment,
) -> f64 {
    let mut score = prerequisites_met - (mastery / 100.0) * MASTERY_PENALTY_WEIGHT;

    let adjusted_difficulty = adjustment.adjusted_difficulty(concept);
    let difficulty_factor = 1.0 - (adjusted_difficulty - OPTIMAL_DIFFICULTY).abs() / 10.0;
    score *= 0.5 + difficulty_factor * 0.5;

    let load = concept.difficulty.cognitive_load;
    let aligned = match adjustment.pace_recommendation {
        Pace::Faster => load < 0.5,
        Pace::Slower => load < 0.3,
        Pace::Normal => false,
    };
    if aligned {
        score *= ALIGNMENT_BONUS;
    }

    score.clamp(0.0, 1.0)
}

pub fn classify_concept(
    snapshot: &GraphSnapshot,
    concept: &ConceptNode,
    adjustment: &PsychometricAdjustment,
) -> ZonedConcept {
    let mastery = snapshot.mastery(&concept.id);
    let met = prerequisites_met(snapshot, &concept.id);
    let readiness = readiness(met, mastery, concept, adjustment);
    let missing: Vec<String> = snapshot
        .prerequisites_of(&concept.id)
        .filter(|p| !snapshot.is_mastered(p, MASTERY_THRESHOLD))
        .cloned()
        .collect();

    let (zone, reason, recommended_order) = if mastery >= MASTERY_THRESHOLD {
        (
            Zone::TooEasy,
            format!("Already mastered ({mastery:.0}% mastery)"),
            TOO_EASY_ORDER,
        )
    } else if met < MIN_PREREQUISITES_MET {
        let listed: Vec<&str> = missing
            .iter()
            .take(MAX_LISTED_MISSING)
            .map(String::as_str)
            .collect();
        (
            Zone::TooHard,
            format!("Missing prerequisites: {}", listed.join(", ")),
            TOO_HARD_ORDER,
        )
    } else if readiness >= MIN_ZPD_READINESS {
        (
            Zone::Zpd,
            format!(
                "Ready to learn: {:.0}% of prerequisites mastered, readiness {readiness:.2}",
                met * 100.0
            ),
            ((1.0 - readiness) * 100.0).round() + concept.difficulty.absolute,
        )
    } else {
        (
            Zone::TooHard,
            format!("Readiness too low ({readiness:.2}) for the current learner profile"),
            TOO_HARD_ORDER,
        )
    };

    ZonedConcept {
        concept: concept.clone(),
        zone,
        mastery,
        readiness,
        prerequisites_met: met,
        missing_prerequisites: missing,
        recommended_order,
        reason,
    }
}

pub fn compute_zpd_in(
    snapshot: &GraphSnapshot,
    profile: &LearnerProfile,
    adjustment: &PsychometricAdjustment,
    options: ZpdOptions,
) -> ZpdResult {
    let mut too_easy = Vec::new();
    let mut zpd = Vec::new();
    let mut too_hard = Vec::new();

    for concept in snapshot.concepts.values() {
        let zoned = classify_concept(snapshot, concept, adjustment);
        match zoned.zone {
            Zone::TooEasy => too_easy.push(zoned),
            Zone::Zpd => zpd.push(zoned),
            Zone::TooHard => too_hard.push(zoned),
        }
    }

    zpd.sort_by(|a, b| {
        b.readiness
            .total_cmp(&a.readiness)
            .then_with(|| a.concept.id.cmp(&b.concept.id))
    });
    for zone in [&mut too_easy, &mut too_hard] {
        zone.sort_by(|a, b| {
            a.recommended_order
                .total_cmp(&b.recommended_order)
                .then_with(|| a.concept.id.cmp(&b.concept.id))
        });
    }

    let recommendations = zpd
        .iter()
        .take(options.limit)
        .map(|zoned| recommend(snapshot, profile, adjustment, zoned))
        .collect();

    let learning_path = plan_learning_path(snapshot, adjustment, options.limit)
        .steps
        .into_iter()
        .map(|step| step.concept_id)
        .collect();

    let summary = ZpdSummary {
        total: too_easy.len() + zpd.len() + too_hard.len(),
        too_easy: too_easy.len(),
        zpd: zpd.len(),
        too_hard: too_hard.len(),
    };

    ZpdResult {
        user_id: profile.user_id.clone(),
        too_easy,
        zpd,
        too_hard,
        recommendations,
        learning_path,
        adjustment: adjustment.clone(),
        summary,
    }
}

fn recommend(
    snapshot: &GraphSnapshot,
    profile: &LearnerProfile,
    adjustment: &PsychometricAdjustment,
    zoned: &ZonedConcept,
) -> ZpdRecommendation {
    let concept = &zoned.concept;
    let fit = psychometric_match(concept, profile, adjustment);

    let mut reasons = Vec::new();
    if snapshot.prerequisite_count(&concept.id) == 0 {
        reasons.push("No prerequisites required".to_string());
    } else if zoned.prerequisites_met >= 1.0 {
        reasons.push("All prerequisites mastered".to_string());
    } else {
        reasons.push(format!(
            "{:.0}% of prerequisites mastered",
            zoned.prerequisites_met * 100.0
        ));
    }
    if zoned.readiness > 0.8 {
        reasons.push("High readiness for this concept".to_string());
    }
    if fit > 0.7 {
        reasons.push("Strong fit with your learning profile".to_string());
    }
    if concept.difficulty.absolute < OPTIMAL_DIFFICULTY && adjustment.difficulty_modifier < 0.0 {
        reasons.push("Gentle difficulty suited to your current learning needs".to_string());
    }

    ZpdRecommendation {
        concept_id: concept.id.clone(),
        concept_name: concept.name.clone(),
        readiness: zoned.readiness,
        prerequisite_chain: snapshot.prerequisite_chain_names(&concept.id, CHAIN_DEPTH),
        estimated_mastery_minutes: concept.base_mastery_minutes()
            * adjustment.pace_recommendation.time_multiplier(),
        psychometric_match: fit,
        scaffolding: adjustment.top_strategies(MAX_RECOMMENDED_STRATEGIES),
        reasons,
    }
}
