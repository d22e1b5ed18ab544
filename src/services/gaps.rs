use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::graph::snapshot::GraphSnapshot;
use crate::graph::types::{Misconception, Severity};
use crate::graph::GraphStore;
use crate::services::decay::predict_decay_at;
use crate::services::{CRITICAL_RETENTION, FORGOTTEN_THRESHOLD, MASTERY_THRESHOLD, PARTIAL_THRESHOLD};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GapType {
    Missing,
    Partial,
    Forgotten,
    Misconception,
}

impl GapType {
    pub fn parse(value: &str) -> EngineResult<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "missing" => Ok(Self::Missing),
            "partial" => Ok(Self::Partial),
            "forgotten" => Ok(Self::Forgotten),
            "misconception" | "misconceptions" => Ok(Self::Misconception),
            other => Err(EngineError::InvalidInput(format!(
                "unknown gap type {other:?}; expected missing, partial, forgotten or misconception"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GapOptions {
    pub gap_type: Option<GapType>,
    /// Echoed back to the caller; not used by detection.
    pub include_recommendations: bool,
}

impl GapOptions {
    fn wants(&self, gap_type: GapType) -> bool {
        self.gap_type.map_or(true, |t| t == gap_type)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingGap {
    pub concept_id: String,
    pub concept_name: String,
    pub difficulty: f64,
    pub prerequisites: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialGap {
    pub concept_id: String,
    pub concept_name: String,
    pub mastery: f64,
    pub bloom_level: u8,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgottenGap {
    pub concept_id: String,
    pub concept_name: String,
    pub mastery: f64,
    pub predicted_retention: f64,
    pub days_since_review: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MisconceptionGap {
    pub concept_id: String,
    pub concept_name: String,
    /// Unresolved only.
    pub misconceptions: Vec<Misconception>,
    pub max_severity: Severity,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GapSummary {
    pub total: usize,
    pub missing: usize,
    pub partial: usize,
    pub forgotten: usize,
    pub misconceptions: usize,
    pub critical: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GapReport {
    pub user_id: String,
    pub missing: Vec<MissingGap>,
    pub partial: Vec<PartialGap>,
    pub forgotten: Vec<ForgottenGap>,
    pub misconceptions: Vec<MisconceptionGap>,
    pub summary: GapSummary,
    pub include_recommendations: bool,
}

pub async fn detect_gaps(
    graph: &GraphStore,
    user_id: &str,
    options: GapOptions,
) -> EngineResult<GapReport> {
    detect_gaps_at(graph, user_id, options, Utc::now()).await
}

pub async fn detect_gaps_at(
    graph: &GraphStore,
    user_id: &str,
    options: GapOptions,
    now: DateTime<Utc>,
) -> EngineResult<GapReport> {
    graph.require_profile(user_id).await?;
    let snapshot = graph.load_snapshot(user_id).await?;
    let report = detect_gaps_in(&snapshot, user_id, options, now);

    tracing::debug!(
        user_id,
        missing = report.summary.missing,
        partial = report.summary.partial,
        forgotten = report.summary.forgotten,
        misconceptions = report.summary.misconceptions,
        critical = report.summary.critical,
        "gap detection complete"
    );
    Ok(report)
}

/// A concept may land in several categories at once.
pub fn detect_gaps_in(
    snapshot: &GraphSnapshot,
    user_id: &str,
    options: GapOptions,
    now: DateTime<Utc>,
) -> GapReport {
    let mut missing = Vec::new();
    let mut partial = Vec::new();
    let mut forgotten = Vec::new();
    let mut misconceptions = Vec::new();

    for (concept_id, concept) in &snapshot.concepts {
        let Some(state) = snapshot.state(concept_id) else {
            // Unexplored concepts only count once there is a mastered foundation to build on.
            if options.wants(GapType::Missing) && snapshot.prerequisite_count(concept_id) > 0 {
                let all_met = snapshot
                    .prerequisites_of(concept_id)
                    .all(|p| snapshot.is_mastered(p, MASTERY_THRESHOLD));
                if all_met {
                    missing.push(MissingGap {
                        concept_id: concept_id.clone(),
                        concept_name: concept.name.clone(),
                        difficulty: concept.difficulty.absolute,
                        prerequisites: snapshot.prerequisites_of(concept_id).cloned().collect(),
                    });
                }
            }
            continue;
        };

        if options.wants(GapType::Partial)
            && state.mastery >= PARTIAL_THRESHOLD
            && state.mastery < MASTERY_THRESHOLD
        {
            partial.push(PartialGap {
                concept_id: concept_id.clone(),
                concept_name: concept.name.clone(),
                mastery: state.mastery,
                bloom_level: state.bloom_level,
            });
        }

        if options.wants(GapType::Forgotten)
            && state.mastery >= PARTIAL_THRESHOLD
            && state.last_reviewed.is_some()
        {
            let decay = predict_decay_at(state, concept, now);
            if decay.predicted_retention < FORGOTTEN_THRESHOLD {
                forgotten.push(ForgottenGap {
                    concept_id: concept_id.clone(),
                    concept_name: concept.name.clone(),
                    mastery: state.mastery,
                    predicted_retention: decay.predicted_retention,
                    days_since_review: decay.days_since_review,
                });
            }
        }

        if options.wants(GapType::Misconception) {
            let unresolved: Vec<Misconception> =
                state.unresolved_misconceptions().cloned().collect();
            if let Some(max_severity) = unresolved.iter().map(|m| m.severity).max() {
                misconceptions.push(MisconceptionGap {
                    concept_id: concept_id.clone(),
                    concept_name: concept.name.clone(),
                    misconceptions: unresolved,
                    max_severity,
                });
            }
        }
    }

    let critical = forgotten
        .iter()
        .filter(|f| f.predicted_retention < CRITICAL_RETENTION)
        .count()
        + misconceptions
            .iter()
            .filter(|m| m.max_severity == Severity::Major)
            .count();

    let summary = GapSummary {
        total: missing.len() + partial.len() + forgotten.len() + misconceptions.len(),
        missing: missing.len(),
        partial: partial.len(),
        forgotten: forgotten.len(),
        misconceptions: misconceptions.len(),
        critical,
    };

    GapReport {
        user_id: user_id.to_string(),
        missing,
        partial,
        forgotten,
        misconceptions,
        summary,
        include_recommendations: options.include_recommendations,
    }
}
