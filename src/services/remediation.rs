use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::EngineResult;
use crate::graph::derivation::ProfileDerivation;
use crate::graph::snapshot::GraphSnapshot;
use crate::graph::types::ConceptNode;
use crate::graph::GraphStore;
use crate::services::gaps::{detect_gaps_in, GapOptions, GapReport, GapType};
use crate::services::psychometric::{adjust_for_profile, PsychometricAdjustment, ScaffoldingStrategy};
use crate::services::MASTERY_THRESHOLD;

pub const DEFAULT_MAX_STEPS: usize = 10;
const MAX_STEP_STRATEGIES: usize = 3;
const DEFAULT_INTRODUCTION_MINUTES: f64 = 20.0;

#[derive(Debug, Clone, Copy)]
pub struct RemediationOptions {
    pub max_steps: usize,
    pub focus_type: Option<GapType>,
}

impl Default for RemediationOptions {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            focus_type: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemediationStep {
    pub step: usize,
    pub concept_id: String,
    pub concept_name: String,
    pub gap_type: GapType,
    pub priority: f64,
    pub action: String,
    pub scaffolding: Vec<ScaffoldingStrategy>,
    /// Minutes, pace-adjusted.
    pub estimated_time: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemediationPlan {
    pub steps: Vec<RemediationStep>,
    pub estimated_total_time: f64,
    pub priority_focus: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemediationResult {
    pub plan: RemediationPlan,
    pub gaps: GapReport,
}

pub async fn generate_remediation_plan(
    graph: &GraphStore,
    derivation: &dyn ProfileDerivation,
    user_id: &str,
    options: RemediationOptions,
) -> EngineResult<RemediationResult> {
    generate_remediation_plan_at(graph, derivation, user_id, options, Utc::now()).await
}

pub async fn generate_remediation_plan_at(
    graph: &GraphStore,
    derivation: &dyn ProfileDerivation,
    user_id: &str,
    options: RemediationOptions,
    now: DateTime<Utc>,
) -> EngineResult<RemediationResult> {
    let profile = graph.require_profile(user_id).await?;
    let adjustment = adjust_for_profile(&profile, derivation);
    let snapshot = graph.load_snapshot(user_id).await?;

    let result = plan_remediation_in(&snapshot, user_id, &adjustment, options, now);
    tracing::debug!(
        user_id,
        steps = result.plan.steps.len(),
        total_minutes = result.plan.estimated_total_time,
        "remediation plan generated"
    );
    Ok(result)
}

pub fn plan_remediation_in(
    snapshot: &GraphSnapshot,
    user_id: &str,
    adjustment: &PsychometricAdjustment,
    options: RemediationOptions,
    now: DateTime<Utc>,
) -> RemediationResult {
    let gaps = detect_gaps_in(
        snapshot,
        user_id,
        GapOptions {
            gap_type: options.focus_type,
            include_recommendations: true,
        },
        now,
    );

    let pace = adjustment.pace_recommendation.time_multiplier();
    let scaffolding = adjustment.top_strategies(MAX_STEP_STRATEGIES);
    let mut steps = Vec::with_capacity(gaps.summary.total);

    let mut push = |concept_id: &str,
                    concept_name: &str,
                    gap_type: GapType,
                    priority: f64,
                    action: String,
                    minutes: f64| {
        steps.push(RemediationStep {
            step: 0,
            concept_id: concept_id.to_string(),
            concept_name: concept_name.to_string(),
            gap_type,
            priority,
            action,
            scaffolding: scaffolding.clone(),
            estimated_time: minutes * pace,
        });
    };

    for gap in &gaps.misconceptions {
        let minutes = snapshot
            .concepts
            .get(&gap.concept_id)
            .and_then(|c| c.time_estimates)
            .and_then(|t| t.introduction)
            .unwrap_or(DEFAULT_INTRODUCTION_MINUTES);
        push(
            &gap.concept_id,
            &gap.concept_name,
            GapType::Misconception,
            100.0 + f64::from(gap.max_severity.rank()) * 10.0,
            format!(
                "Address {} misconception(s) in {}",
                gap.misconceptions.len(),
                gap.concept_name
            ),
            minutes,
        );
    }

    for gap in &gaps.forgotten {
        let minutes = snapshot.concepts.get(&gap.concept_id).map_or(
            DEFAULT_INTRODUCTION_MINUTES,
            |c| match c.time_estimates.and_then(|t| t.basic_mastery) {
                Some(basic) => basic * 0.3,
                None => c.difficulty.absolute * 5.0,
            },
        );
        push(
            &gap.concept_id,
            &gap.concept_name,
            GapType::Forgotten,
            80.0 + (100.0 - gap.predicted_retention) / 10.0,
            format!(
                "Review {} (predicted retention {:.0}%)",
                gap.concept_name, gap.predicted_retention
            ),
            minutes,
        );
    }

    for gap in &gaps.partial {
        let minutes = snapshot
            .concepts
            .get(&gap.concept_id)
            .map_or(DEFAULT_INTRODUCTION_MINUTES, ConceptNode::base_mastery_minutes)
            * (1.0 - gap.mastery / 100.0);
        push(
            &gap.concept_id,
            &gap.concept_name,
            GapType::Partial,
            60.0 + (1.0 - gap.mastery / MASTERY_THRESHOLD) * 20.0,
            format!(
                "Strengthen {} from {:.0}% to mastery",
                gap.concept_name, gap.mastery
            ),
            minutes,
        );
    }

    for gap in &gaps.missing {
        let minutes = snapshot
            .concepts
            .get(&gap.concept_id)
            .map_or(gap.difficulty * 15.0, ConceptNode::base_mastery_minutes);
        push(
            &gap.concept_id,
            &gap.concept_name,
            GapType::Missing,
            40.0 - gap.difficulty,
            format!("Learn {}", gap.concept_name),
            minutes,
        );
    }

    steps.sort_by(|a, b| {
        b.priority
            .total_cmp(&a.priority)
            .then_with(|| a.concept_id.cmp(&b.concept_id))
    });
    steps.truncate(options.max_steps);
    for (index, step) in steps.iter_mut().enumerate() {
        step.step = index + 1;
    }

    let plan = RemediationPlan {
        estimated_total_time: steps.iter().map(|s| s.estimated_time).sum(),
        priority_focus: priority_focus(&gaps).to_string(),
        steps,
    };

    RemediationResult { plan, gaps }
}

fn priority_focus(gaps: &GapReport) -> &'static str {
    if !gaps.misconceptions.is_empty() {
        "Correct misconceptions before building on affected concepts"
    } else if !gaps.forgotten.is_empty() {
        "Review decaying knowledge to restore retention"
    } else if !gaps.partial.is_empty() {
        "Consolidate partially mastered concepts"
    } else if !gaps.missing.is_empty() {
        "Learn new concepts whose prerequisites are in place"
    } else {
        "No gaps detected"
    }
}
