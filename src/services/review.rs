use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineResult;
use crate::graph::types::{ConceptNode, KnowledgeState, KnowledgeStateUpdate};
use crate::graph::GraphStore;
use crate::services::decay::{predict_decay_at, DecayPrediction};
use crate::services::PARTIAL_THRESHOLD;

const SLIPPING_RETENTION: f64 = 50.0;
const SLIPPING_MULTIPLIER: f64 = 0.5;
const URGENT_RETENTION: f64 = 40.0;
const NORMAL_RETENTION: f64 = 60.0;
const WINDOW_RATIO: f64 = 0.2;
const DEFAULT_QUEUE_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewPerformance {
    Failed,
    Difficult,
    Good,
    Easy,
}

impl ReviewPerformance {
    pub fn interval_multiplier(self) -> f64 {
        match self {
            Self::Failed => 0.25,
            Self::Difficult => 0.5,
            Self::Good => 1.0,
            Self::Easy => 1.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewPriority {
    Urgent,
    Normal,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSchedule {
    pub next_review_date: DateTime<Utc>,
    pub interval_days: i64,
    pub optimal_window_start: DateTime<Utc>,
    pub optimal_window_end: DateTime<Utc>,
    pub priority: ReviewPriority,
}

/// Interval before performance and retention adjustments.
pub fn base_interval_days(review_count: u32, mastery: f64) -> f64 {
    match review_count {
        0 => 1.0,
        1 => 3.0,
        2 => 7.0,
        n => 2f64.powf(f64::from(n) - 1.0) * (1.5 + mastery / 100.0),
    }
}

pub fn schedule_next_review(
    state: &KnowledgeState,
    concept: &ConceptNode,
    performance: Option<ReviewPerformance>,
) -> ReviewSchedule {
    schedule_next_review_at(state, concept, performance, Utc::now())
}

pub fn schedule_next_review_at(
    state: &KnowledgeState,
    concept: &ConceptNode,
    performance: Option<ReviewPerformance>,
    now: DateTime<Utc>,
) -> ReviewSchedule {
    let decay = predict_decay_at(state, concept, now);
    schedule_from_prediction(state, &decay, performance, now)
}

pub fn schedule_from_prediction(
    state: &KnowledgeState,
    decay: &DecayPrediction,
    performance: Option<ReviewPerformance>,
    now: DateTime<Utc>,
) -> ReviewSchedule {
    let mut multiplier = performance.map_or(1.0, ReviewPerformance::interval_multiplier);
    if decay.predicted_retention < SLIPPING_RETENTION {
        multiplier *= SLIPPING_MULTIPLIER;
    }

    let raw = base_interval_days(state.review_count, state.mastery) * multiplier;
    let interval_days = raw.round().max(1.0).min(36_500.0) as i64;
    let window_days = ((interval_days as f64 * WINDOW_RATIO).round() as i64).max(1);

    let next_review_date = now + Duration::days(interval_days);

    let priority = if decay.predicted_retention < URGENT_RETENTION
        || state.has_unresolved_misconception()
    {
        ReviewPriority::Urgent
    } else if decay.predicted_retention < NORMAL_RETENTION {
        ReviewPriority::Normal
    } else {
        ReviewPriority::Low
    };

    ReviewSchedule {
        next_review_date,
        interval_days,
        optimal_window_start: next_review_date - Duration::days(window_days),
        optimal_window_end: next_review_date + Duration::days(window_days),
        priority,
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewQueueItem {
    pub concept_id: String,
    pub concept_name: String,
    pub mastery: f64,
    pub decay: DecayPrediction,
    pub schedule: ReviewSchedule,
}

/// Previously reviewed concepts, most decayed first.
pub async fn review_queue(
    graph: &GraphStore,
    user_id: &str,
    limit: Option<usize>,
) -> EngineResult<Vec<ReviewQueueItem>> {
    review_queue_at(graph, user_id, limit, Utc::now()).await
}

pub async fn review_queue_at(
    graph: &GraphStore,
    user_id: &str,
    limit: Option<usize>,
    now: DateTime<Utc>,
) -> EngineResult<Vec<ReviewQueueItem>> {
    graph.require_profile(user_id).await?;
    let snapshot = graph.load_snapshot(user_id).await?;

    let mut items: Vec<ReviewQueueItem> = snapshot
        .states
        .values()
        .filter(|state| state.mastery >= PARTIAL_THRESHOLD && state.last_reviewed.is_some())
        .filter_map(|state| {
            let concept = snapshot.concepts.get(&state.concept_id)?;
            let decay = predict_decay_at(state, concept, now);
            let schedule = schedule_from_prediction(state, &decay, None, now);
            Some(ReviewQueueItem {
                concept_id: concept.id.clone(),
                concept_name: concept.name.clone(),
                mastery: state.mastery,
                decay,
                schedule,
            })
        })
        .collect();

    items.sort_by(|a, b| {
        a.decay
            .predicted_retention
            .total_cmp(&b.decay.predicted_retention)
            .then_with(|| a.concept_id.cmp(&b.concept_id))
    });
    items.truncate(limit.unwrap_or(DEFAULT_QUEUE_LIMIT));

    tracing::debug!(user_id, queued = items.len(), "review queue built");
    Ok(items)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOutcome {
    pub state: KnowledgeState,
    pub decay_before_review: DecayPrediction,
    pub schedule: ReviewSchedule,
}

/// Schedules from the pre-review state, then records the review.
pub async fn record_review(
    graph: &GraphStore,
    user_id: &str,
    concept_id: &str,
    performance: ReviewPerformance,
) -> EngineResult<ReviewOutcome> {
    record_review_at(graph, user_id, concept_id, performance, Utc::now()).await
}

pub async fn record_review_at(
    graph: &GraphStore,
    user_id: &str,
    concept_id: &str,
    performance: ReviewPerformance,
    now: DateTime<Utc>,
) -> EngineResult<ReviewOutcome> {
    let concept = graph.require_concept(concept_id).await?;
    let state = graph.require_knowledge_state(user_id, concept_id).await?;

    let decay = predict_decay_at(&state, &concept, now);
    let schedule = schedule_from_prediction(&state, &decay, Some(performance), now);

    let updated = graph
        .set_knowledge_state_at(
            user_id,
            concept_id,
            KnowledgeStateUpdate {
                review_count: Some(state.review_count.saturating_add(1)),
                last_reviewed: Some(now),
                next_review: Some(schedule.next_review_date),
                retention_strength: Some((decay.predicted_retention / 100.0).clamp(0.0, 1.0)),
                ..Default::default()
            },
            now,
        )
        .await?;

    tracing::debug!(
        user_id,
        concept_id,
        interval_days = schedule.interval_days,
        priority = ?schedule.priority,
        "review recorded"
    );

    Ok(ReviewOutcome {
        state: updated,
        decay_before_review: decay,
        schedule,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::types::{Misconception, Severity};
    use crate::services::decay::tests::{concept, state};

    #[test]
    fn test_base_intervals() {
        assert_eq!(base_interval_days(0, 90.0), 1.0);
        assert_eq!(base_interval_days(1, 90.0), 3.0);
        assert_eq!(base_interval_days(2, 90.0), 7.0);
        assert!((base_interval_days(3, 50.0) - 8.0).abs() < 1e-9);
        assert!((base_interval_days(4, 100.0) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_huge_review_count_caps_interval() {
        assert!(base_interval_days(u32::MAX, 50.0).is_infinite());
        let now = Utc::now();
        let s = state(90.0, u32::MAX, Some(now));
        let schedule = schedule_next_review_at(&s, &concept(5.0), Some(ReviewPerformance::Good), now);
        assert_eq!(schedule.interval_days, 36_500);
        assert_eq!(schedule.next_review_date, now + Duration::days(36_500));
    }

    #[test]
    fn test_fresh_review_schedule() {
        let now = Utc::now();
        let s = state(90.0, 3, Some(now));
        let schedule = schedule_next_review_at(&s, &concept(5.0), Some(ReviewPerformance::Easy), now);
        // 4 × 2.4 × 1.5 = 14.4
        assert_eq!(schedule.interval_days, 14);
        assert_eq!(schedule.next_review_date, now + Duration::days(14));
        assert_eq!(schedule.optimal_window_start, now + Duration::days(11));
        assert_eq!(schedule.optimal_window_end, now + Duration::days(17));
        assert_eq!(schedule.priority, ReviewPriority::Low);
    }

    #[test]
    fn test_slipping_retention_halves_interval() {
        let now = Utc::now();
        let s = state(45.0, 2, Some(now));
        let schedule = schedule_next_review_at(&s, &concept(5.0), None, now);
        // retention 45 < 50: 7 × 0.5 = 3.5 -> 4
        assert_eq!(schedule.interval_days, 4);
        assert_eq!(schedule.priority, ReviewPriority::Normal);
    }

    #[test]
    fn test_interval_floor_and_urgency() {
        let now = Utc::now();
        let s = state(30.0, 0, Some(now));
        let schedule =
            schedule_next_review_at(&s, &concept(5.0), Some(ReviewPerformance::Failed), now);
        assert_eq!(schedule.interval_days, 1);
        assert_eq!(schedule.priority, ReviewPriority::Urgent);
        assert_eq!(schedule.optimal_window_start, now);
    }

    #[test]
    fn test_unresolved_misconception_is_urgent() {
        let now = Utc::now();
        let mut s = state(95.0, 4, Some(now));
        s.misconceptions.push(Misconception {
            id: "m1".into(),
            description: "confuses numerator and denominator".into(),
            severity: Severity::Minor,
            identified: now,
            resolved: false,
        });
        let schedule = schedule_next_review_at(&s, &concept(5.0), None, now);
        assert_eq!(schedule.priority, ReviewPriority::Urgent);
    }

    #[test]
    fn test_schedule_is_deterministic() {
        let now = Utc::now();
        let s = state(72.0, 6, Some(now - Duration::days(3)));
        let c = concept(7.0);
        let a = schedule_next_review_at(&s, &c, Some(ReviewPerformance::Good), now);
        let b = schedule_next_review_at(&s, &c, Some(ReviewPerformance::Good), now);
        assert_eq!(a, b);
    }
}
