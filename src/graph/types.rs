use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Difficulty {
    /// 1-10
    pub absolute: f64,
    /// 0-1
    pub cognitive_load: f64,
    /// 0-1
    pub abstractness: f64,
}

impl Default for Difficulty {
    fn default() -> Self {
        Self {
            absolute: 5.0,
            cognitive_load: 0.5,
            abstractness: 0.5,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BloomObjectives {
    pub remember: Vec<String>,
    pub understand: Vec<String>,
    pub apply: Vec<String>,
    pub analyze: Vec<String>,
    pub evaluate: Vec<String>,
    pub create: Vec<String>,
}

/// Minutes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimeEstimates {
    pub introduction: Option<f64>,
    pub basic_mastery: Option<f64>,
    pub deep_mastery: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptNode {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub subdomain: Option<String>,
    #[serde(default)]
    pub description: String,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub bloom_objectives: Option<BloomObjectives>,
    #[serde(default)]
    pub time_estimates: Option<TimeEstimates>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConceptNode {
    /// Basic-mastery estimate in minutes, falling back to `difficulty × 15`.
    pub fn base_mastery_minutes(&self) -> f64 {
        self.time_estimates
            .and_then(|t| t.basic_mastery)
            .unwrap_or(self.difficulty.absolute * 15.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptInput {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub subdomain: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub bloom_objectives: Option<BloomObjectives>,
    #[serde(default)]
    pub time_estimates: Option<TimeEstimates>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeStrength {
    Required,
    Recommended,
    Helpful,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrerequisiteEdge {
    /// Prerequisite concept.
    pub from: String,
    /// Dependent concept.
    pub to: String,
    pub strength: EdgeStrength,
    #[serde(default)]
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PsychometricScore {
    /// 0-100
    pub score: f64,
    /// 0-1
    pub confidence: f64,
    pub last_updated: DateTime<Utc>,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreInput {
    pub score: f64,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

fn default_confidence() -> f64 {
    1.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StyleModality {
    Visual,
    Auditory,
    Kinesthetic,
    ReadingWriting,
    Multimodal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningStyle {
    pub primary: StyleModality,
    #[serde(default)]
    pub secondary: Option<StyleModality>,
    #[serde(default)]
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapacityLevel {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttentionSpan {
    Short,
    #[default]
    Medium,
    Long,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CognitiveProfile {
    pub working_memory_capacity: CapacityLevel,
    pub processing_speed: CapacityLevel,
    pub attention_span: AttentionSpan,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerProfile {
    pub user_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub psychometric_scores: BTreeMap<String, PsychometricScore>,
    #[serde(default)]
    pub learning_style: Option<LearningStyle>,
    #[serde(default)]
    pub cognitive_profile: Option<CognitiveProfile>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LearnerProfile {
    pub fn score(&self, domain: &str) -> Option<f64> {
        self.psychometric_scores.get(domain).map(|s| s.score)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub psychometric_scores: BTreeMap<String, ScoreInput>,
    pub learning_style: Option<LearningStyle>,
    pub cognitive_profile: Option<CognitiveProfile>,
    pub tags: Option<Vec<String>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Minor,
    Moderate,
    Major,
}

impl Severity {
    pub fn rank(self) -> u8 {
        match self {
            Self::Minor => 1,
            Self::Moderate => 2,
            Self::Major => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Misconception {
    pub id: String,
    pub description: String,
    pub severity: Severity,
    pub identified: DateTime<Utc>,
    #[serde(default)]
    pub resolved: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeState {
    pub user_id: String,
    pub concept_id: String,
    /// 0-100
    pub mastery: f64,
    /// 1-6
    pub bloom_level: u8,
    pub retention_strength: f64,
    pub review_count: u32,
    #[serde(default)]
    pub misconceptions: Vec<Misconception>,
    pub first_seen: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    #[serde(default)]
    pub last_reviewed: Option<DateTime<Utc>>,
    #[serde(default)]
    pub next_review: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl KnowledgeState {
    pub fn unresolved_misconceptions(&self) -> impl Iterator<Item = &Misconception> {
        self.misconceptions.iter().filter(|m| !m.resolved)
    }

    pub fn has_unresolved_misconception(&self) -> bool {
        self.unresolved_misconceptions().next().is_some()
    }
}

/// Partial update merged onto an existing state; `None` fields are preserved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KnowledgeStateUpdate {
    pub mastery: Option<f64>,
    pub bloom_level: Option<u8>,
    pub retention_strength: Option<f64>,
    pub review_count: Option<u32>,
    pub misconceptions: Option<Vec<Misconception>>,
    pub last_reviewed: Option<DateTime<Utc>>,
    pub next_review: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MisconceptionInput {
    pub description: String,
    pub severity: Severity,
}
