use serde::{Deserialize, Serialize};

use crate::graph::derivation::{effective_traits, ProfileDerivation};
use crate::graph::types::{
    AttentionSpan, CapacityLevel, CognitiveProfile, ConceptNode, LearnerProfile, LearningStyle,
    StyleModality,
};

const MAX_DIFFICULTY_MODIFIER: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pace {
    Slower,
    #[default]
    Normal,
    Faster,
}

impl Pace {
    pub fn time_multiplier(self) -> f64 {
        match self {
            Self::Slower => 1.3,
            Self::Normal => 1.0,
            Self::Faster => 0.8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresentationStyle {
    Visual,
    Verbal,
    HandsOn,
    Mixed,
}

impl From<StyleModality> for PresentationStyle {
    fn from(modality: StyleModality) -> Self {
        match modality {
            StyleModality::Visual => Self::Visual,
            StyleModality::Auditory => Self::Verbal,
            StyleModality::Kinesthetic => Self::HandsOn,
            StyleModality::ReadingWriting | StyleModality::Multimodal => Self::Mixed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaffoldingKind {
    WorkedExample,
    VisualAids,
    GuidedPractice,
    Hints,
    Chunking,
    PeerDiscussion,
    Analogy,
    Repetition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaffoldingStrategy {
    #[serde(rename = "type")]
    pub kind: ScaffoldingKind,
    pub description: String,
    pub priority: u8,
}

impl ScaffoldingStrategy {
    fn new(kind: ScaffoldingKind, priority: u8, description: &str) -> Self {
        Self {
            kind,
            description: description.to_string(),
            priority,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PsychometricAdjustment {
    /// [-0.5, 0.5]
    pub difficulty_modifier: f64,
    pub pace_recommendation: Pace,
    pub attention_considerations: Vec<String>,
    /// Sorted by priority, highest first.
    pub scaffolding_strategies: Vec<ScaffoldingStrategy>,
    pub presentation_style: PresentationStyle,
    #[serde(skip)]
    pub cognitive: CognitiveProfile,
}

impl PsychometricAdjustment {
    pub fn top_strategies(&self, n: usize) -> Vec<ScaffoldingStrategy> {
        self.scaffolding_strategies.iter().take(n).cloned().collect()
    }

    /// Concept difficulty as this learner experiences it.
    pub fn adjusted_difficulty(&self, concept: &ConceptNode) -> f64 {
        concept.difficulty.absolute + self.difficulty_modifier * 10.0
    }
}

impl Default for PsychometricAdjustment {
    fn default() -> Self {
        Self {
            difficulty_modifier: 0.0,
            pace_recommendation: Pace::Normal,
            attention_considerations: Vec::new(),
            scaffolding_strategies: vec![worked_example()],
            presentation_style: PresentationStyle::Mixed,
            cognitive: CognitiveProfile::default(),
        }
    }
}

fn worked_example() -> ScaffoldingStrategy {
    ScaffoldingStrategy::new(
        ScaffoldingKind::WorkedExample,
        8,
        "Walk through a fully solved example before independent practice",
    )
}

pub fn adjust_for_profile(
    profile: &LearnerProfile,
    derivation: &dyn ProfileDerivation,
) -> PsychometricAdjustment {
    let (style, cognitive) = effective_traits(profile, derivation);
    adjust_for_psychometrics(profile, &style, &cognitive)
}

pub fn adjust_for_psychometrics(
    profile: &LearnerProfile,
    style: &LearningStyle,
    cognitive: &CognitiveProfile,
) -> PsychometricAdjustment {
    let openness = profile.score("openness");
    let conscientiousness = profile.score("conscientiousness");
    let neuroticism = profile.score("neuroticism");
    let extraversion = profile.score("extraversion");

    let mut modifier: f64 = 0.0;
    let mut pace = Pace::Normal;
    let mut notes = Vec::new();

    match openness {
        Some(score) if score > 70.0 => modifier += 0.2,
        Some(score) if score < 30.0 => modifier -= 0.1,
        _ => {}
    }

    match conscientiousness {
        Some(score) if score > 70.0 => pace = Pace::Faster,
        Some(score) if score < 30.0 => {
            pace = Pace::Slower;
            notes.push("Benefits from structured checkpoints and shorter sessions".to_string());
        }
        _ => {}
    }

    if neuroticism.is_some_and(|score| score > 70.0) {
        modifier -= 0.2;
        notes.push("Provide encouragement and low-stakes practice to reduce anxiety".to_string());
    }

    match extraversion {
        Some(score) if score > 70.0 => {
            notes.push("Prefers interactive and collaborative activities".to_string())
        }
        Some(score) if score < 30.0 => notes.push("Prefers independent, self-paced study".to_string()),
        _ => {}
    }

    let adjustment = PsychometricAdjustment {
        difficulty_modifier: modifier.clamp(-MAX_DIFFICULTY_MODIFIER, MAX_DIFFICULTY_MODIFIER),
        pace_recommendation: pace,
        attention_considerations: notes,
        scaffolding_strategies: select_scaffolding(profile, style, cognitive),
        presentation_style: PresentationStyle::from(style.primary),
        cognitive: cognitive.clone(),
    };

    tracing::trace!(
        user_id = %profile.user_id,
        difficulty_modifier = adjustment.difficulty_modifier,
        pace = ?adjustment.pace_recommendation,
        "psychometric adjustment computed"
    );
    adjustment
}

pub fn select_scaffolding(
    profile: &LearnerProfile,
    style: &LearningStyle,
    cognitive: &CognitiveProfile,
) -> Vec<ScaffoldingStrategy> {
    let mut strategies = vec![worked_example()];

    if style.primary == StyleModality::Visual {
        strategies.push(ScaffoldingStrategy::new(
            ScaffoldingKind::VisualAids,
            9,
            "Use diagrams, concept maps and visual summaries",
        ));
    }
    if profile.score("neuroticism").is_some_and(|s| s > 60.0) {
        strategies.push(ScaffoldingStrategy::new(
            ScaffoldingKind::GuidedPractice,
            8,
            "Practice with step-by-step guidance to build confidence",
        ));
        strategies.push(ScaffoldingStrategy::new(
            ScaffoldingKind::Hints,
            7,
            "Offer progressive hints before revealing answers",
        ));
    }
    if cognitive.working_memory_capacity == CapacityLevel::Low {
        strategies.push(ScaffoldingStrategy::new(
            ScaffoldingKind::Chunking,
            9,
            "Break material into small, sequential chunks",
        ));
    }
    if profile.score("extraversion").is_some_and(|s| s > 70.0) {
        strategies.push(ScaffoldingStrategy::new(
            ScaffoldingKind::PeerDiscussion,
            6,
            "Discuss the concept with peers or explain it aloud",
        ));
    }
    if profile.score("openness").is_some_and(|s| s < 40.0) {
        strategies.push(ScaffoldingStrategy::new(
            ScaffoldingKind::Analogy,
            7,
            "Relate the concept to familiar, concrete situations",
        ));
    }
    if cognitive.attention_span == AttentionSpan::Short {
        strategies.push(ScaffoldingStrategy::new(
            ScaffoldingKind::Repetition,
            7,
            "Revisit key points in short, spaced sessions",
        ));
    }
    if style.primary == StyleModality::Kinesthetic {
        strategies.push(ScaffoldingStrategy::new(
            ScaffoldingKind::GuidedPractice,
            9,
            "Learn by doing with hands-on exercises",
        ));
    }

    strategies.sort_by(|a, b| b.priority.cmp(&a.priority));
    strategies
}

/// How well a concept suits this learner, in [0, 1].
pub fn psychometric_match(
    concept: &ConceptNode,
    profile: &LearnerProfile,
    adjustment: &PsychometricAdjustment,
) -> f64 {
    let mut score = 0.5;

    if concept.difficulty.abstractness > 0.7 {
        match profile.score("openness") {
            Some(openness) if openness > 60.0 => score += 0.2,
            Some(openness) if openness < 40.0 => score -= 0.2,
            _ => {}
        }
    }

    if concept.difficulty.cognitive_load > 0.7 {
        match adjustment.cognitive.working_memory_capacity {
            CapacityLevel::High => score += 0.15,
            CapacityLevel::Low => score -= 0.15,
            CapacityLevel::Medium => {}
        }
    }

    let adjusted = adjustment.adjusted_difficulty(concept);
    if (4.0..=7.0).contains(&adjusted) {
        score += 0.1;
    }

    f64::clamp(score, 0.0, 1.0)
}
