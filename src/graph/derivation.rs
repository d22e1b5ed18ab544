//! Boundary for deriving learning style and cognitive profile from raw trait scores.
//!
//! The engine only consumes the results. Stored profile values win; the derivation
//! fills in whatever the profile lacks.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::graph::types::{
    AttentionSpan, CapacityLevel, CognitiveProfile, LearnerProfile, LearningStyle,
    PsychometricScore, StyleModality,
};

pub trait ProfileDerivation: Send + Sync {
    fn derive_learning_style(&self, scores: &BTreeMap<String, PsychometricScore>) -> LearningStyle;

    fn estimate_cognitive_profile(
        &self,
        scores: &BTreeMap<String, PsychometricScore>,
    ) -> CognitiveProfile;
}

pub type SharedDerivation = Arc<dyn ProfileDerivation>;

/// Threshold rules over a handful of named score domains.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicDerivation;

const MODALITY_DOMAINS: [(&str, StyleModality); 4] = [
    ("visual", StyleModality::Visual),
    ("auditory", StyleModality::Auditory),
    ("kinesthetic", StyleModality::Kinesthetic),
    ("readingWriting", StyleModality::ReadingWriting),
];

impl ProfileDerivation for HeuristicDerivation {
    fn derive_learning_style(&self, scores: &BTreeMap<String, PsychometricScore>) -> LearningStyle {
        let mut ranked: Vec<(StyleModality, f64)> = MODALITY_DOMAINS
            .iter()
            .filter_map(|(domain, modality)| scores.get(*domain).map(|s| (*modality, s.score)))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        match ranked.as_slice() {
            [] => LearningStyle {
                primary: StyleModality::Multimodal,
                secondary: None,
                confidence: 0.0,
            },
            [(primary, score)] => LearningStyle {
                primary: *primary,
                secondary: None,
                confidence: (score / 100.0).clamp(0.0, 1.0),
            },
            [(primary, top), (secondary, next), ..] => {
                // A near tie means no single modality dominates.
                let margin = top - next;
                if margin < 5.0 {
                    LearningStyle {
                        primary: StyleModality::Multimodal,
                        secondary: Some(*primary),
                        confidence: 0.3,
                    }
                } else {
                    LearningStyle {
                        primary: *primary,
                        secondary: Some(*secondary),
                        confidence: (margin / 50.0).clamp(0.0, 1.0),
                    }
                }
            }
        }
    }

    fn estimate_cognitive_profile(
        &self,
        scores: &BTreeMap<String, PsychometricScore>,
    ) -> CognitiveProfile {
        let level = |domain: &str| match scores.get(domain).map(|s| s.score) {
            Some(score) if score > 60.0 => CapacityLevel::High,
            Some(score) if score < 40.0 => CapacityLevel::Low,
            _ => CapacityLevel::Medium,
        };

        // Conscientiousness is the closest proxy when attention was not measured directly.
        let attention_score = scores
            .get("attentionSpan")
            .or_else(|| scores.get("conscientiousness"))
            .map(|s| s.score);
        let attention_span = match attention_score {
            Some(score) if score > 65.0 => AttentionSpan::Long,
            Some(score) if score < 35.0 => AttentionSpan::Short,
            _ => AttentionSpan::Medium,
        };

        CognitiveProfile {
            working_memory_capacity: level("workingMemory"),
            processing_speed: level("processingSpeed"),
            attention_span,
        }
    }
}

/// Learning style and cognitive profile as the engine sees them for this learner.
pub fn effective_traits(
    profile: &LearnerProfile,
    derivation: &dyn ProfileDerivation,
) -> (LearningStyle, CognitiveProfile) {
    let style = profile
        .learning_style
        .clone()
        .unwrap_or_else(|| derivation.derive_learning_style(&profile.psychometric_scores));
    let cognitive = profile
        .cognitive_profile
        .clone()
        .unwrap_or_else(|| derivation.estimate_cognitive_profile(&profile.psychometric_scores));
    (style, cognitive)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn scores(pairs: &[(&str, f64)]) -> BTreeMap<String, PsychometricScore> {
        pairs
            .iter()
            .map(|(domain, score)| {
                (
                    domain.to_string(),
                    PsychometricScore {
                        score: *score,
                        confidence: 1.0,
                        last_updated: Utc::now(),
                        source: "test".into(),
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_dominant_modality_wins() {
        let style = HeuristicDerivation
            .derive_learning_style(&scores(&[("visual", 85.0), ("auditory", 40.0)]));
        assert_eq!(style.primary, StyleModality::Visual);
        assert_eq!(style.secondary, Some(StyleModality::Auditory));
    }

    #[test]
    fn test_near_tie_is_multimodal() {
        let style = HeuristicDerivation
            .derive_learning_style(&scores(&[("visual", 70.0), ("kinesthetic", 68.0)]));
        assert_eq!(style.primary, StyleModality::Multimodal);
    }

    #[test]
    fn test_cognitive_levels() {
        let profile = HeuristicDerivation
            .estimate_cognitive_profile(&scores(&[("workingMemory", 30.0), ("conscientiousness", 20.0)]));
        assert_eq!(profile.working_memory_capacity, CapacityLevel::Low);
        assert_eq!(profile.processing_speed, CapacityLevel::Medium);
        assert_eq!(profile.attention_span, AttentionSpan::Short);
    }
}
