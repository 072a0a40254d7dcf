//! Subscription tier policy
//!
//! Encodes, once, the input/output size differences between subscription
//! tiers so every feature enforces identical degradation rules instead of
//! re-deriving limits ad hoc. Pure lookup tables, no I/O.

use serde::{Deserialize, Serialize};

/// Subscription tier controlling quality and quantity budgets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Paid tier: larger inputs, longer outputs, detailed analysis
    Premium,
    /// Free tier: truncated inputs, shorter outputs
    Basic,
}

impl Tier {
    /// Stable string form, used in cache fingerprints
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Premium => "premium",
            Tier::Basic => "basic",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The AI-backed features the platform exposes.
///
/// Feature code owns the prompt templates and result parsing; the broker
/// only needs the kind for budgeting, cache keying and fallback routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    ResumeAnalysis,
    JobMatch,
    CoverLetter,
    InterviewPrep,
    SalaryNegotiation,
    CareerPath,
}

impl FeatureKind {
    /// Stable string form, used in cache fingerprints and logging
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureKind::ResumeAnalysis => "resume_analysis",
            FeatureKind::JobMatch => "job_match",
            FeatureKind::CoverLetter => "cover_letter",
            FeatureKind::InterviewPrep => "interview_prep",
            FeatureKind::SalaryNegotiation => "salary_negotiation",
            FeatureKind::CareerPath => "career_path",
        }
    }

    /// All feature kinds, in registration order
    pub fn all() -> &'static [FeatureKind] {
        &[
            FeatureKind::ResumeAnalysis,
            FeatureKind::JobMatch,
            FeatureKind::CoverLetter,
            FeatureKind::InterviewPrep,
            FeatureKind::SalaryNegotiation,
            FeatureKind::CareerPath,
        ]
    }
}

impl std::fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Size budget for one request, derived from tier and feature.
///
/// Consumed by provider clients (output token clamp) and by feature code
/// when truncating prompt input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierBudget {
    /// Maximum characters of rendered prompt input
    pub max_input_chars: usize,
    /// Maximum completion tokens requested from the provider
    pub max_output_tokens: u32,
    /// Whether the feature may request the detailed analysis variant
    pub detailed_analysis: bool,
}

/// Pure tier-to-budget mapping
#[derive(Debug, Clone, Copy, Default)]
pub struct TierPolicy;

impl TierPolicy {
    /// Compute the budget for a tier/feature pair. Deterministic, no I/O.
    pub fn budget_for(tier: Tier, feature: FeatureKind) -> TierBudget {
        let base_output = match feature {
            FeatureKind::ResumeAnalysis => 1000,
            FeatureKind::JobMatch => 800,
            FeatureKind::CoverLetter => 1200,
            FeatureKind::InterviewPrep => 1200,
            FeatureKind::SalaryNegotiation => 800,
            FeatureKind::CareerPath => 1200,
        };

        match tier {
            Tier::Premium => TierBudget {
                max_input_chars: 24_000,
                max_output_tokens: base_output + base_output / 2,
                detailed_analysis: true,
            },
            Tier::Basic => TierBudget {
                max_input_chars: 8_000,
                max_output_tokens: base_output,
                detailed_analysis: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn premium_budgets_dominate_basic() {
        for feature in FeatureKind::all() {
            let premium = TierPolicy::budget_for(Tier::Premium, *feature);
            let basic = TierPolicy::budget_for(Tier::Basic, *feature);
            assert!(premium.max_input_chars > basic.max_input_chars);
            assert!(premium.max_output_tokens > basic.max_output_tokens);
            assert!(premium.detailed_analysis);
            assert!(!basic.detailed_analysis);
        }
    }

    #[test]
    fn budgets_are_deterministic() {
        let a = TierPolicy::budget_for(Tier::Basic, FeatureKind::JobMatch);
        let b = TierPolicy::budget_for(Tier::Basic, FeatureKind::JobMatch);
        assert_eq!(a, b);
    }

    #[test]
    fn feature_names_are_stable() {
        assert_eq!(FeatureKind::ResumeAnalysis.as_str(), "resume_analysis");
        assert_eq!(FeatureKind::all().len(), 6);
    }
}
