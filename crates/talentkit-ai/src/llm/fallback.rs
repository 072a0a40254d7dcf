//! Offline fallback synthesis
//!
//! When every provider attempt fails, features still need a usable result:
//! the platform degrades to deterministic placeholder payloads instead of
//! surfacing a hard error to the caller. Each feature registers exactly one
//! generator paired with the JSON schema its payload satisfies. Generators
//! are pure and synchronous.

use crate::error::{AiError, AiResult};
use crate::llm::broker::RequestBroker;
use crate::llm::messages::{CompletionRequest, CompletionResult, ResponseSource};
use crate::tier::FeatureKind;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::warn;

/// Provider name stamped on synthesized results
pub const OFFLINE_PROVIDER: &str = "offline";
/// Model name stamped on synthesized results
pub const FALLBACK_MODEL: &str = "fallback";

type GeneratorFn = fn(&str) -> Value;

struct FallbackGenerator {
    schema_doc: Value,
    generate: GeneratorFn,
}

/// Registry of per-feature offline generators
pub struct FallbackRegistry {
    generators: HashMap<FeatureKind, FallbackGenerator>,
}

impl FallbackRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            generators: HashMap::new(),
        }
    }

    /// Registry with the builtin generator for every feature
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(
            FeatureKind::ResumeAnalysis,
            resume_analysis_schema(),
            generate_resume_analysis,
        );
        registry.register(FeatureKind::JobMatch, job_match_schema(), generate_job_match);
        registry.register(
            FeatureKind::CoverLetter,
            cover_letter_schema(),
            generate_cover_letter,
        );
        registry.register(
            FeatureKind::InterviewPrep,
            interview_prep_schema(),
            generate_interview_prep,
        );
        registry.register(
            FeatureKind::SalaryNegotiation,
            salary_negotiation_schema(),
            generate_salary_negotiation,
        );
        registry.register(
            FeatureKind::CareerPath,
            career_path_schema(),
            generate_career_path,
        );
        registry
    }

    /// Register (or replace) the generator for a feature
    pub fn register(&mut self, feature: FeatureKind, schema: Value, generate: GeneratorFn) {
        self.generators.insert(
            feature,
            FallbackGenerator {
                schema_doc: schema,
                generate,
            },
        );
    }

    /// Whether a generator exists for the feature
    pub fn supports(&self, feature: FeatureKind) -> bool {
        self.generators.contains_key(&feature)
    }

    /// The schema a feature's fallback payload satisfies, if registered
    pub fn schema_for(&self, feature: FeatureKind) -> Option<&Value> {
        self.generators.get(&feature).map(|g| &g.schema_doc)
    }

    /// Synthesize an offline result for a feature.
    ///
    /// `context` is a free-form hint (job title, candidate name) woven into
    /// text fields where it helps; generators must stay valid for any input
    /// including the empty string.
    pub fn synthesize(&self, feature: FeatureKind, context: &str) -> AiResult<CompletionResult> {
        let generator = self.generators.get(&feature).ok_or_else(|| {
            AiError::config(format!("no fallback generator for {}", feature.as_str()))
        })?;

        let payload = (generator.generate)(context);
        let content = serde_json::to_string(&payload)?;

        Ok(CompletionResult {
            provider: OFFLINE_PROVIDER.to_string(),
            model: FALLBACK_MODEL.to_string(),
            content,
            source: ResponseSource::Fallback,
        })
    }
}

impl Default for FallbackRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Run a request through the broker, degrading to the registered fallback
/// when providers are exhausted or unavailable.
///
/// Errors the broker recovers from internally never reach this function;
/// errors that are not exhaustion (config, timeout) propagate unchanged.
pub async fn complete_or_fallback(
    broker: &RequestBroker,
    registry: &FallbackRegistry,
    request: CompletionRequest,
) -> AiResult<CompletionResult> {
    let feature = request.feature;
    let context = request
        .messages
        .iter()
        .rev()
        .find(|m| m.role == crate::llm::messages::MessageRole::User)
        .map(|m| m.content.clone())
        .unwrap_or_default();

    match broker.complete(request).await {
        Ok(result) => Ok(result),
        Err(err) if err.is_fallback_eligible() && registry.supports(feature) => {
            warn!(
                feature = feature.as_str(),
                error = %err,
                "all providers failed, serving offline fallback"
            );
            registry.synthesize(feature, &context)
        }
        Err(err) => Err(err),
    }
}

fn resume_analysis_schema() -> Value {
    json!({
        "type": "object",
        "required": ["atsScore", "recommendations", "keywordOptimization", "formatting", "content"],
        "properties": {
            "atsScore": {"type": "integer", "minimum": 0, "maximum": 100},
            "recommendations": {"type": "array", "items": {"type": "string"}},
            "keywordOptimization": {
                "type": "object",
                "required": ["missingKeywords", "overusedKeywords", "suggestions"],
                "properties": {
                    "missingKeywords": {"type": "array", "items": {"type": "string"}},
                    "overusedKeywords": {"type": "array", "items": {"type": "string"}},
                    "suggestions": {"type": "array", "items": {"type": "string"}}
                }
            },
            "formatting": {
                "type": "object",
                "required": ["score", "issues", "improvements"],
                "properties": {
                    "score": {"type": "integer", "minimum": 0, "maximum": 100},
                    "issues": {"type": "array", "items": {"type": "string"}},
                    "improvements": {"type": "array", "items": {"type": "string"}}
                }
            },
            "content": {
                "type": "object",
                "required": ["strengthsFound", "suggestions"],
                "properties": {
                    "strengthsFound": {"type": "array", "items": {"type": "string"}},
                    "suggestions": {"type": "array", "items": {"type": "string"}}
                }
            }
        }
    })
}

fn generate_resume_analysis(_context: &str) -> Value {
    json!({
        "atsScore": 65,
        "recommendations": [
            "Add specific metrics and numbers to quantify your achievements",
            "Include more relevant technical skills for your target industry",
            "Use stronger action verbs to describe your accomplishments",
            "Ensure all contact information is clearly visible"
        ],
        "keywordOptimization": {
            "missingKeywords": ["technical skills", "industry-specific tools"],
            "overusedKeywords": [],
            "suggestions": [
                "Add role-specific technical terms",
                "Include metrics and percentages",
                "Use action-oriented language"
            ]
        },
        "formatting": {
            "score": 70,
            "issues": [],
            "improvements": [
                "Use consistent bullet point formatting",
                "Keep section headings clearly separated"
            ]
        },
        "content": {
            "strengthsFound": [],
            "suggestions": [
                "Automated analysis was unavailable; these are general guidelines",
                "Tailor each section to the role you are applying for"
            ]
        }
    })
}

fn job_match_schema() -> Value {
    json!({
        "type": "object",
        "required": ["matchScore", "matchingSkills", "missingSkills", "skillGaps", "seniorityLevel"],
        "properties": {
            "matchScore": {"type": "integer", "minimum": 0, "maximum": 100},
            "matchingSkills": {"type": "array", "items": {"type": "string"}},
            "missingSkills": {"type": "array", "items": {"type": "string"}},
            "skillGaps": {
                "type": "object",
                "required": ["critical", "important", "nice_to_have"],
                "properties": {
                    "critical": {"type": "array", "items": {"type": "string"}},
                    "important": {"type": "array", "items": {"type": "string"}},
                    "nice_to_have": {"type": "array", "items": {"type": "string"}}
                }
            },
            "seniorityLevel": {"type": "string"},
            "workMode": {"type": "string"},
            "jobType": {"type": "string"},
            "roleComplexity": {"type": "string"},
            "careerProgression": {"type": "string"}
        }
    })
}

fn generate_job_match(_context: &str) -> Value {
    json!({
        "matchScore": 45,
        "matchingSkills": [],
        "missingSkills": ["Automated analysis unavailable - please check requirements manually"],
        "skillGaps": {
            "critical": [],
            "important": ["Verify technical requirements match your skills"],
            "nice_to_have": []
        },
        "seniorityLevel": "Mid-level",
        "workMode": "Please check job posting for details",
        "jobType": "Please review full job description",
        "roleComplexity": "Standard",
        "careerProgression": "Good opportunity to grow"
    })
}

fn cover_letter_schema() -> Value {
    json!({
        "type": "object",
        "required": ["coverLetter"],
        "properties": {
            "coverLetter": {"type": "string", "minLength": 1}
        }
    })
}

fn generate_cover_letter(context: &str) -> Value {
    let subject = if context.trim().is_empty() {
        "the position".to_string()
    } else {
        let hint: String = context.trim().chars().take(80).collect();
        format!("the {hint} position")
    };
    json!({
        "coverLetter": format!(
            "Dear Hiring Manager,\n\nI am writing to express my strong interest in {subject}. \
             My background and experience align well with the requirements, and I would \
             welcome the opportunity to discuss how I can contribute to your team.\n\n\
             Thank you for your consideration.\n\nSincerely"
        )
    })
}

fn interview_prep_schema() -> Value {
    json!({
        "type": "object",
        "required": ["questions", "interviewPrepTips"],
        "properties": {
            "questions": {"type": "array", "items": {"type": "string"}, "minItems": 1},
            "interviewPrepTips": {"type": "string"}
        }
    })
}

fn generate_interview_prep(_context: &str) -> Value {
    json!({
        "questions": [
            "Tell me about yourself and your background",
            "Why are you interested in this role?",
            "Describe a challenging project and how you handled it",
            "Where do you see yourself in five years?"
        ],
        "interviewPrepTips": "Research the company, practice common interview questions, and prepare specific examples of your work"
    })
}

fn salary_negotiation_schema() -> Value {
    json!({
        "type": "object",
        "required": ["salaryEstimate", "negotiationTips"],
        "properties": {
            "salaryEstimate": {"type": "string"},
            "negotiationTips": {"type": "array", "items": {"type": "string"}, "minItems": 1}
        }
    })
}

fn generate_salary_negotiation(_context: &str) -> Value {
    json!({
        "salaryEstimate": "Competitive salary based on experience level",
        "negotiationTips": [
            "Research market rates for the role and region before naming a number",
            "Anchor on total compensation, not base salary alone",
            "Let the employer make the first offer where possible"
        ]
    })
}

fn career_path_schema() -> Value {
    json!({
        "type": "object",
        "required": ["currentStage", "nextSteps", "timeline"],
        "properties": {
            "currentStage": {"type": "string"},
            "nextSteps": {"type": "array", "items": {"type": "string"}, "minItems": 1},
            "timeline": {"type": "string"}
        }
    })
}

fn generate_career_path(_context: &str) -> Value {
    json!({
        "currentStage": "Established professional",
        "nextSteps": [
            "Identify the two or three skills most valued in your target role",
            "Seek projects that demonstrate those skills in your current position",
            "Build a portfolio of measurable outcomes"
        ],
        "timeline": "12-24 months depending on opportunity and focus"
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::schema::ResponseSchema;

    #[test]
    fn every_builtin_payload_validates_against_its_schema() {
        let registry = FallbackRegistry::builtin();
        for &feature in FeatureKind::all() {
            let schema_doc = registry
                .schema_for(feature)
                .unwrap_or_else(|| panic!("missing generator for {}", feature.as_str()));
            let schema = ResponseSchema::compile(schema_doc).unwrap();

            let result = registry.synthesize(feature, "senior rust engineer").unwrap();
            assert_eq!(result.provider, OFFLINE_PROVIDER);
            assert_eq!(result.model, FALLBACK_MODEL);
            assert_eq!(result.source, ResponseSource::Fallback);
            schema
                .check(&result.content)
                .unwrap_or_else(|e| panic!("{} fallback invalid: {e}", feature.as_str()));
        }
    }

    #[test]
    fn synthesis_is_deterministic() {
        let registry = FallbackRegistry::builtin();
        let a = registry
            .synthesize(FeatureKind::ResumeAnalysis, "ctx")
            .unwrap();
        let b = registry
            .synthesize(FeatureKind::ResumeAnalysis, "ctx")
            .unwrap();
        assert_eq!(a.content, b.content);
    }

    #[test]
    fn empty_context_is_valid_input() {
        let registry = FallbackRegistry::builtin();
        for &feature in FeatureKind::all() {
            let result = registry.synthesize(feature, "").unwrap();
            let schema = ResponseSchema::compile(registry.schema_for(feature).unwrap()).unwrap();
            schema.check(&result.content).unwrap();
        }
    }

    #[test]
    fn unregistered_feature_is_a_config_error() {
        let registry = FallbackRegistry::new();
        let err = registry
            .synthesize(FeatureKind::JobMatch, "")
            .unwrap_err();
        assert!(matches!(err, AiError::Config { .. }));
    }
}
