//! Response contract validation
//!
//! Features that require structured output attach a JSON schema to their
//! request; the broker checks each provider reply against it before
//! accepting the attempt. Content must be a plain JSON document; prose
//! wrapped around JSON is rejected rather than scraped out.

use crate::error::{AiError, AiResult};
use jsonschema::Validator;
use serde_json::Value;

/// A compiled JSON schema for provider response bodies
pub struct ResponseSchema {
    validator: Validator,
}

impl ResponseSchema {
    /// Compile a schema document. Invalid schemas are configuration errors.
    pub fn compile(schema: &Value) -> AiResult<Self> {
        let validator = jsonschema::validator_for(schema)
            .map_err(|e| AiError::config(format!("invalid response schema: {e}")))?;
        Ok(Self { validator })
    }

    /// Check raw response content against the schema.
    ///
    /// The content must parse as JSON on its own; anything else (markdown
    /// fences, leading prose) fails the check.
    pub fn check(&self, content: &str) -> AiResult<()> {
        let instance: Value = serde_json::from_str(content.trim())
            .map_err(|e| AiError::schema_mismatch(format!("response is not valid JSON: {e}")))?;

        self.validator
            .validate(&instance)
            .map_err(|e| AiError::schema_mismatch(format!("response violates schema: {e}")))
    }

    /// Validate an already-parsed JSON value
    pub fn check_value(&self, instance: &Value) -> AiResult<()> {
        self.validator
            .validate(instance)
            .map_err(|e| AiError::schema_mismatch(format!("response violates schema: {e}")))
    }
}
