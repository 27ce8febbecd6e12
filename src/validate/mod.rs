//! Two-stage validation gate: structural schema first, then style rulebook.
//!
//! Every generated payload must pass the combined validator before it is
//! treated as valid anywhere in the pipeline.

pub mod schema;
pub mod style;

pub use schema::{SchemaError, SchemaErrorCode, SchemaValidator};
pub use style::{StyleLexicon, StyleValidator};

use serde_json::Value;

use crate::domain::content::{ExpertContent, StyleCheck};
use crate::error::Result;

/// Unified outcome of the combined validator.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub valid: bool,
    pub schema_errors: Vec<SchemaError>,
    pub style_errors: Vec<String>,
    pub style_check: StyleCheck,
}

impl ValidationResult {
    /// All error messages, schema then style, joined for attempt logs.
    pub fn joined_errors(&self) -> String {
        self.schema_errors
            .iter()
            .map(|e| e.message.as_str())
            .chain(self.style_errors.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Schema validation composed with style validation. Style only runs once
/// the payload is structurally sound.
#[derive(Debug, Clone, Default)]
pub struct CombinedValidator {
    schema: SchemaValidator,
    style: StyleValidator,
}

impl CombinedValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lexicon(lexicon: StyleLexicon) -> Self {
        Self {
            schema: SchemaValidator::new(),
            style: StyleValidator::with_lexicon(lexicon),
        }
    }

    /// Validate a raw payload.
    pub fn validate(&self, payload: &Value) -> ValidationResult {
        self.validate_typed(payload).0
    }

    /// Validate a raw payload and, when structurally sound, hand back the
    /// typed content so callers do not deserialize twice. The returned
    /// content carries the style-check flags of this validation.
    pub fn validate_typed(&self, payload: &Value) -> (ValidationResult, Option<ExpertContent>) {
        let schema_errors = self.schema.validate(payload);
        if !schema_errors.is_empty() {
            return (
                ValidationResult {
                    valid: false,
                    schema_errors,
                    ..ValidationResult::default()
                },
                None,
            );
        }

        let mut content: ExpertContent = match serde_json::from_value(payload.clone()) {
            Ok(c) => c,
            Err(e) => {
                // Schema passed but serde did not; surface it as structural.
                return (
                    ValidationResult {
                        valid: false,
                        schema_errors: vec![SchemaError {
                            code: SchemaErrorCode::MissingField,
                            message: format!("payload does not deserialize: {e}"),
                        }],
                        ..ValidationResult::default()
                    },
                    None,
                );
            }
        };

        let style_check = self.style.check(&content);
        content.style_check = style_check.clone();
        let valid = style_check.passed;
        (
            ValidationResult {
                valid,
                schema_errors: Vec::new(),
                style_errors: style_check.failure_reasons.clone(),
                style_check,
            },
            Some(content),
        )
    }

    /// Validate an already-typed content object (used for defense-in-depth
    /// re-validation before persisting).
    pub fn validate_content(&self, content: &ExpertContent) -> Result<ValidationResult> {
        let payload = serde_json::to_value(content)?;
        Ok(self.validate(&payload))
    }
}
