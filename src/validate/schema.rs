//! Structural validation of raw generation payloads.
//!
//! The backend is untrusted: its output is a bare `serde_json::Value` until
//! every structural check passes. Checks accumulate rather than fail fast so
//! one pass surfaces every violation, and each error carries a structured
//! code so retry classification never has to sniff message text.

use serde_json::Value;

use crate::domain::content::StyleVariant;
use crate::domain::limits;
use crate::version;

/// Structured category of a schema violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorCode {
    MissingField,
    CountOutOfRange,
    TooShort,
    TooLong,
    BadVersion,
    UnknownVariant,
}

/// A single structural violation: machine-readable code plus human detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaError {
    pub code: SchemaErrorCode,
    pub message: String,
}

impl SchemaError {
    fn new(code: SchemaErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

const REQUIRED_FIELDS: [&str; 9] = [
    "name",
    "traps",
    "tactics",
    "predictions",
    "diagram",
    "summary",
    "version",
    "style_variant",
    "source_text",
];

/// Validates the structural shape and bounds of a generated payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator;

impl SchemaValidator {
    pub fn new() -> Self {
        Self
    }

    /// Run every structural check, returning all violations found.
    pub fn validate(&self, payload: &Value) -> Vec<SchemaError> {
        let mut errors = Vec::new();

        let Some(obj) = payload.as_object() else {
            errors.push(SchemaError::new(
                SchemaErrorCode::MissingField,
                "payload is not a JSON object",
            ));
            return errors;
        };

        for field in REQUIRED_FIELDS {
            if !obj.contains_key(field) {
                errors.push(SchemaError::new(
                    SchemaErrorCode::MissingField,
                    format!("missing required field `{field}`"),
                ));
            }
        }

        if let Some(name) = obj.get("name")
            && str_empty(name)
        {
            errors.push(SchemaError::new(SchemaErrorCode::MissingField, "`name` is empty"));
        }
        if let Some(source) = obj.get("source_text")
            && str_empty(source)
        {
            errors.push(SchemaError::new(
                SchemaErrorCode::MissingField,
                "`source_text` is empty",
            ));
        }

        if let Some(traps) = obj.get("traps") {
            self.check_traps(traps, &mut errors);
        }
        if let Some(tactics) = obj.get("tactics") {
            self.check_tactics(tactics, &mut errors);
        }
        if let Some(predictions) = obj.get("predictions") {
            self.check_predictions(predictions, &mut errors);
        }
        if let Some(summary) = obj.get("summary") {
            self.check_summary(summary, &mut errors);
        }
        if let Some(short) = obj.get("short_summary")
            && let Some(s) = short.as_str()
        {
            let chars = s.chars().count();
            if chars > limits::SHORT_SUMMARY_MAX_CHARS {
                errors.push(SchemaError::new(
                    SchemaErrorCode::TooLong,
                    format!(
                        "short_summary exceeds {} chars, got {chars}",
                        limits::SHORT_SUMMARY_MAX_CHARS
                    ),
                ));
            }
        }
        if let Some(ver) = obj.get("version") {
            let s = ver.as_str().unwrap_or("");
            if !version::is_valid(s) {
                errors.push(SchemaError::new(
                    SchemaErrorCode::BadVersion,
                    format!("version must match v<major>.<minor>, got `{s}`"),
                ));
            }
        }
        if let Some(variant) = obj.get("style_variant") {
            let s = variant.as_str().unwrap_or("");
            if !StyleVariant::is_known(s) {
                errors.push(SchemaError::new(
                    SchemaErrorCode::UnknownVariant,
                    format!("unknown style_variant `{s}`"),
                ));
            }
        }

        errors
    }

    fn check_traps(&self, traps: &Value, errors: &mut Vec<SchemaError>) {
        let Some(items) = traps.as_array() else {
            errors.push(SchemaError::new(
                SchemaErrorCode::MissingField,
                "`traps` must be an array",
            ));
            return;
        };

        if items.len() < limits::TRAP_MIN || items.len() > limits::TRAP_MAX {
            errors.push(SchemaError::new(
                SchemaErrorCode::CountOutOfRange,
                format!(
                    "traps: expected {}..={}, got {}",
                    limits::TRAP_MIN,
                    limits::TRAP_MAX,
                    items.len()
                ),
            ));
        }

        for (i, trap) in items.iter().enumerate() {
            let n = i + 1;
            for field in ["title", "pattern", "technique"] {
                if str_missing(trap.get(field)) {
                    errors.push(SchemaError::new(
                        SchemaErrorCode::MissingField,
                        format!("trap {n} missing `{field}`"),
                    ));
                }
            }
            let pitfalls = trap.get("pitfalls").and_then(Value::as_array);
            if pitfalls.is_none_or(|p| p.is_empty()) {
                errors.push(SchemaError::new(
                    SchemaErrorCode::MissingField,
                    format!("trap {n} has no pitfalls"),
                ));
            }
            let has_mnemonic = !str_missing(trap.get("mnemonic"));
            let has_scenario = !str_missing(trap.get("scenario"));
            if !has_mnemonic && !has_scenario {
                errors.push(SchemaError::new(
                    SchemaErrorCode::MissingField,
                    format!("trap {n} needs a mnemonic or a scenario"),
                ));
            }
        }
    }

    fn check_tactics(&self, tactics: &Value, errors: &mut Vec<SchemaError>) {
        let Some(items) = tactics.as_array() else {
            errors.push(SchemaError::new(
                SchemaErrorCode::MissingField,
                "`tactics` must be an array",
            ));
            return;
        };
        if items.len() < limits::TACTIC_MIN || items.len() > limits::TACTIC_MAX {
            errors.push(SchemaError::new(
                SchemaErrorCode::CountOutOfRange,
                format!(
                    "tactics: expected {}..={}, got {}",
                    limits::TACTIC_MIN,
                    limits::TACTIC_MAX,
                    items.len()
                ),
            ));
        }
    }

    fn check_predictions(&self, predictions: &Value, errors: &mut Vec<SchemaError>) {
        let Some(items) = predictions.as_array() else {
            errors.push(SchemaError::new(
                SchemaErrorCode::MissingField,
                "`predictions` must be an array",
            ));
            return;
        };
        if items.len() < limits::PREDICTION_MIN || items.len() > limits::PREDICTION_MAX {
            errors.push(SchemaError::new(
                SchemaErrorCode::CountOutOfRange,
                format!(
                    "predictions: expected {}..={}, got {}",
                    limits::PREDICTION_MIN,
                    limits::PREDICTION_MAX,
                    items.len()
                ),
            ));
        }
        for (i, pred) in items.iter().enumerate() {
            let n = i + 1;
            for field in ["stem", "answer", "rationale"] {
                if str_missing(pred.get(field)) {
                    errors.push(SchemaError::new(
                        SchemaErrorCode::MissingField,
                        format!("prediction {n} missing `{field}`"),
                    ));
                }
            }
        }
    }

    fn check_summary(&self, summary: &Value, errors: &mut Vec<SchemaError>) {
        let chars = summary.as_str().map(|s| s.chars().count()).unwrap_or(0);
        if chars < limits::SUMMARY_MIN_CHARS {
            errors.push(SchemaError::new(
                SchemaErrorCode::TooShort,
                format!(
                    "summary below {} chars, got {chars}",
                    limits::SUMMARY_MIN_CHARS
                ),
            ));
        } else if chars > limits::SUMMARY_MAX_CHARS {
            errors.push(SchemaError::new(
                SchemaErrorCode::TooLong,
                format!(
                    "summary exceeds {} chars, got {chars}",
                    limits::SUMMARY_MAX_CHARS
                ),
            ));
        }
    }
}

fn str_empty(value: &Value) -> bool {
    value.as_str().is_some_and(|s| s.trim().is_empty())
}

fn str_missing(value: Option<&Value>) -> bool {
    match value {
        None => true,
        Some(v) => v.as_str().is_none_or(|s| s.trim().is_empty()),
    }
}
