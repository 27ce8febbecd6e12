//! Generation request and result shapes.

use serde::{Deserialize, Serialize};

use super::content::{ExpertContent, StyleCheck, StyleVariant};

/// A caller-created, ephemeral request to generate commentary for one
/// knowledge point.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationRequest {
    pub knowledge_point_id: String,
    pub source_text: String,
    #[serde(default)]
    pub style_variant: StyleVariant,
}

impl GenerationRequest {
    pub fn new(knowledge_point_id: impl Into<String>, source_text: impl Into<String>) -> Self {
        Self {
            knowledge_point_id: knowledge_point_id.into(),
            source_text: source_text.into(),
            style_variant: StyleVariant::Default,
        }
    }

    pub fn with_variant(mut self, variant: StyleVariant) -> Self {
        self.style_variant = variant;
        self
    }
}

/// Outcome of a single generation request as seen by callers.
///
/// `content` is present iff `success`; it has always passed the combined
/// validator. `retry_count` counts every attempt made, including a successful
/// final one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<ExpertContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub retry_count: u32,
    pub style_check: StyleCheck,
}

/// One entry of a batch run, order-aligned with the input requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchEntry {
    pub knowledge_point_id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate outcome of a sequential batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub results: Vec<BatchEntry>,
}
