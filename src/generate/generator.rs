//! High-level generation entry point tying templates, backend, rendering,
//! validation, and the retry loop together.

use std::sync::Arc;

use log::info;
use serde_json::{Value, json};

use crate::backend::GenerationBackend;
use crate::domain::{
    BatchEntry, BatchResult, GenerationRequest, GenerationResult, StyleCheck,
};
use crate::error::Result;
use crate::prompt::PromptRenderer;
use crate::template::{PromptTemplate, TemplateStore};
use crate::validate::{CombinedValidator, StyleLexicon};

use super::retry::{CancelToken, RetryOrchestrator};

/// Generates validated expert commentary for knowledge points.
///
/// Each call snapshots the active prompt template once and uses that same
/// snapshot for rendering and for the style lexicon, so a mid-run template
/// switch never splits a request across two rulebooks.
pub struct ContentGenerator {
    templates: Arc<TemplateStore>,
    backend: Arc<dyn GenerationBackend>,
    orchestrator: RetryOrchestrator,
    renderer: PromptRenderer,
}

impl ContentGenerator {
    pub fn new(
        templates: Arc<TemplateStore>,
        backend: Arc<dyn GenerationBackend>,
        orchestrator: RetryOrchestrator,
    ) -> Self {
        Self {
            templates,
            backend,
            orchestrator,
            renderer: PromptRenderer::new(),
        }
    }

    /// Generate content for a single request.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        self.generate_cancellable(request, &CancelToken::new())
            .await
    }

    /// Generate content for a single request with cooperative cancellation.
    pub async fn generate_cancellable(
        &self,
        request: &GenerationRequest,
        token: &CancelToken,
    ) -> Result<GenerationResult> {
        let template = self.templates.active();
        let validator = CombinedValidator::with_lexicon(StyleLexicon::from_template(&template));
        let user_prompt = self
            .renderer
            .render_user_prompt(&template.user_prompt_template, &request.source_text)?;

        info!(
            "generating {} (variant {}, template {})",
            request.knowledge_point_id, request.style_variant, template.version
        );

        let backend = self.backend.as_ref();
        let template_ref = &template;
        let user_prompt_ref = user_prompt.as_str();
        let outcome = self
            .orchestrator
            .execute_cancellable(
                request,
                &validator,
                move || async move {
                    let payload = backend
                        .generate(&template_ref.system_prompt, user_prompt_ref)
                        .await?;
                    Ok(stamp_payload(payload, request, template_ref))
                },
                token,
            )
            .await;

        let style_check = outcome
            .content
            .as_ref()
            .map(|c| c.style_check.clone())
            .unwrap_or_else(StyleCheck::default);
        let error = if outcome.success {
            None
        } else if outcome.sent_to_review_queue {
            Some(format!(
                "failed after {} attempt(s); queued for review",
                outcome.attempts_made
            ))
        } else {
            Some(
                outcome
                    .attempts
                    .last()
                    .map(|a| a.error_details.clone())
                    .unwrap_or_else(|| "generation cancelled before any attempt".to_string()),
            )
        };

        Ok(GenerationResult {
            success: outcome.success,
            content: outcome.content,
            error,
            retry_count: outcome.attempts_made,
            style_check,
        })
    }

    /// Run requests sequentially, never aborting the batch on individual
    /// failures. Result order matches input order.
    pub async fn generate_batch(&self, requests: &[GenerationRequest]) -> BatchResult {
        let mut entries = Vec::with_capacity(requests.len());
        let mut success = 0usize;

        for request in requests {
            let entry = match self.generate(request).await {
                Ok(result) => {
                    if result.success {
                        success += 1;
                    }
                    BatchEntry {
                        knowledge_point_id: request.knowledge_point_id.clone(),
                        success: result.success,
                        error: result.error,
                    }
                }
                Err(e) => BatchEntry {
                    knowledge_point_id: request.knowledge_point_id.clone(),
                    success: false,
                    error: Some(e.to_string()),
                },
            };
            entries.push(entry);
        }

        BatchResult {
            total: requests.len(),
            success,
            failed: requests.len() - success,
            results: entries,
        }
    }
}

/// Stamp request identity and template provenance onto a raw payload before
/// validation. The backend is never trusted to echo these back correctly;
/// `version` and `style_variant` are only filled in when absent so a payload
/// that supplies a bad value still fails validation visibly.
fn stamp_payload(mut payload: Value, request: &GenerationRequest, template: &PromptTemplate) -> Value {
    if let Some(map) = payload.as_object_mut() {
        map.insert(
            "knowledge_point_id".to_string(),
            json!(request.knowledge_point_id),
        );
        map.insert("source_text".to_string(), json!(request.source_text));
        map.insert(
            "prompt_template_version".to_string(),
            json!(template.version),
        );
        if map.get("style_variant").is_none_or(Value::is_null) {
            map.insert(
                "style_variant".to_string(),
                json!(request.style_variant.as_str()),
            );
        }
        if map.get("version").is_none_or(Value::is_null) {
            map.insert("version".to_string(), json!("v1.0"));
        }
    }
    payload
}
