//! Retry loop with validation gating and review-queue escalation.
//!
//! Each attempt calls the backend, validates the payload, and either returns
//! the first valid content or records the failure. When every attempt fails,
//! the request is handed to the review sink for human disposition.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, info, warn};
use serde_json::Value;

use crate::domain::limits;
use crate::domain::{
    AttemptErrorKind, ExpertContent, GenerationRequest, RetryAttempt, ReviewQueueItem,
};
use crate::error::Result;
use crate::validate::{CombinedValidator, SchemaErrorCode, ValidationResult};

/// Tuning knobs for the retry loop. `min_retries` is the attempt floor a
/// request must reach before an exhausted run is escalated to review;
/// `max_retries` is the total attempt cap.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub min_retries: u32,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub backend_timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            min_retries: 2,
            max_retries: 3,
            retry_delay: Duration::from_millis(1000),
            backend_timeout: Duration::from_secs(300),
        }
    }
}

impl RetryConfig {
    /// Clamp both bounds into the supported window and keep max >= min.
    pub fn clamped(mut self) -> Self {
        self.min_retries = self.min_retries.clamp(limits::RETRY_MIN, limits::RETRY_MAX);
        self.max_retries = self.max_retries.clamp(limits::RETRY_MIN, limits::RETRY_MAX);
        if self.max_retries < self.min_retries {
            self.max_retries = self.min_retries;
        }
        self
    }
}

/// Cooperative cancellation for in-flight retry runs. Checked between
/// attempts; a cancelled run stops cleanly without escalating to review
/// when it has not yet reached the attempt floor.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Outcome of a full retry run. `attempts` holds only the failures;
/// `attempts_made` counts every attempt including a successful final one.
#[derive(Debug, Clone)]
pub struct RetryOutcome {
    pub success: bool,
    pub content: Option<ExpertContent>,
    pub attempts: Vec<RetryAttempt>,
    pub attempts_made: u32,
    pub sent_to_review_queue: bool,
}

/// Destination for requests that exhausted their retries.
pub trait ReviewSink: Send + Sync {
    fn enqueue(&self, item: ReviewQueueItem) -> Result<()>;
}

/// In-memory review sink, the default when no store is wired in.
#[derive(Debug, Default)]
pub struct MemoryReviewQueue {
    items: Mutex<Vec<ReviewQueueItem>>,
}

impl MemoryReviewQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> Vec<ReviewQueueItem> {
        self.items.lock().expect("review queue lock").clone()
    }

    pub fn len(&self) -> usize {
        self.items.lock().expect("review queue lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ReviewSink for MemoryReviewQueue {
    fn enqueue(&self, item: ReviewQueueItem) -> Result<()> {
        self.items.lock().expect("review queue lock").push(item);
        Ok(())
    }
}

/// Drives generate-validate attempts until one passes or the cap is hit.
pub struct RetryOrchestrator {
    config: RetryConfig,
    sink: Arc<dyn ReviewSink>,
}

impl RetryOrchestrator {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config: config.clamped(),
            sink: Arc::new(MemoryReviewQueue::new()),
        }
    }

    pub fn with_sink(config: RetryConfig, sink: Arc<dyn ReviewSink>) -> Self {
        Self {
            config: config.clamped(),
            sink,
        }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Run the retry loop to completion.
    pub async fn execute<F, Fut>(
        &self,
        request: &GenerationRequest,
        validator: &CombinedValidator,
        generate: F,
    ) -> RetryOutcome
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Value>>,
    {
        self.execute_cancellable(request, validator, generate, &CancelToken::new())
            .await
    }

    /// Run the retry loop, stopping between attempts once `token` is
    /// cancelled.
    pub async fn execute_cancellable<F, Fut>(
        &self,
        request: &GenerationRequest,
        validator: &CombinedValidator,
        generate: F,
        token: &CancelToken,
    ) -> RetryOutcome
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<Value>>,
    {
        let mut attempts: Vec<RetryAttempt> = Vec::new();

        for attempt in 1..=self.config.max_retries {
            if token.is_cancelled() {
                info!(
                    "generation cancelled for {} after {} attempt(s)",
                    request.knowledge_point_id,
                    attempts.len()
                );
                break;
            }

            debug!(
                "attempt {}/{} for {}",
                attempt, self.config.max_retries, request.knowledge_point_id
            );

            let (kind, details) =
                match tokio::time::timeout(self.config.backend_timeout, generate()).await {
                    Ok(Ok(payload)) => {
                        let (result, content) = validator.validate_typed(&payload);
                        if result.valid {
                            info!(
                                "{} validated on attempt {}",
                                request.knowledge_point_id, attempt
                            );
                            return RetryOutcome {
                                success: true,
                                content,
                                attempts,
                                attempts_made: attempt,
                                sent_to_review_queue: false,
                            };
                        }
                        (classify(&result), result.joined_errors())
                    }
                    Ok(Err(e)) => (AttemptErrorKind::Schema, format!("backend failure: {e}")),
                    Err(_) => (
                        AttemptErrorKind::Schema,
                        format!(
                            "backend timed out after {}s",
                            self.config.backend_timeout.as_secs()
                        ),
                    ),
                };

            warn!(
                "attempt {} for {} failed ({kind}): {details}",
                attempt, request.knowledge_point_id
            );
            attempts.push(RetryAttempt::new(attempt, kind, details));

            // Linear backoff: delay scales with the attempt number.
            if attempt < self.config.max_retries && !token.is_cancelled() {
                tokio::time::sleep(self.config.retry_delay * attempt).await;
            }
        }

        let attempts_made = attempts.len() as u32;
        let sent = if attempts_made >= self.config.min_retries {
            match self
                .sink
                .enqueue(ReviewQueueItem::pending(request, attempts.clone()))
            {
                Ok(()) => {
                    info!(
                        "{} escalated to review queue after {} failed attempt(s)",
                        request.knowledge_point_id, attempts_made
                    );
                    true
                }
                Err(e) => {
                    warn!(
                        "failed to enqueue {} for review: {e}",
                        request.knowledge_point_id
                    );
                    false
                }
            }
        } else {
            false
        };

        RetryOutcome {
            success: false,
            content: None,
            attempts,
            attempts_made,
            sent_to_review_queue: sent,
        }
    }
}

/// Map a failed validation to an attempt error category. Length problems
/// dominate missing fields, which dominate other structural errors; a
/// style-only failure is `Style`.
fn classify(result: &ValidationResult) -> AttemptErrorKind {
    if result.schema_errors.is_empty() {
        return AttemptErrorKind::Style;
    }
    if result
        .schema_errors
        .iter()
        .any(|e| e.code == SchemaErrorCode::TooLong)
    {
        AttemptErrorKind::Length
    } else if result
        .schema_errors
        .iter()
        .any(|e| e.code == SchemaErrorCode::MissingField)
    {
        AttemptErrorKind::MissingFields
    } else {
        AttemptErrorKind::Schema
    }
}
