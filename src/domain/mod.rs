//! Domain types for the generation pipeline.
//!
//! This module provides:
//! - The expert-commentary content model and its style-check flags
//! - Generation request/result/batch shapes
//! - Review-queue records for inputs that exhausted their retries

pub mod content;
pub mod request;
pub mod review;

pub use content::{ExpertContent, PredictedQuestion, StyleCheck, StyleVariant, TrapAnalysis};
pub use request::{BatchEntry, BatchResult, GenerationRequest, GenerationResult};
pub use review::{AttemptErrorKind, RetryAttempt, ReviewQueueItem, ReviewStatus};

/// Content bounds enforced by the validators and clamps for retry settings.
pub mod limits {
    pub const TRAP_MIN: usize = 3;
    pub const TRAP_MAX: usize = 6;
    pub const TACTIC_MIN: usize = 2;
    pub const TACTIC_MAX: usize = 5;
    pub const PREDICTION_MIN: usize = 2;
    pub const PREDICTION_MAX: usize = 4;
    pub const SUMMARY_MIN_CHARS: usize = 10;
    pub const SUMMARY_MAX_CHARS: usize = 20;
    pub const SHORT_SUMMARY_MAX_CHARS: usize = 50;
    pub const TRAP_CORE_MAX_CHARS: usize = 300;
    pub const MNEMONIC_MAX_LINES: usize = 3;
    pub const RETRY_MIN: u32 = 2;
    pub const RETRY_MAX: u32 = 5;
}
