//! Generation pipeline: retry orchestration and the content generator.

pub mod generator;
pub mod retry;

pub use generator::ContentGenerator;
pub use retry::{
    CancelToken, MemoryReviewQueue, RetryConfig, RetryOrchestrator, RetryOutcome, ReviewSink,
};
