//! Generation backend abstraction.
//!
//! The backend is an opaque `(system_prompt, user_prompt) -> raw JSON`
//! call. Its output is untrusted and always passes through the combined
//! validator before use.

pub mod anthropic;
pub mod mock;

pub use anthropic::{AnthropicBackend, AnthropicConfig};
pub use mock::MockBackend;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// An opaque generative-text backend.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// One generation call. Returns the raw JSON payload the model produced.
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<Value>;
}
