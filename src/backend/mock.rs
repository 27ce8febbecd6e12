//! Scripted backend for tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use super::GenerationBackend;
use crate::error::{Result, TrapwiseError};

/// A backend that replays a scripted sequence of payloads or failures.
pub struct MockBackend {
    responses: Mutex<VecDeque<std::result::Result<Value, String>>>,
    calls: AtomicU32,
}

impl MockBackend {
    /// Script a sequence of successful payloads.
    pub fn new(payloads: Vec<Value>) -> Self {
        Self::with_results(payloads.into_iter().map(Ok).collect())
    }

    /// Script a mixed sequence of payloads and error messages.
    pub fn with_results(results: Vec<std::result::Result<Value, String>>) -> Self {
        Self {
            responses: Mutex::new(results.into()),
            calls: AtomicU32::new(0),
        }
    }

    /// How many times `generate` has been called.
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationBackend for MockBackend {
    async fn generate(&self, _system_prompt: &str, _user_prompt: &str) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.responses.lock().expect("mock backend lock").pop_front();
        match next {
            Some(Ok(payload)) => Ok(payload),
            Some(Err(message)) => Err(TrapwiseError::Backend(message)),
            None => Err(TrapwiseError::Backend("mock backend exhausted".to_string())),
        }
    }
}
