//! Trapwise - quality-gated generation of exam-trap commentary
//!
//! Trapwise turns raw knowledge-point text into structured "veteran examiner"
//! commentary via an LLM backend, gating every payload through schema and
//! style validation with retry and review-queue escalation.

pub mod backend;
pub mod domain;
pub mod error;
pub mod generate;
pub mod prompt;
pub mod storage;
pub mod template;
pub mod validate;
pub mod version;

pub use error::{Result, TrapwiseError};
