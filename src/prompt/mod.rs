//! Prompt rendering with Handlebars.

pub mod render;

pub use render::PromptRenderer;
