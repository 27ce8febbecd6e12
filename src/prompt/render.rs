//! Prompt Renderer - Render templates with context variables using Handlebars

use std::collections::HashMap;

use handlebars::Handlebars;
use serde::Serialize;

use crate::error::{Result, TrapwiseError};

/// Renders prompt templates using Handlebars templating
pub struct PromptRenderer {
    handlebars: Handlebars<'static>,
}

impl Default for PromptRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptRenderer {
    /// Create a new PromptRenderer with default settings
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        // Missing variables render as empty strings
        handlebars.set_strict_mode(false);
        // Prompt text is not HTML; never escape it
        handlebars.register_escape_fn(handlebars::no_escape);
        Self { handlebars }
    }

    /// Render a template string with the given context
    pub fn render(&self, template: &str, context: &HashMap<String, String>) -> Result<String> {
        self.handlebars
            .render_template(template, context)
            .map_err(|e| TrapwiseError::Template(format!("failed to render template: {e}")))
    }

    /// Render a template string with any serializable context
    pub fn render_with<T: Serialize>(&self, template: &str, context: &T) -> Result<String> {
        self.handlebars
            .render_template(template, context)
            .map_err(|e| TrapwiseError::Template(format!("failed to render template: {e}")))
    }

    /// Render a user-prompt template with the one variable the pipeline
    /// substitutes: the knowledge point's source text.
    pub fn render_user_prompt(&self, template: &str, knowledge_point_text: &str) -> Result<String> {
        let mut context = HashMap::new();
        context.insert(
            "knowledge_point_text".to_string(),
            knowledge_point_text.to_string(),
        );
        self.render(template, &context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_simple() {
        let renderer = PromptRenderer::new();
        let mut context = HashMap::new();
        context.insert("name".to_string(), "World".to_string());
        let result = renderer.render("Hello, {{name}}!", &context).unwrap();
        assert_eq!(result, "Hello, World!");
    }

    #[test]
    fn test_render_missing_variable_empty_string() {
        let renderer = PromptRenderer::new();
        let context: HashMap<String, String> = HashMap::new();
        let result = renderer.render("Hello, {{name}}!", &context).unwrap();
        assert_eq!(result, "Hello, !");
    }

    #[test]
    fn test_render_does_not_escape() {
        let renderer = PromptRenderer::new();
        let mut context = HashMap::new();
        context.insert("code".to_string(), "a < b && c > d".to_string());
        let result = renderer.render("{{code}}", &context).unwrap();
        assert_eq!(result, "a < b && c > d");
    }

    #[test]
    fn test_render_user_prompt() {
        let renderer = PromptRenderer::new();
        let template = "Knowledge point:\n{{knowledge_point_text}}\nRespond with JSON.";
        let result = renderer
            .render_user_prompt(template, "The maximum dose is 4g.")
            .unwrap();
        assert!(result.contains("The maximum dose is 4g."));
        assert!(result.starts_with("Knowledge point:"));
    }

    #[test]
    fn test_render_with_serializable() {
        #[derive(Serialize)]
        struct Context {
            topic: String,
        }
        let renderer = PromptRenderer::new();
        let result = renderer
            .render_with("Topic: {{topic}}", &Context { topic: "dosage".to_string() })
            .unwrap();
        assert_eq!(result, "Topic: dosage");
    }

    #[test]
    fn test_render_preserves_whitespace() {
        let renderer = PromptRenderer::new();
        let context: HashMap<String, String> = HashMap::new();
        let result = renderer.render("Line 1\n\nLine 3", &context).unwrap();
        assert_eq!(result, "Line 1\n\nLine 3");
    }
}
