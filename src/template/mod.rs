//! Versioned prompt templates and the registry that owns them.

pub mod default;
pub mod store;

pub use default::default_template;
pub use store::TemplateStore;

use serde::{Deserialize, Serialize};

/// Whether a style rule demands or bans its phrases.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Required,
    Forbidden,
}

/// A named phrase rule carried by a template, consumed by the style
/// validator as literal substring searches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StyleRule {
    pub name: String,
    pub phrases: Vec<String>,
    pub kind: RuleKind,
    pub message: String,
}

/// A versioned prompt template. The `is_active` flag is an input to
/// [`TemplateStore::register`]; inside the store, activation lives in a
/// single slot so at most one template is ever active.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromptTemplate {
    pub version: String,
    pub system_prompt: String,
    /// Handlebars template; `{{knowledge_point_text}}` is the one variable.
    pub user_prompt_template: String,
    pub forbidden_patterns: Vec<String>,
    pub style_rules: Vec<StyleRule>,
    pub is_active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_rule_serde() {
        let rule = StyleRule {
            name: "expert_tone".to_string(),
            phrases: vec!["trap".to_string()],
            kind: RuleKind::Required,
            message: "must use the expert register".to_string(),
        };
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["kind"], "required");
        let back: StyleRule = serde_json::from_value(json).unwrap();
        assert_eq!(back, rule);
    }
}
