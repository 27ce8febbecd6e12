//! The built-in v1.0 prompt template, used whenever no registered template
//! is active.

use super::{PromptTemplate, RuleKind, StyleRule};
use crate::validate::style::{ACADEMIC_CONNECTIVES, DEFAULT_REGISTER_MARKERS, DISCLAIMER_PATTERNS};

const SYSTEM_PROMPT: &str = "\
You generate \"veteran examiner\" commentary for an exam question bank. The \
output must be uniform in style, entertaining but professional, tightly \
structured, and ready for direct display.

Register:
1. Write like a coach who has taken this exam for ten years: wry, precise, \
straight at the common mistakes.
2. Frame everything as \"the examiner digs traps, the candidate falls in\".
3. Use mnemonics, analogies, and scenario imagery so content sticks.
4. Emphasize test tactics, question patterns, and number-memory tricks.
5. Stay strictly on the given knowledge point; never pad with outside material.
6. Short sentences, many paragraphs, no dense walls of text.

Fields:
- traps: 3 to 6 entries, each with title, pattern, pitfalls, technique, and \
a mnemonic or a scenario where it fits.
- A technique must be short, memorable, and visual: \"see X, reflex-pick Y\".
- predictions: 2 to 4 questions, each as stem + answer + why that answer.
- diagram: a fenced code block with a clearly layered structure.
- summary: 10 to 20 characters, ruthlessly on point.

Never:
- Exceed 300 characters in any trap entry.
- Use textbook connectives such as \"firstly\" or \"in conclusion\".
- Leave model fingerprints such as \"as an AI\" or hedging language.
- Invent material not present in the knowledge point.";

const USER_PROMPT_TEMPLATE: &str = "\
Generate veteran-examiner commentary for the following knowledge point:

{{knowledge_point_text}}

Respond with strict JSON containing these fields:
- name
- traps (3-6)
- tactics (2-5)
- predictions (2-4)
- diagram
- summary (10-20 characters)";

/// Build the built-in v1.0 template.
pub fn default_template() -> PromptTemplate {
    PromptTemplate {
        version: "v1.0".to_string(),
        system_prompt: SYSTEM_PROMPT.to_string(),
        user_prompt_template: USER_PROMPT_TEMPLATE.to_string(),
        forbidden_patterns: ACADEMIC_CONNECTIVES.iter().map(|s| s.to_string()).collect(),
        style_rules: vec![
            StyleRule {
                name: "expert_tone".to_string(),
                phrases: DEFAULT_REGISTER_MARKERS.iter().map(|s| s.to_string()).collect(),
                kind: RuleKind::Required,
                message: "content must use the expert-insider register".to_string(),
            },
            StyleRule {
                name: "no_academic_style".to_string(),
                phrases: ACADEMIC_CONNECTIVES.iter().map(|s| s.to_string()).collect(),
                kind: RuleKind::Forbidden,
                message: "textbook connectives are not allowed".to_string(),
            },
            StyleRule {
                name: "no_disclaimers".to_string(),
                phrases: DISCLAIMER_PATTERNS.iter().map(|s| s.to_string()).collect(),
                kind: RuleKind::Forbidden,
                message: "model self-reference is not allowed".to_string(),
            },
        ],
        is_active: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_template_shape() {
        let template = default_template();
        assert_eq!(template.version, "v1.0");
        assert!(template.is_active);
        assert!(template.user_prompt_template.contains("{{knowledge_point_text}}"));
        assert!(!template.forbidden_patterns.is_empty());
        assert_eq!(template.style_rules.len(), 3);
    }

    #[test]
    fn test_default_template_version_is_well_formed() {
        assert!(crate::version::is_valid(&default_template().version));
    }
}
