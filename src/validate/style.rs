//! Style rulebook validation.
//!
//! Runs only on structurally valid content. Every check is evaluated
//! independently and every failing check lands in `failure_reasons`, so a
//! single pass tells the retry loop (and a human reviewer) everything that is
//! wrong with the tone of a payload.
//!
//! Phrase lists are literal substring searches, matched case-insensitively,
//! and injectable via [`StyleLexicon`] so the same engine serves other
//! content registers without code changes.

use crate::domain::content::{ExpertContent, StyleCheck, TrapAnalysis};
use crate::domain::limits;
use crate::template::{PromptTemplate, RuleKind};

/// Markers of the expert-insider register; at least one must appear
/// somewhere in the content.
pub const DEFAULT_REGISTER_MARKERS: [&str; 6] =
    ["trap", "trick", "veteran", "examiner", "reflex", "instant pick"];

/// Model self-reference and hedging phrases that must never appear.
pub const DISCLAIMER_PATTERNS: [&str; 6] = [
    "as an ai",
    "as a language model",
    "i am an ai",
    "this model",
    "i cannot",
    "it is possible that",
];

/// Academic-textbook connectives banned from the expert register.
pub const ACADEMIC_CONNECTIVES: [&str; 5] = [
    "firstly",
    "secondly",
    "in conclusion",
    "in summary",
    "to sum up",
];

/// The phrase lists the style validator matches against.
#[derive(Debug, Clone)]
pub struct StyleLexicon {
    /// Required-register markers; one hit anywhere satisfies the tone check.
    pub register_markers: Vec<String>,
    /// Blocklist for the disclaimer check.
    pub disclaimers: Vec<String>,
    /// Blocklist of academic connectives; the forbidden-pattern check uses
    /// the union of this list and `disclaimers`.
    pub connectives: Vec<String>,
}

impl Default for StyleLexicon {
    fn default() -> Self {
        Self {
            register_markers: to_strings(&DEFAULT_REGISTER_MARKERS),
            disclaimers: to_strings(&DISCLAIMER_PATTERNS),
            connectives: to_strings(&ACADEMIC_CONNECTIVES),
        }
    }
}

impl StyleLexicon {
    /// Derive a lexicon from a prompt template's style rules: `Required`
    /// rules contribute register markers, `Forbidden` rules and the
    /// template's own blocklist contribute connectives. Disclaimers stay the
    /// built-in list unless a rule named `no_disclaimers` overrides them.
    pub fn from_template(template: &PromptTemplate) -> Self {
        let mut lexicon = StyleLexicon::default();

        let mut markers = Vec::new();
        let mut connectives = template.forbidden_patterns.clone();
        for rule in &template.style_rules {
            match rule.kind {
                RuleKind::Required => markers.extend(rule.phrases.iter().cloned()),
                RuleKind::Forbidden => {
                    if rule.name == "no_disclaimers" {
                        lexicon.disclaimers = rule.phrases.clone();
                    } else {
                        connectives.extend(rule.phrases.iter().cloned());
                    }
                }
            }
        }
        if !markers.is_empty() {
            lexicon.register_markers = markers;
        }
        if !connectives.is_empty() {
            connectives.sort();
            connectives.dedup();
            lexicon.connectives = connectives;
        }
        lexicon
    }

    fn forbidden_union(&self) -> Vec<&str> {
        self.connectives
            .iter()
            .chain(self.disclaimers.iter())
            .map(String::as_str)
            .collect()
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Validates content against the style rulebook.
#[derive(Debug, Clone, Default)]
pub struct StyleValidator {
    lexicon: StyleLexicon,
}

impl StyleValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lexicon(lexicon: StyleLexicon) -> Self {
        Self { lexicon }
    }

    /// Run every style check and collect every failure reason.
    pub fn check(&self, content: &ExpertContent) -> StyleCheck {
        let text = all_text(content).to_lowercase();
        let mut reasons = Vec::new();

        let expert_tone = self
            .lexicon
            .register_markers
            .iter()
            .any(|m| text.contains(&m.to_lowercase()));
        if !expert_tone {
            reasons.push("content does not use the expert-insider register".to_string());
        }

        let has_traps =
            !content.traps.is_empty() && content.traps.iter().all(|t| !t.pitfalls.is_empty());
        if !has_traps {
            reasons.push("missing usable trap analyses".to_string());
        }

        let has_mnemonic = content
            .traps
            .iter()
            .any(|t| t.mnemonic.as_deref().is_some_and(|m| !m.trim().is_empty()));
        if !has_mnemonic {
            reasons.push("no trap carries a mnemonic".to_string());
        }

        let disclaimer_hits = hits(&text, &self.lexicon.disclaimers);
        let no_disclaimers = disclaimer_hits.is_empty();
        if !no_disclaimers {
            reasons.push(format!(
                "model self-reference detected: {}",
                disclaimer_hits.join(", ")
            ));
        }

        let forbidden = self.lexicon.forbidden_union();
        let forbidden_hits: Vec<&str> = forbidden
            .iter()
            .copied()
            .filter(|p| text.contains(&p.to_lowercase()))
            .collect();
        let no_forbidden_patterns = forbidden_hits.is_empty();
        if !no_forbidden_patterns {
            reasons.push(format!(
                "forbidden patterns detected: {}",
                forbidden_hits.join(", ")
            ));
        }

        for (i, trap) in content.traps.iter().enumerate() {
            reasons.extend(
                self.trap_errors(trap)
                    .into_iter()
                    .map(|e| format!("trap {}: {e}", i + 1)),
            );
        }

        let passed = reasons.is_empty();
        StyleCheck {
            expert_tone,
            has_traps,
            has_mnemonic,
            no_disclaimers,
            no_forbidden_patterns,
            passed,
            failure_reasons: reasons,
        }
    }

    /// Per-trap length caps: core fields capped at 300 chars, mnemonic at
    /// 3 lines (newline count + 1).
    fn trap_errors(&self, trap: &TrapAnalysis) -> Vec<String> {
        let mut errors = Vec::new();

        let core = trap.core_chars();
        if core > limits::TRAP_CORE_MAX_CHARS {
            errors.push(format!(
                "core fields exceed {} chars, got {core}",
                limits::TRAP_CORE_MAX_CHARS
            ));
        }

        if let Some(mnemonic) = &trap.mnemonic {
            let lines = mnemonic.matches('\n').count() + 1;
            if lines > limits::MNEMONIC_MAX_LINES {
                errors.push(format!(
                    "mnemonic exceeds {} lines, got {lines}",
                    limits::MNEMONIC_MAX_LINES
                ));
            }
        }

        errors
    }
}

fn hits<'a>(text: &str, patterns: &'a [String]) -> Vec<&'a str> {
    patterns
        .iter()
        .filter(|p| text.contains(&p.to_lowercase()))
        .map(String::as_str)
        .collect()
}

/// Concatenation of every textual field of the content, the haystack for
/// all phrase checks.
fn all_text(content: &ExpertContent) -> String {
    let mut parts: Vec<&str> = vec![
        &content.name,
        &content.diagram,
        &content.summary,
        content.short_summary.as_deref().unwrap_or(""),
    ];
    parts.extend(content.tactics.iter().map(String::as_str));
    for trap in &content.traps {
        parts.push(&trap.title);
        parts.push(&trap.pattern);
        parts.extend(trap.pitfalls.iter().map(String::as_str));
        parts.push(&trap.technique);
        if let Some(m) = &trap.mnemonic {
            parts.push(m);
        }
        if let Some(s) = &trap.scenario {
            parts.push(s);
        }
    }
    for pred in &content.predictions {
        parts.push(&pred.stem);
        parts.push(&pred.answer);
        parts.push(&pred.rationale);
    }
    parts.join(" ")
}
