//! The expert-commentary content model.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TrapwiseError;

/// Presentation profile for generated content.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StyleVariant {
    #[default]
    Default,
    Compact,
    Mobile,
    VideoScript,
}

impl StyleVariant {
    pub const ALL: [StyleVariant; 4] = [
        StyleVariant::Default,
        StyleVariant::Compact,
        StyleVariant::Mobile,
        StyleVariant::VideoScript,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StyleVariant::Default => "default",
            StyleVariant::Compact => "compact",
            StyleVariant::Mobile => "mobile",
            StyleVariant::VideoScript => "video_script",
        }
    }

    /// Whether a raw string names a known variant.
    pub fn is_known(s: &str) -> bool {
        Self::ALL.iter().any(|v| v.as_str() == s)
    }
}

impl fmt::Display for StyleVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StyleVariant {
    type Err = TrapwiseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| TrapwiseError::Validation(format!("unknown style variant: {s}")))
    }
}

/// One common test-taking mistake: its triggering pattern, the underlying
/// pitfalls, and a memorization technique. At least one of `mnemonic` or
/// `scenario` must be present.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrapAnalysis {
    pub title: String,
    pub pattern: String,
    #[serde(default)]
    pub pitfalls: Vec<String>,
    pub technique: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mnemonic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,
}

impl TrapAnalysis {
    /// Character count of the core fields, the quantity capped by the style
    /// rulebook. Mnemonic and scenario are excluded.
    pub fn core_chars(&self) -> usize {
        self.title.chars().count()
            + self.pattern.chars().count()
            + self.pitfalls.iter().map(|p| p.chars().count()).sum::<usize>()
            + self.technique.chars().count()
    }
}

/// A predicted exam question with its answer and rationale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PredictedQuestion {
    pub stem: String,
    pub answer: String,
    pub rationale: String,
}

/// Outcome flags of the style rulebook, one per independent check.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StyleCheck {
    pub expert_tone: bool,
    pub has_traps: bool,
    pub has_mnemonic: bool,
    pub no_disclaimers: bool,
    pub no_forbidden_patterns: bool,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failure_reasons: Vec<String>,
}

/// A fully generated expert-commentary document for one knowledge point.
///
/// Instances are only persisted after passing the combined validator; the
/// invariants (trap/prediction counts, summary length, version pattern) hold
/// for any content marked valid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExpertContent {
    #[serde(default)]
    pub knowledge_point_id: String,
    pub name: String,
    pub traps: Vec<TrapAnalysis>,
    pub tactics: Vec<String>,
    pub predictions: Vec<PredictedQuestion>,
    pub diagram: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_summary: Option<String>,
    pub version: String,
    pub style_variant: StyleVariant,
    pub source_text: String,
    #[serde(default)]
    pub prompt_template_version: String,
    #[serde(default)]
    pub style_check: StyleCheck,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_variant_round_trip() {
        for variant in StyleVariant::ALL {
            let parsed: StyleVariant = variant.as_str().parse().unwrap();
            assert_eq!(parsed, variant);
        }
    }

    #[test]
    fn test_style_variant_serde_snake_case() {
        let json = serde_json::to_string(&StyleVariant::VideoScript).unwrap();
        assert_eq!(json, "\"video_script\"");
        let back: StyleVariant = serde_json::from_str("\"compact\"").unwrap();
        assert_eq!(back, StyleVariant::Compact);
    }

    #[test]
    fn test_style_variant_unknown_rejected() {
        assert!("tiktok".parse::<StyleVariant>().is_err());
        assert!(!StyleVariant::is_known("tiktok"));
        assert!(StyleVariant::is_known("mobile"));
    }

    #[test]
    fn test_style_variant_default() {
        assert_eq!(StyleVariant::default(), StyleVariant::Default);
    }

    #[test]
    fn test_trap_core_chars_excludes_mnemonic() {
        let trap = TrapAnalysis {
            title: "ab".to_string(),
            pattern: "cde".to_string(),
            pitfalls: vec!["fg".to_string(), "h".to_string()],
            technique: "ij".to_string(),
            mnemonic: Some("this does not count".to_string()),
            scenario: None,
        };
        assert_eq!(trap.core_chars(), 2 + 3 + 3 + 2);
    }

    #[test]
    fn test_style_check_default_all_false() {
        let check = StyleCheck::default();
        assert!(!check.expert_tone);
        assert!(!check.has_traps);
        assert!(!check.has_mnemonic);
        assert!(!check.no_disclaimers);
        assert!(!check.no_forbidden_patterns);
        assert!(!check.passed);
        assert!(check.failure_reasons.is_empty());
    }

    #[test]
    fn test_content_deserializes_with_defaults() {
        let json = serde_json::json!({
            "name": "Dosage limits",
            "traps": [],
            "tactics": [],
            "predictions": [],
            "diagram": "",
            "summary": "short",
            "version": "v1.0",
            "style_variant": "default",
            "source_text": "text",
        });
        let content: ExpertContent = serde_json::from_value(json).unwrap();
        assert!(content.knowledge_point_id.is_empty());
        assert!(content.prompt_template_version.is_empty());
        assert!(!content.style_check.passed);
    }
}
