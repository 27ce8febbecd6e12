//! Template version arithmetic.
//!
//! Template versions are strings of the form `v<major>.<minor>`. Comparison
//! is numeric on the (major, minor) pair; lexical string comparison would
//! order "v1.10" before "v1.9", which is wrong.

use std::cmp::Ordering;
use std::fmt;

/// A parsed `v<major>.<minor>` template version.
///
/// Malformed strings parse as `v0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TemplateVersion {
    pub major: u32,
    pub minor: u32,
}

/// Which component to bump when incrementing a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bump {
    Major,
    Minor,
}

impl TemplateVersion {
    pub fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parse a version string. Anything that does not match `v<digits>.<digits>`
    /// yields `v0.0`.
    pub fn parse(s: &str) -> Self {
        Self::parse_strict(s).unwrap_or(Self { major: 0, minor: 0 })
    }

    fn parse_strict(s: &str) -> Option<Self> {
        let rest = s.strip_prefix('v')?;
        let (major, minor) = rest.split_once('.')?;
        if major.is_empty()
            || minor.is_empty()
            || !major.bytes().all(|b| b.is_ascii_digit())
            || !minor.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }
        Some(Self {
            major: major.parse().ok()?,
            minor: minor.parse().ok()?,
        })
    }

    /// Bump this version: `Minor` increments the minor component, `Major`
    /// increments the major component and resets minor to 0.
    pub fn bump(self, kind: Bump) -> Self {
        match kind {
            Bump::Major => Self {
                major: self.major + 1,
                minor: 0,
            },
            Bump::Minor => Self {
                major: self.major,
                minor: self.minor + 1,
            },
        }
    }
}

impl fmt::Display for TemplateVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}", self.major, self.minor)
    }
}

/// Whether a string matches the `v<major>.<minor>` pattern exactly.
pub fn is_valid(s: &str) -> bool {
    TemplateVersion::parse_strict(s).is_some()
}

/// Compare two version strings numerically, major then minor.
pub fn compare(a: &str, b: &str) -> Ordering {
    TemplateVersion::parse(a).cmp(&TemplateVersion::parse(b))
}

/// Increment a version string. Malformed input resets to "v1.0".
pub fn increment(version: &str, kind: Bump) -> String {
    match TemplateVersion::parse_strict(version) {
        Some(v) => v.bump(kind).to_string(),
        None => "v1.0".to_string(),
    }
}
