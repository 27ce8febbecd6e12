//! Retry-attempt records and the human review queue data contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::content::StyleVariant;
use super::request::GenerationRequest;
use crate::error::TrapwiseError;

/// Category of a failed generation attempt.
///
/// Backend failures and timeouts are recorded as `Schema` since no payload
/// reached validation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AttemptErrorKind {
    Schema,
    Style,
    Length,
    MissingFields,
}

impl AttemptErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptErrorKind::Schema => "schema",
            AttemptErrorKind::Style => "style",
            AttemptErrorKind::Length => "length",
            AttemptErrorKind::MissingFields => "missing_fields",
        }
    }
}

impl fmt::Display for AttemptErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One failed attempt within a retry run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryAttempt {
    pub attempt_number: u32,
    pub error_kind: AttemptErrorKind,
    pub error_details: String,
    pub timestamp: DateTime<Utc>,
}

impl RetryAttempt {
    pub fn new(attempt_number: u32, error_kind: AttemptErrorKind, error_details: impl Into<String>) -> Self {
        Self {
            attempt_number,
            error_kind,
            error_details: error_details.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Disposition state of a review-queue item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
    Regenerated,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Rejected => "rejected",
            ReviewStatus::Regenerated => "regenerated",
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewStatus {
    type Err = TrapwiseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReviewStatus::Pending),
            "approved" => Ok(ReviewStatus::Approved),
            "rejected" => Ok(ReviewStatus::Rejected),
            "regenerated" => Ok(ReviewStatus::Regenerated),
            other => Err(TrapwiseError::Validation(format!("unknown review status: {other}"))),
        }
    }
}

/// A request that exhausted retries without producing valid content, awaiting
/// human disposition. Created exactly once per exhausted run, in `Pending`
/// state, carrying the whole attempt history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewQueueItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub knowledge_point_id: String,
    pub source_text: String,
    pub style_variant: StyleVariant,
    pub attempts: Vec<RetryAttempt>,
    pub status: ReviewStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewer_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl ReviewQueueItem {
    /// Build a pending item from an exhausted request and its attempt log.
    pub fn pending(request: &GenerationRequest, attempts: Vec<RetryAttempt>) -> Self {
        Self {
            id: None,
            knowledge_point_id: request.knowledge_point_id.clone(),
            source_text: request.source_text.clone(),
            style_variant: request.style_variant,
            attempts,
            status: ReviewStatus::Pending,
            reviewer_notes: None,
            created_at: Utc::now(),
            reviewed_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempt_kind_serde() {
        let json = serde_json::to_string(&AttemptErrorKind::MissingFields).unwrap();
        assert_eq!(json, "\"missing_fields\"");
        let back: AttemptErrorKind = serde_json::from_str("\"length\"").unwrap();
        assert_eq!(back, AttemptErrorKind::Length);
    }

    #[test]
    fn test_review_status_round_trip() {
        for status in [
            ReviewStatus::Pending,
            ReviewStatus::Approved,
            ReviewStatus::Rejected,
            ReviewStatus::Regenerated,
        ] {
            let parsed: ReviewStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("archived".parse::<ReviewStatus>().is_err());
    }

    #[test]
    fn test_pending_item_copies_request() {
        let request = GenerationRequest::new("kp-7", "The half-life is 6 hours")
            .with_variant(StyleVariant::Compact);
        let attempts = vec![RetryAttempt::new(1, AttemptErrorKind::Schema, "missing traps")];
        let item = ReviewQueueItem::pending(&request, attempts.clone());

        assert_eq!(item.status, ReviewStatus::Pending);
        assert_eq!(item.knowledge_point_id, "kp-7");
        assert_eq!(item.style_variant, StyleVariant::Compact);
        assert_eq!(item.attempts, attempts);
        assert!(item.id.is_none());
        assert!(item.reviewed_at.is_none());
    }

    #[test]
    fn test_attempt_json_round_trip() {
        let attempt = RetryAttempt::new(2, AttemptErrorKind::Style, "missing mnemonic");
        let json = serde_json::to_string(&attempt).unwrap();
        let back: RetryAttempt = serde_json::from_str(&json).unwrap();
        assert_eq!(back, attempt);
    }
}
