//! SQLite persistence for validated content and the review queue.
//!
//! Rows keep the full JSON document plus a few indexed columns; the JSON is
//! the source of truth and the columns exist for lookups.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use log::{error, warn};
use rusqlite::{Connection, OptionalExtension, params};

use crate::domain::{ExpertContent, ReviewQueueItem, ReviewStatus, RetryAttempt, StyleVariant};
use crate::error::{Result, TrapwiseError};
use crate::generate::ReviewSink;
use crate::validate::SchemaValidator;

/// Persistent store keyed by (knowledge_point_id, style_variant).
///
/// The connection sits behind a mutex so the store can be shared through an
/// `Arc` and used as a review sink from the retry loop.
pub struct ContentStore {
    db: Mutex<Connection>,
}

impl ContentStore {
    /// Open or create the store at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let db = Connection::open(path)?;
        Self::init_schema(&db)?;
        Ok(Self { db: Mutex::new(db) })
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let db = Connection::open_in_memory()?;
        Self::init_schema(&db)?;
        Ok(Self { db: Mutex::new(db) })
    }

    fn init_schema(db: &Connection) -> Result<()> {
        db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS expert_content (
                knowledge_point_id TEXT NOT NULL,
                style_variant TEXT NOT NULL,
                version TEXT NOT NULL,
                json_data TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (knowledge_point_id, style_variant)
            );

            CREATE TABLE IF NOT EXISTS review_queue (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                knowledge_point_id TEXT NOT NULL,
                source_text TEXT NOT NULL,
                style_variant TEXT NOT NULL,
                attempts TEXT NOT NULL,
                status TEXT NOT NULL,
                reviewer_notes TEXT,
                created_at TEXT NOT NULL,
                reviewed_at TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_queue_status ON review_queue(status);
            CREATE INDEX IF NOT EXISTS idx_queue_kp ON review_queue(knowledge_point_id);
            "#,
        )?;
        Ok(())
    }

    /// Upsert content, re-running structural validation first so nothing
    /// malformed can be persisted regardless of how the caller obtained it.
    /// Style is not re-judged here: the pipeline checked it against the
    /// template's own lexicon and the verdict travels in `style_check`, so a
    /// store-side re-check with a different lexicon could reject content the
    /// pipeline rightly accepted. An existing row's `created_at` survives
    /// the update.
    pub fn save(&self, content: &ExpertContent) -> Result<()> {
        let payload = serde_json::to_value(content)?;
        let errors = SchemaValidator::new().validate(&payload);
        if !errors.is_empty() {
            let detail = errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(TrapwiseError::Validation(format!(
                "refusing to persist structurally invalid content for {}: {detail}",
                content.knowledge_point_id
            )));
        }

        let json_data = serde_json::to_string(content)?;
        let now = Utc::now().to_rfc3339();
        let db = self.db.lock().expect("store lock");
        db.execute(
            r#"
            INSERT INTO expert_content
            (knowledge_point_id, style_variant, version, json_data, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            ON CONFLICT(knowledge_point_id, style_variant) DO UPDATE SET
                version = excluded.version,
                json_data = excluded.json_data,
                updated_at = excluded.updated_at
            "#,
            params![
                content.knowledge_point_id,
                content.style_variant.as_str(),
                content.version,
                json_data,
                now,
            ],
        )?;
        Ok(())
    }

    /// Fetch content for a knowledge point and variant.
    pub fn get(&self, knowledge_point_id: &str, variant: StyleVariant) -> Result<Option<ExpertContent>> {
        let db = self.db.lock().expect("store lock");
        let json: Option<String> = db
            .query_row(
                "SELECT json_data FROM expert_content
                 WHERE knowledge_point_id = ?1 AND style_variant = ?2",
                params![knowledge_point_id, variant.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// All stored content for one style variant, ordered by knowledge point.
    pub fn get_by_variant(&self, variant: StyleVariant) -> Result<Vec<ExpertContent>> {
        let db = self.db.lock().expect("store lock");
        let mut stmt = db.prepare(
            "SELECT json_data FROM expert_content
             WHERE style_variant = ?1 ORDER BY knowledge_point_id",
        )?;
        let rows = stmt.query_map([variant.as_str()], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for json in rows {
            out.push(serde_json::from_str(&json?)?);
        }
        Ok(out)
    }

    /// All stored content, ordered by knowledge point then variant.
    pub fn list(&self) -> Result<Vec<ExpertContent>> {
        let db = self.db.lock().expect("store lock");
        let mut stmt = db.prepare(
            "SELECT json_data FROM expert_content ORDER BY knowledge_point_id, style_variant",
        )?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut out = Vec::new();
        for json in rows {
            out.push(serde_json::from_str(&json?)?);
        }
        Ok(out)
    }

    /// Best-effort delete. Errors are logged, never surfaced; returns
    /// whether a row was removed.
    pub fn delete(&self, knowledge_point_id: &str, variant: StyleVariant) -> bool {
        let db = self.db.lock().expect("store lock");
        match db.execute(
            "DELETE FROM expert_content
             WHERE knowledge_point_id = ?1 AND style_variant = ?2",
            params![knowledge_point_id, variant.as_str()],
        ) {
            Ok(n) => n > 0,
            Err(e) => {
                error!("failed to delete {knowledge_point_id}/{variant}: {e}");
                false
            }
        }
    }

    /// Insert a review-queue item; returns the assigned row id.
    pub fn add_to_queue(&self, item: &ReviewQueueItem) -> Result<i64> {
        let attempts = serde_json::to_string(&item.attempts)?;
        let db = self.db.lock().expect("store lock");
        db.execute(
            r#"
            INSERT INTO review_queue
            (knowledge_point_id, source_text, style_variant, attempts, status,
             reviewer_notes, created_at, reviewed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                item.knowledge_point_id,
                item.source_text,
                item.style_variant.as_str(),
                attempts,
                item.status.as_str(),
                item.reviewer_notes,
                item.created_at.to_rfc3339(),
                item.reviewed_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(db.last_insert_rowid())
    }

    /// Queue items, optionally filtered by status, oldest first.
    pub fn queue_list(&self, status: Option<ReviewStatus>) -> Result<Vec<ReviewQueueItem>> {
        let db = self.db.lock().expect("store lock");
        let mut items = Vec::new();
        match status {
            Some(status) => {
                let mut stmt = db.prepare(
                    "SELECT id, knowledge_point_id, source_text, style_variant, attempts,
                            status, reviewer_notes, created_at, reviewed_at
                     FROM review_queue WHERE status = ?1 ORDER BY created_at, id",
                )?;
                let rows = stmt.query_map([status.as_str()], row_to_queue_fields)?;
                for row in rows {
                    items.push(queue_item_from_fields(row?)?);
                }
            }
            None => {
                let mut stmt = db.prepare(
                    "SELECT id, knowledge_point_id, source_text, style_variant, attempts,
                            status, reviewer_notes, created_at, reviewed_at
                     FROM review_queue ORDER BY created_at, id",
                )?;
                let rows = stmt.query_map([], row_to_queue_fields)?;
                for row in rows {
                    items.push(queue_item_from_fields(row?)?);
                }
            }
        }
        Ok(items)
    }

    /// Fetch one queue item by row id.
    pub fn queue_get(&self, id: i64) -> Result<Option<ReviewQueueItem>> {
        let db = self.db.lock().expect("store lock");
        let fields = db
            .query_row(
                "SELECT id, knowledge_point_id, source_text, style_variant, attempts,
                        status, reviewer_notes, created_at, reviewed_at
                 FROM review_queue WHERE id = ?1",
                [id],
                row_to_queue_fields,
            )
            .optional()?;
        fields.map(queue_item_from_fields).transpose()
    }

    /// Number of queue items in a given status.
    pub fn count_by_status(&self, status: ReviewStatus) -> Result<u64> {
        let db = self.db.lock().expect("store lock");
        let count: i64 = db.query_row(
            "SELECT COUNT(*) FROM review_queue WHERE status = ?1",
            [status.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Record a reviewer's disposition. Returns false when the id does not
    /// exist.
    pub fn review(
        &self,
        id: i64,
        status: ReviewStatus,
        notes: Option<&str>,
    ) -> Result<bool> {
        let db = self.db.lock().expect("store lock");
        let n = db.execute(
            "UPDATE review_queue
             SET status = ?1, reviewer_notes = ?2, reviewed_at = ?3
             WHERE id = ?4",
            params![status.as_str(), notes, Utc::now().to_rfc3339(), id],
        )?;
        Ok(n > 0)
    }
}

impl ReviewSink for ContentStore {
    fn enqueue(&self, item: ReviewQueueItem) -> Result<()> {
        let id = self.add_to_queue(&item)?;
        if id <= 0 {
            warn!("review queue insert returned row id {id}");
        }
        Ok(())
    }
}

type QueueFields = (
    i64,
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    String,
    Option<String>,
);

fn row_to_queue_fields(row: &rusqlite::Row<'_>) -> rusqlite::Result<QueueFields> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
    ))
}

fn queue_item_from_fields(fields: QueueFields) -> Result<ReviewQueueItem> {
    let (id, knowledge_point_id, source_text, variant, attempts, status, notes, created, reviewed) =
        fields;
    let attempts: Vec<RetryAttempt> = serde_json::from_str(&attempts)?;
    Ok(ReviewQueueItem {
        id: Some(id),
        knowledge_point_id,
        source_text,
        style_variant: variant.parse()?,
        attempts,
        status: status.parse()?,
        reviewer_notes: notes,
        created_at: parse_timestamp(&created)?,
        reviewed_at: reviewed.as_deref().map(parse_timestamp).transpose()?,
    })
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| TrapwiseError::Storage(format!("bad timestamp '{s}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AttemptErrorKind, GenerationRequest};
    use crate::validate::test_fixtures::valid_content;

    fn store() -> ContentStore {
        ContentStore::open_in_memory().unwrap()
    }

    fn queue_item() -> ReviewQueueItem {
        let request = GenerationRequest::new("kp-9", "The loading dose differs.");
        ReviewQueueItem::pending(
            &request,
            vec![
                RetryAttempt::new(1, AttemptErrorKind::MissingFields, "missing traps"),
                RetryAttempt::new(2, AttemptErrorKind::Style, "no register markers"),
            ],
        )
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("trapwise.db");
        let store = ContentStore::open(&path).unwrap();
        store.save(&valid_content()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_save_and_get_round_trip() {
        let store = store();
        let content = valid_content();
        store.save(&content).unwrap();

        let loaded = store
            .get(&content.knowledge_point_id, content.style_variant)
            .unwrap()
            .unwrap();
        assert_eq!(loaded, content);
    }

    #[test]
    fn test_save_is_idempotent_upsert() {
        let store = store();
        let mut content = valid_content();
        store.save(&content).unwrap();

        content.version = "v1.1".to_string();
        store.save(&content).unwrap();

        let all = store.list().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].version, "v1.1");
    }

    #[test]
    fn test_save_rejects_invalid_content() {
        let store = store();
        let mut content = valid_content();
        content.summary = "tiny".to_string();
        let err = store.save(&content).unwrap_err();
        assert!(matches!(err, TrapwiseError::Validation(_)));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_save_accepts_custom_register_content() {
        use crate::validate::{CombinedValidator, StyleLexicon, StyleValidator};

        // Content written for a Chinese-register template: structurally
        // sound, but the built-in English markers never appear.
        let mut content = valid_content();
        content.name = "药物剂量的套路".to_string();
        for trap in &mut content.traps {
            trap.title = "数字坑".to_string();
            trap.pattern = "出题人把 4g 换成 4mg".to_string();
            trap.pitfalls = vec!["克和毫克搞混".to_string()];
            trap.technique = "见数字先画圈".to_string();
            trap.mnemonic = Some("有数字\n先画圈".to_string());
            trap.scenario = None;
        }
        content.tactics = vec!["先画圈".to_string(), "再比对".to_string()];
        for pred in &mut content.predictions {
            pred.stem = "每日最大剂量是多少?".to_string();
            pred.answer = "A".to_string();
            pred.rationale = "4g 上限是常考坑".to_string();
        }
        content.diagram = "剂量上限\n|- 成人: 4g\n`- 肝损: 2g".to_string();
        content.summary = "见到数字先画圈再答题".to_string();
        content.short_summary = None;

        let lexicon = StyleLexicon {
            register_markers: vec!["坑".to_string(), "套路".to_string()],
            ..StyleLexicon::default()
        };
        content.style_check = StyleValidator::with_lexicon(lexicon).check(&content);
        assert!(content.style_check.passed, "{:?}", content.style_check.failure_reasons);
        // The built-in lexicon would have rejected this register.
        assert!(!CombinedValidator::new().validate_content(&content).unwrap().valid);

        let store = store();
        store.save(&content).unwrap();
        let loaded = store
            .get(&content.knowledge_point_id, content.style_variant)
            .unwrap()
            .unwrap();
        assert_eq!(loaded.name, "药物剂量的套路");
        assert!(loaded.style_check.passed);
    }

    #[test]
    fn test_variants_stored_independently() {
        let store = store();
        let content = valid_content();
        store.save(&content).unwrap();

        let mut compact = content.clone();
        compact.style_variant = StyleVariant::Compact;
        store.save(&compact).unwrap();

        assert_eq!(store.list().unwrap().len(), 2);
        assert!(store.get(&content.knowledge_point_id, StyleVariant::Compact).unwrap().is_some());

        let compact_only = store.get_by_variant(StyleVariant::Compact).unwrap();
        assert_eq!(compact_only.len(), 1);
        assert_eq!(compact_only[0].style_variant, StyleVariant::Compact);
    }

    #[test]
    fn test_delete_reports_presence() {
        let store = store();
        let content = valid_content();
        store.save(&content).unwrap();

        assert!(store.delete(&content.knowledge_point_id, content.style_variant));
        assert!(!store.delete(&content.knowledge_point_id, content.style_variant));
    }

    #[test]
    fn test_queue_round_trip() {
        let store = store();
        let id = store.add_to_queue(&queue_item()).unwrap();
        assert!(id > 0);

        let loaded = store.queue_get(id).unwrap().unwrap();
        assert_eq!(loaded.knowledge_point_id, "kp-9");
        assert_eq!(loaded.attempts.len(), 2);
        assert_eq!(loaded.status, ReviewStatus::Pending);
        assert_eq!(loaded.attempts[1].error_kind, AttemptErrorKind::Style);
    }

    #[test]
    fn test_queue_list_filters_by_status() {
        let store = store();
        let id = store.add_to_queue(&queue_item()).unwrap();
        store.add_to_queue(&queue_item()).unwrap();

        assert!(store.review(id, ReviewStatus::Approved, Some("fine")).unwrap());

        let pending = store.queue_list(Some(ReviewStatus::Pending)).unwrap();
        assert_eq!(pending.len(), 1);
        let approved = store.queue_list(Some(ReviewStatus::Approved)).unwrap();
        assert_eq!(approved.len(), 1);
        assert_eq!(approved[0].reviewer_notes.as_deref(), Some("fine"));
        assert!(approved[0].reviewed_at.is_some());
        assert_eq!(store.queue_list(None).unwrap().len(), 2);
        assert_eq!(store.count_by_status(ReviewStatus::Pending).unwrap(), 1);
        assert_eq!(store.count_by_status(ReviewStatus::Rejected).unwrap(), 0);
    }

    #[test]
    fn test_review_unknown_id_is_false() {
        let store = store();
        assert!(!store.review(999, ReviewStatus::Rejected, None).unwrap());
    }
}
