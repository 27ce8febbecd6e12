//! End-to-end pipeline tests: generator, retry loop, review queue, and store
//! wired together over a scripted backend.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};

use trapwise::backend::MockBackend;
use trapwise::domain::{AttemptErrorKind, GenerationRequest, ReviewStatus, StyleVariant};
use trapwise::generate::{ContentGenerator, RetryConfig, RetryOrchestrator};
use trapwise::storage::ContentStore;
use trapwise::template::TemplateStore;

/// A payload that passes both validation stages once the generator stamps
/// identity fields onto it.
fn good_payload() -> Value {
    json!({
        "name": "Warfarin interactions",
        "traps": [
            {
                "title": "Interaction trap",
                "pattern": "the examiner pairs warfarin with a common antibiotic",
                "pitfalls": ["missing the CYP inhibition", "forgetting INR monitoring"],
                "technique": "scan the option list for enzyme inhibitors first",
                "mnemonic": "new drug added\ncheck the INR"
            },
            {
                "title": "Reversal trap",
                "pattern": "vitamin K and fresh frozen plasma swapped in urgency",
                "pitfalls": ["choosing the slow fix in an emergency"],
                "technique": "match the fix to the bleeding severity, reflex-style",
                "scenario": "imagine the patient actively bleeding on the table"
            },
            {
                "title": "Bridging trap",
                "pattern": "the stem hides a mechanical valve in the history",
                "pitfalls": ["stopping anticoagulation outright"],
                "technique": "hunt the history for valves before answering",
                "mnemonic": "metal valve\nnever naked"
            }
        ],
        "tactics": [
            "scan options for enzyme inhibitors",
            "match reversal speed to bleeding severity",
            "check the history for valves"
        ],
        "predictions": [
            {
                "stem": "Which drug most increases bleeding risk with warfarin?",
                "answer": "B",
                "rationale": "the macrolide is the repeat-offender interaction"
            },
            {
                "stem": "Best immediate management of major bleeding on warfarin?",
                "answer": "D",
                "rationale": "speed beats elegance when the INR is critical"
            }
        ],
        "diagram": "warfarin\n|- interactions: CYP inhibitors\n|- reversal: vit K vs FFP\n`- bridging: mechanical valves",
        "summary": "New drug, check INR",
        "short_summary": "Interactions raise INR; reverse by severity",
        "version": "v1.0",
        "style_variant": "default"
    })
}

fn missing_predictions() -> Value {
    let mut payload = good_payload();
    payload.as_object_mut().unwrap().remove("predictions");
    payload
}

fn short_summary() -> Value {
    let mut payload = good_payload();
    payload["summary"] = json!("INR");
    payload
}

fn pipeline(
    backend: MockBackend,
    config: RetryConfig,
) -> (ContentGenerator, Arc<ContentStore>) {
    let store = Arc::new(ContentStore::open_in_memory().unwrap());
    let generator = ContentGenerator::new(
        Arc::new(TemplateStore::new()),
        Arc::new(backend),
        RetryOrchestrator::with_sink(config, store.clone()),
    );
    (generator, store)
}

fn fast_config(min: u32, max: u32) -> RetryConfig {
    RetryConfig {
        min_retries: min,
        max_retries: max,
        retry_delay: Duration::from_millis(1),
        backend_timeout: Duration::from_secs(5),
    }
}

// Guards the fixture itself: every other test in this file assumes that a
// stamped good_payload clears both validation stages.
#[test]
fn fixture_passes_combined_validation() {
    let mut payload = good_payload();
    let map = payload.as_object_mut().unwrap();
    map.insert("knowledge_point_id".to_string(), json!("kp-000"));
    map.insert("source_text".to_string(), json!("Warfarin is a vitamin K antagonist."));

    let result = trapwise::validate::CombinedValidator::new().validate(&payload);
    assert!(result.valid, "{}", result.joined_errors());
}

#[tokio::test]
async fn recovers_after_invalid_first_attempt() {
    let backend = MockBackend::new(vec![missing_predictions(), good_payload()]);
    let (generator, store) = pipeline(backend, fast_config(2, 3));
    let request = GenerationRequest::new("kp-101", "Warfarin is a vitamin K antagonist.");

    let result = generator.generate(&request).await.unwrap();

    assert!(result.success);
    assert_eq!(result.retry_count, 2);
    assert!(result.style_check.passed);
    let content = result.content.unwrap();
    assert_eq!(content.knowledge_point_id, "kp-101");
    assert_eq!(content.source_text, "Warfarin is a vitamin K antagonist.");

    // Recovered runs never touch the review queue.
    assert!(store.queue_list(None).unwrap().is_empty());
}

#[tokio::test]
async fn exhausted_run_queues_exactly_once() {
    let backend = MockBackend::new(vec![short_summary(), short_summary()]);
    let (generator, store) = pipeline(backend, fast_config(2, 2));
    let request = GenerationRequest::new("kp-102", "Source for a stubborn failure.");

    let result = generator.generate(&request).await.unwrap();

    assert!(!result.success);
    assert!(result.content.is_none());
    assert_eq!(result.retry_count, 2);
    assert!(result.error.as_deref().unwrap().contains("queued for review"));

    let items = store.queue_list(Some(ReviewStatus::Pending)).unwrap();
    assert_eq!(items.len(), 1);
    let item = &items[0];
    assert_eq!(item.knowledge_point_id, "kp-102");
    assert_eq!(item.attempts.len(), 2);
    assert_eq!(item.attempts[0].attempt_number, 1);
    assert_eq!(item.attempts[1].attempt_number, 2);
    for attempt in &item.attempts {
        assert_eq!(attempt.error_kind, AttemptErrorKind::Schema);
        assert!(attempt.error_details.contains("summary"));
    }
}

#[tokio::test]
async fn queued_item_can_be_dispositioned() {
    let backend = MockBackend::new(vec![short_summary(), short_summary()]);
    let (generator, store) = pipeline(backend, fast_config(2, 2));
    let request = GenerationRequest::new("kp-103", "source");
    generator.generate(&request).await.unwrap();

    let id = store.queue_list(None).unwrap()[0].id.unwrap();
    assert!(store.review(id, ReviewStatus::Rejected, Some("needs a rewrite")).unwrap());

    let item = store.queue_get(id).unwrap().unwrap();
    assert_eq!(item.status, ReviewStatus::Rejected);
    assert_eq!(item.reviewer_notes.as_deref(), Some("needs a rewrite"));
    assert!(item.reviewed_at.is_some());
    assert!(store.queue_list(Some(ReviewStatus::Pending)).unwrap().is_empty());
}

#[tokio::test]
async fn batch_preserves_order_and_isolates_failures() {
    // kp-a succeeds first try, kp-b exhausts twice, kp-c succeeds first try.
    let backend = MockBackend::new(vec![
        good_payload(),
        short_summary(),
        short_summary(),
        good_payload(),
    ]);
    let (generator, store) = pipeline(backend, fast_config(2, 2));

    let requests = vec![
        GenerationRequest::new("kp-a", "first source"),
        GenerationRequest::new("kp-b", "second source"),
        GenerationRequest::new("kp-c", "third source"),
    ];
    let batch = generator.generate_batch(&requests).await;

    assert_eq!(batch.total, 3);
    assert_eq!(batch.success, 2);
    assert_eq!(batch.failed, 1);
    let ids: Vec<&str> = batch
        .results
        .iter()
        .map(|e| e.knowledge_point_id.as_str())
        .collect();
    assert_eq!(ids, ["kp-a", "kp-b", "kp-c"]);
    assert!(batch.results[0].success);
    assert!(!batch.results[1].success);
    assert!(batch.results[2].success);

    let queued = store.queue_list(None).unwrap();
    assert_eq!(queued.len(), 1);
    assert_eq!(queued[0].knowledge_point_id, "kp-b");
}

#[tokio::test]
async fn generated_content_persists_and_updates() {
    let backend = MockBackend::new(vec![good_payload(), good_payload()]);
    let (generator, store) = pipeline(backend, fast_config(2, 3));
    let request = GenerationRequest::new("kp-104", "source text");

    let first = generator.generate(&request).await.unwrap().content.unwrap();
    store.save(&first).unwrap();

    // A regeneration for the same key overwrites rather than duplicating.
    let mut second = generator.generate(&request).await.unwrap().content.unwrap();
    second.version = "v1.1".to_string();
    store.save(&second).unwrap();

    let all = store.list().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].version, "v1.1");
    assert_eq!(
        store
            .get("kp-104", StyleVariant::Default)
            .unwrap()
            .unwrap()
            .version,
        "v1.1"
    );
}

#[tokio::test]
async fn backend_failures_count_as_attempts() {
    let backend = MockBackend::with_results(vec![
        Err("rate limited".to_string()),
        Ok(good_payload()),
    ]);
    let (generator, store) = pipeline(backend, fast_config(2, 3));
    let request = GenerationRequest::new("kp-105", "source");

    let result = generator.generate(&request).await.unwrap();
    assert!(result.success);
    assert_eq!(result.retry_count, 2);
    assert!(store.queue_list(None).unwrap().is_empty());
}
