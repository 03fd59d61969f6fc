//! CSV store round-trip and invariant tests.

use chrono::Utc;

use crate::corpus::{
    CorpusRecord, CorpusStore, CsvStore, FeedbackFeatures, FeedbackRecord,
};
use crate::embedding::EMBEDDING_DIM;

fn record(id: &str, title: &str) -> CorpusRecord {
    let mut embedding = vec![0.0f32; EMBEDDING_DIM];
    embedding[3] = 0.5;
    embedding[17] = -0.25;

    CorpusRecord {
        video_id: id.to_string(),
        title: title.to_string(),
        description: "a description, with a comma and \"quotes\"".to_string(),
        channel_id: "chan1".to_string(),
        published_at: "2024-05-01T12:00:00Z".to_string(),
        embedding,
        created_at: Utc::now(),
    }
}

fn feedback(candidate: &str, is_related: bool) -> FeedbackRecord {
    FeedbackRecord {
        seed_video_id: "unknown".to_string(),
        candidate_video_id: candidate.to_string(),
        is_related,
        features: FeedbackFeatures {
            feedback_type: if is_related { "thumbs_up" } else { "thumbs_down" }.to_string(),
            stored_as_negative_example: !is_related,
            already_exists: false,
        },
        timestamp: Utc::now(),
    }
}

#[test]
fn test_corpus_round_trip_across_reload() {
    let dir = tempfile::tempdir().unwrap();

    {
        let store = CsvStore::load(dir.path()).unwrap();
        store.upsert(record("vid1", "First")).unwrap();
        store.upsert(record("vid2", "Second")).unwrap();
    }

    let reloaded = CsvStore::load(dir.path()).unwrap();
    assert_eq!(reloaded.len(), 2);

    let first = reloaded.get("vid1").unwrap();
    assert_eq!(first.title, "First");
    assert_eq!(first.description, "a description, with a comma and \"quotes\"");
    assert_eq!(first.embedding.len(), EMBEDDING_DIM);
    assert_eq!(first.embedding[3], 0.5);
    assert_eq!(first.embedding[17], -0.25);
}

#[test]
fn test_upsert_replaces_by_id() {
    let dir = tempfile::tempdir().unwrap();
    let store = CsvStore::load(dir.path()).unwrap();

    store.upsert(record("vid1", "Original")).unwrap();
    store.upsert(record("vid1", "Replacement")).unwrap();

    assert_eq!(store.len(), 1);
    assert_eq!(store.get("vid1").unwrap().title, "Replacement");
}

#[test]
fn test_insert_if_absent_refuses_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    let store = CsvStore::load(dir.path()).unwrap();

    assert!(store.insert_if_absent(record("vid1", "First write")).unwrap());
    assert!(!store.insert_if_absent(record("vid1", "Second write")).unwrap());

    assert_eq!(store.len(), 1);
    assert_eq!(store.get("vid1").unwrap().title, "First write");
}

#[test]
fn test_exists_and_get() {
    let dir = tempfile::tempdir().unwrap();
    let store = CsvStore::load(dir.path()).unwrap();

    assert!(!store.exists("vid1"));
    assert!(store.get("vid1").is_none());

    store.upsert(record("vid1", "Here")).unwrap();
    assert!(store.exists("vid1"));
    assert!(store.get("vid1").is_some());
}

#[test]
fn test_update_embedding() {
    let dir = tempfile::tempdir().unwrap();
    let store = CsvStore::load(dir.path()).unwrap();
    store.upsert(record("vid1", "First")).unwrap();

    let replacement = vec![0.1f32; EMBEDDING_DIM];
    assert!(store.update_embedding("vid1", replacement.clone()).unwrap());
    assert!(!store.update_embedding("missing", replacement.clone()).unwrap());

    // The rewrite also lands on disk.
    let reloaded = CsvStore::load(dir.path()).unwrap();
    assert_eq!(reloaded.get("vid1").unwrap().embedding, replacement);
}

#[test]
fn test_sample_is_bounded() {
    let dir = tempfile::tempdir().unwrap();
    let store = CsvStore::load(dir.path()).unwrap();

    for i in 0..7 {
        store.upsert(record(&format!("vid{i}"), "Bulk")).unwrap();
    }

    assert_eq!(store.sample(3).len(), 3);
    assert_eq!(store.sample(100).len(), 7);
}

#[test]
fn test_feedback_append_round_trip() {
    let dir = tempfile::tempdir().unwrap();

    {
        let store = CsvStore::load(dir.path()).unwrap();
        store.append_feedback(feedback("vid1", false)).unwrap();
        store.append_feedback(feedback("vid1", true)).unwrap();
        store.append_feedback(feedback("vid2", true)).unwrap();
    }

    let reloaded = CsvStore::load(dir.path()).unwrap();
    let records = reloaded.feedback_records();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].candidate_video_id, "vid1");
    assert!(!records[0].is_related);
    assert!(records[0].features.stored_as_negative_example);
    assert_eq!(records[0].features.feedback_type, "thumbs_down");

    // Most recent judgment for vid1 is the thumbs-up.
    let latest = reloaded.latest_feedback_for("vid1").unwrap();
    assert!(latest.is_related);

    assert!(reloaded.latest_feedback_for("vid3").is_none());
}

#[test]
fn test_load_creates_files() {
    let dir = tempfile::tempdir().unwrap();
    let _store = CsvStore::load(dir.path()).unwrap();

    assert!(dir.path().join("corpus.csv").exists());
    assert!(dir.path().join("feedback.csv").exists());
}
