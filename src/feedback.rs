//! User feedback ingestion and statistics.
//!
//! Positive judgments are recorded for analysis only. Negative judgments
//! additionally turn the candidate into a corpus record, so future
//! matching is biased away from similar content. A candidate id is never
//! written into the corpus twice, no matter how many times it is voted
//! down.
//!
//! Submission is best-effort: catalog and store failures are logged and
//! reflected in the returned outcome, never raised to the calling flow.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::catalog::VideoCatalog;
use crate::corpus::{
    record_from_video, CorpusStore, FeedbackFeatures, FeedbackRecord, StoreError,
};
use crate::embedding::TextEmbedder;

const THUMBS_UP: &str = "thumbs_up";
const THUMBS_DOWN: &str = "thumbs_down";

/// What happened to a submitted judgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackOutcome {
    /// Positive judgment recorded; the corpus is untouched.
    Recorded,
    /// Negative judgment stored as a brand-new negative example.
    StoredNegativeExample,
    /// Negative judgment for a candidate already present in the corpus.
    AlreadyExists,
    /// Catalog or store failure; the judgment was recorded as far as
    /// possible.
    Degraded,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackStatus {
    pub has_feedback: bool,
    /// `"up"` or `"down"`, from the most recent judgment.
    pub feedback_type: Option<String>,
    pub already_in_database: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FeedbackStats {
    pub total_feedback: usize,
    pub thumbs_up: usize,
    pub thumbs_down: usize,
    pub negative_examples_stored: usize,
}

pub struct FeedbackIngestor {
    store: Arc<dyn CorpusStore>,
    catalog: Arc<dyn VideoCatalog>,
    embedder: Arc<dyn TextEmbedder>,
    /// Stored as the seed id when the caller does not supply one.
    seed_placeholder: String,
}

impl FeedbackIngestor {
    pub fn new(
        store: Arc<dyn CorpusStore>,
        catalog: Arc<dyn VideoCatalog>,
        embedder: Arc<dyn TextEmbedder>,
        seed_placeholder: String,
    ) -> Self {
        Self {
            store,
            catalog,
            embedder,
            seed_placeholder,
        }
    }

    /// Record a relevance judgment for a candidate video.
    pub fn submit(
        &self,
        candidate_id: &str,
        is_relevant: bool,
        title: &str,
        seed_id: Option<&str>,
    ) -> FeedbackOutcome {
        log::info!(
            "feedback: video {candidate_id} is {}",
            if is_relevant { "relevant" } else { "NOT relevant" }
        );

        if is_relevant {
            let features = FeedbackFeatures {
                feedback_type: THUMBS_UP.to_string(),
                stored_as_negative_example: false,
                already_exists: false,
            };
            return match self.append(candidate_id, seed_id, true, features) {
                Ok(()) => FeedbackOutcome::Recorded,
                Err(_) => FeedbackOutcome::Degraded,
            };
        }

        if self.store.exists(candidate_id) {
            log::info!(
                "video {candidate_id} already in corpus, skipping duplicate storage: {}",
                truncate(title, 60)
            );
            return self.record_already_exists(candidate_id, seed_id);
        }

        let video = match self.catalog.video_details(candidate_id) {
            Ok(Some(video)) => video,
            Ok(None) => {
                log::warn!("video {candidate_id} not found in catalog, negative example skipped");
                return FeedbackOutcome::Degraded;
            }
            Err(err) => {
                log::warn!("could not fetch details for negative example: {err}");
                return FeedbackOutcome::Degraded;
            }
        };

        let (record, quality) = record_from_video(self.embedder.as_ref(), &video);
        match self.store.insert_if_absent(record) {
            Ok(true) => {
                log::info!(
                    "new negative example stored ({:?}): {}",
                    quality.kind,
                    truncate(&video.title, 60)
                );
                let features = FeedbackFeatures {
                    feedback_type: THUMBS_DOWN.to_string(),
                    stored_as_negative_example: true,
                    already_exists: false,
                };
                // The example itself landed; lost metadata is already
                // logged by append.
                let _ = self.append(candidate_id, seed_id, false, features);
                FeedbackOutcome::StoredNegativeExample
            }
            // Lost a concurrent race: same as the pre-check firing.
            Ok(false) => self.record_already_exists(candidate_id, seed_id),
            Err(err) => {
                log::warn!("could not store negative example: {err}");
                FeedbackOutcome::Degraded
            }
        }
    }

    /// Feedback state for one candidate id.
    pub fn status(&self, candidate_id: &str) -> FeedbackStatus {
        let already_in_database = self.store.exists(candidate_id);
        let latest = self.store.latest_feedback_for(candidate_id);

        FeedbackStatus {
            has_feedback: latest.is_some(),
            feedback_type: latest.map(|r| {
                if r.is_related {
                    "up".to_string()
                } else {
                    "down".to_string()
                }
            }),
            already_in_database,
        }
    }

    /// Aggregate counts over the feedback log.
    pub fn stats(&self) -> FeedbackStats {
        let records = self.store.feedback_records();

        FeedbackStats {
            total_feedback: records.len(),
            thumbs_up: records.iter().filter(|r| r.is_related).count(),
            thumbs_down: records.iter().filter(|r| !r.is_related).count(),
            negative_examples_stored: records
                .iter()
                .filter(|r| r.features.stored_as_negative_example)
                .count(),
        }
    }

    fn record_already_exists(&self, candidate_id: &str, seed_id: Option<&str>) -> FeedbackOutcome {
        let features = FeedbackFeatures {
            feedback_type: THUMBS_DOWN.to_string(),
            stored_as_negative_example: false,
            already_exists: true,
        };
        match self.append(candidate_id, seed_id, false, features) {
            Ok(()) => FeedbackOutcome::AlreadyExists,
            Err(_) => FeedbackOutcome::Degraded,
        }
    }

    fn append(
        &self,
        candidate_id: &str,
        seed_id: Option<&str>,
        is_related: bool,
        features: FeedbackFeatures,
    ) -> Result<(), StoreError> {
        let record = FeedbackRecord {
            seed_video_id: seed_id.unwrap_or(&self.seed_placeholder).to_string(),
            candidate_video_id: candidate_id.to_string(),
            is_related,
            features,
            timestamp: Utc::now(),
        };

        self.store.append_feedback(record).inspect_err(|err| {
            log::warn!("could not store feedback metadata: {err}");
        })
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
