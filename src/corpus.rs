//! Corpus records, the feedback log, and their CSV-backed store.
//!
//! The corpus holds (text, embedding) records that double as training
//! signal for the pattern matcher and as the duplicate-detection index for
//! negative feedback. Records are immutable once written except for
//! embedding repair, and are never deleted. The feedback log is a separate
//! append-only table.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::CatalogVideo;
use crate::embedding::{QualityReport, TextEmbedder};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusRecord {
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub channel_id: String,
    /// Catalog timestamp, passed through verbatim.
    pub published_at: String,
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

/// Feature bag attached to a feedback record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackFeatures {
    pub feedback_type: String,
    pub stored_as_negative_example: bool,
    pub already_exists: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRecord {
    /// Seed the judgment refers to, or the configured placeholder.
    pub seed_video_id: String,
    pub candidate_video_id: String,
    pub is_related: bool,
    pub features: FeedbackFeatures,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub trait CorpusStore: Send + Sync {
    fn get(&self, video_id: &str) -> Option<CorpusRecord>;
    fn exists(&self, video_id: &str) -> bool;

    /// Insert unless a record with the same id is already present; returns
    /// whether the record was inserted. The whole check-and-insert happens
    /// under one write lock, making this the duplicate-prevention boundary.
    fn insert_if_absent(&self, record: CorpusRecord) -> Result<bool, StoreError>;

    /// Insert or replace, keyed by `video_id`.
    fn upsert(&self, record: CorpusRecord) -> Result<(), StoreError>;

    /// Replace the embedding of an existing record. Returns false when the
    /// id is unknown.
    fn update_embedding(&self, video_id: &str, embedding: Vec<f32>) -> Result<bool, StoreError>;

    /// Bounded sample used as the pattern reference corpus.
    fn sample(&self, limit: usize) -> Vec<CorpusRecord>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn append_feedback(&self, record: FeedbackRecord) -> Result<(), StoreError>;

    /// Most recent feedback record for a candidate id, by timestamp.
    fn latest_feedback_for(&self, candidate_video_id: &str) -> Option<FeedbackRecord>;

    fn feedback_records(&self) -> Vec<FeedbackRecord>;
}

/// Build a corpus record by embedding the item text.
pub fn record_from_video(
    embedder: &dyn TextEmbedder,
    video: &CatalogVideo,
) -> (CorpusRecord, QualityReport) {
    let input = format!("{} {}", video.title, video.description);
    let embedding = embedder.embed(&input);
    let quality = QualityReport::analyze(&embedding);

    let record = CorpusRecord {
        video_id: video.id.clone(),
        title: video.title.clone(),
        description: video.description.clone(),
        channel_id: video.channel_id.clone(),
        published_at: video.published_at.clone(),
        embedding,
        created_at: Utc::now(),
    };

    (record, quality)
}

/// Quality-checked store: embed the item text, log the classification,
/// upsert keyed by video id.
pub fn embed_and_upsert(
    store: &dyn CorpusStore,
    embedder: &dyn TextEmbedder,
    video: &CatalogVideo,
) -> Result<QualityReport, StoreError> {
    let (record, quality) = record_from_video(embedder, video);
    log::info!(
        "storing {} with {:?} embedding ({})",
        video.id,
        quality.kind,
        quality.details
    );

    store.upsert(record)?;
    Ok(quality)
}

const CORPUS_HEADERS: [&str; 7] = [
    "video_id",
    "title",
    "description",
    "channel_id",
    "published_at",
    "embedding",
    "created_at",
];

const FEEDBACK_HEADERS: [&str; 7] = [
    "seed_video_id",
    "candidate_video_id",
    "is_related",
    "feedback_type",
    "stored_as_negative_example",
    "already_exists",
    "timestamp",
];

/// CSV-backed store: `corpus.csv` and `feedback.csv` under the data
/// directory, mirrored in memory behind read-write locks. Embeddings are
/// stored as a JSON array column.
#[derive(Debug, Clone, Default)]
pub struct CsvStore {
    records: Arc<RwLock<Vec<CorpusRecord>>>,
    feedback: Arc<RwLock<Vec<FeedbackRecord>>>,
    corpus_path: PathBuf,
    feedback_path: PathBuf,
}

impl CsvStore {
    pub fn load(base_dir: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(base_dir)?;

        let corpus_path = base_dir.join("corpus.csv");
        let feedback_path = base_dir.join("feedback.csv");

        ensure_file(&corpus_path, &CORPUS_HEADERS)?;
        ensure_file(&feedback_path, &FEEDBACK_HEADERS)?;

        let mut records = vec![];
        let mut reader = csv::Reader::from_path(&corpus_path)?;
        for row in reader.records() {
            records.push(parse_corpus_row(&row?)?);
        }

        let mut feedback = vec![];
        let mut reader = csv::Reader::from_path(&feedback_path)?;
        for row in reader.records() {
            feedback.push(parse_feedback_row(&row?)?);
        }

        log::debug!(
            "loaded {} corpus records and {} feedback records",
            records.len(),
            feedback.len()
        );

        Ok(CsvStore {
            records: Arc::new(RwLock::new(records)),
            feedback: Arc::new(RwLock::new(feedback)),
            corpus_path,
            feedback_path,
        })
    }

    fn persist_corpus(&self, records: &[CorpusRecord]) -> Result<(), StoreError> {
        let temp_path = self.corpus_path.with_extension("csv-tmp");

        let mut writer = csv::Writer::from_path(&temp_path)?;
        writer.write_record(CORPUS_HEADERS)?;
        for record in records {
            writer.write_record([
                record.video_id.as_str(),
                record.title.as_str(),
                record.description.as_str(),
                record.channel_id.as_str(),
                record.published_at.as_str(),
                &serde_json::to_string(&record.embedding).expect("serializable floats"),
                &record.created_at.to_rfc3339(),
            ])?;
        }
        writer.flush()?;
        drop(writer);

        std::fs::rename(&temp_path, &self.corpus_path)?;
        Ok(())
    }

    fn persist_feedback_row(&self, record: &FeedbackRecord) -> Result<(), StoreError> {
        let file = std::fs::OpenOptions::new()
            .append(true)
            .open(&self.feedback_path)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer.write_record([
            record.seed_video_id.as_str(),
            record.candidate_video_id.as_str(),
            &record.is_related.to_string(),
            record.features.feedback_type.as_str(),
            &record.features.stored_as_negative_example.to_string(),
            &record.features.already_exists.to_string(),
            &record.timestamp.to_rfc3339(),
        ])?;
        writer.flush()?;
        Ok(())
    }
}

fn ensure_file(path: &Path, headers: &[&str]) -> anyhow::Result<()> {
    if let Err(err) = std::fs::metadata(path) {
        match err.kind() {
            ErrorKind::NotFound => {
                log::info!("creating {}", path.display());
                let mut writer = csv::Writer::from_path(path)?;
                writer.write_record(headers)?;
                writer.flush()?;
            }
            _ => Err(err)?,
        }
    }
    Ok(())
}

fn parse_corpus_row(row: &csv::StringRecord) -> anyhow::Result<CorpusRecord> {
    let field = |idx: usize, name: &str| -> anyhow::Result<&str> {
        row.get(idx).ok_or(anyhow!("missing corpus column {name}"))
    };

    Ok(CorpusRecord {
        video_id: field(0, "video_id")?.to_string(),
        title: field(1, "title")?.to_string(),
        description: field(2, "description")?.to_string(),
        channel_id: field(3, "channel_id")?.to_string(),
        published_at: field(4, "published_at")?.to_string(),
        embedding: serde_json::from_str(field(5, "embedding")?)?,
        created_at: DateTime::parse_from_rfc3339(field(6, "created_at")?)?.with_timezone(&Utc),
    })
}

fn parse_feedback_row(row: &csv::StringRecord) -> anyhow::Result<FeedbackRecord> {
    let field = |idx: usize, name: &str| -> anyhow::Result<&str> {
        row.get(idx).ok_or(anyhow!("missing feedback column {name}"))
    };

    Ok(FeedbackRecord {
        seed_video_id: field(0, "seed_video_id")?.to_string(),
        candidate_video_id: field(1, "candidate_video_id")?.to_string(),
        is_related: field(2, "is_related")?.parse()?,
        features: FeedbackFeatures {
            feedback_type: field(3, "feedback_type")?.to_string(),
            stored_as_negative_example: field(4, "stored_as_negative_example")?.parse()?,
            already_exists: field(5, "already_exists")?.parse()?,
        },
        timestamp: DateTime::parse_from_rfc3339(field(6, "timestamp")?)?.with_timezone(&Utc),
    })
}

impl CorpusStore for CsvStore {
    fn get(&self, video_id: &str) -> Option<CorpusRecord> {
        self.records
            .read()
            .unwrap()
            .iter()
            .find(|r| r.video_id == video_id)
            .cloned()
    }

    fn exists(&self, video_id: &str) -> bool {
        self.records
            .read()
            .unwrap()
            .iter()
            .any(|r| r.video_id == video_id)
    }

    fn insert_if_absent(&self, record: CorpusRecord) -> Result<bool, StoreError> {
        let mut records = self.records.write().unwrap();
        if records.iter().any(|r| r.video_id == record.video_id) {
            return Ok(false);
        }

        records.push(record);
        self.persist_corpus(&records)?;
        Ok(true)
    }

    fn upsert(&self, record: CorpusRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().unwrap();
        match records.iter().position(|r| r.video_id == record.video_id) {
            Some(idx) => records[idx] = record,
            None => records.push(record),
        }

        self.persist_corpus(&records)
    }

    fn update_embedding(&self, video_id: &str, embedding: Vec<f32>) -> Result<bool, StoreError> {
        let mut records = self.records.write().unwrap();
        let Some(record) = records.iter_mut().find(|r| r.video_id == video_id) else {
            return Ok(false);
        };
        record.embedding = embedding;

        self.persist_corpus(&records)?;
        Ok(true)
    }

    fn sample(&self, limit: usize) -> Vec<CorpusRecord> {
        self.records
            .read()
            .unwrap()
            .iter()
            .take(limit)
            .cloned()
            .collect()
    }

    fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    fn append_feedback(&self, record: FeedbackRecord) -> Result<(), StoreError> {
        let mut feedback = self.feedback.write().unwrap();
        self.persist_feedback_row(&record)?;
        feedback.push(record);
        Ok(())
    }

    fn latest_feedback_for(&self, candidate_video_id: &str) -> Option<FeedbackRecord> {
        self.feedback
            .read()
            .unwrap()
            .iter()
            .filter(|r| r.candidate_video_id == candidate_video_id)
            .max_by_key(|r| r.timestamp)
            .cloned()
    }

    fn feedback_records(&self) -> Vec<FeedbackRecord> {
        self.feedback.read().unwrap().clone()
    }
}
