//! Engine wiring the matching core to its collaborators.
//!
//! Owns the outward-facing operations: resolve a seed reference into a
//! ranked series listing, pass judgments to the feedback ingestor, and run
//! the embedding repair pass. Collaborators sit behind traits so tests can
//! wire in stubs.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};

use crate::catalog::{extract_video_id, VideoCatalog, YouTubeCatalog};
use crate::config::Config;
use crate::corpus::{embed_and_upsert, CorpusStore, CsvStore};
use crate::embedding::{Embedder, QualityReport, TextEmbedder};
use crate::feedback::{FeedbackIngestor, FeedbackOutcome, FeedbackStats, FeedbackStatus};
use crate::patterns::PatternModel;
use crate::resolver::{MatchResult, SeriesResolver};

pub struct Engine {
    config: Config,
    store: Arc<dyn CorpusStore>,
    catalog: Arc<dyn VideoCatalog>,
    embedder: Arc<dyn TextEmbedder>,
    resolver: SeriesResolver,
    feedback: FeedbackIngestor,
}

impl Engine {
    /// Build an engine with the default collaborators.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let store: Arc<dyn CorpusStore> = Arc::new(
            CsvStore::load(Path::new(config.base_path())).context("could not open corpus store")?,
        );
        let catalog: Arc<dyn VideoCatalog> = Arc::new(YouTubeCatalog::new(&config.catalog));
        let embedder: Arc<dyn TextEmbedder> = Arc::new(Embedder::new(&config.embedding));

        Ok(Self::with_parts(config, store, catalog, embedder))
    }

    /// Wire an engine from explicit collaborators.
    pub fn with_parts(
        config: Config,
        store: Arc<dyn CorpusStore>,
        catalog: Arc<dyn VideoCatalog>,
        embedder: Arc<dyn TextEmbedder>,
    ) -> Self {
        let resolver = SeriesResolver::new(embedder.clone(), config.matching.clone());
        let feedback = FeedbackIngestor::new(
            store.clone(),
            catalog.clone(),
            embedder.clone(),
            config.feedback.default_seed_id.clone(),
        );

        Self {
            config,
            store,
            catalog,
            embedder,
            resolver,
            feedback,
        }
    }

    /// Find series siblings for a seed video URL or id.
    ///
    /// An empty return value means "no series match found"; failures to
    /// parse the reference or to reach the catalog are errors, so the two
    /// outcomes stay distinguishable.
    pub fn find_series(&self, seed_ref: &str) -> anyhow::Result<Vec<MatchResult>> {
        let video_id = extract_video_id(seed_ref)
            .with_context(|| format!("unrecognized video reference: {seed_ref}"))?;

        let seed = self
            .catalog
            .video_details(&video_id)
            .context("could not fetch seed video details")?
            .with_context(|| format!("video {video_id} not found in catalog"))?;
        log::info!("seed: {} ({})", seed.title, seed.channel_title);

        let pool = self
            .catalog
            .channel_videos(&seed.channel_id)
            .context("could not list the creator's channel")?;
        if pool.is_empty() {
            bail!("no videos found for channel {}", seed.channel_id);
        }
        log::info!("analyzing {} videos from {}", pool.len(), seed.channel_title);

        let sample = self.store.sample(self.config.corpus.sample_limit);
        if sample.is_empty() {
            log::warn!("reference corpus is empty, matching on semantic similarity only");
        } else {
            log::info!("using {} reference records for pattern matching", sample.len());
        }
        let patterns = PatternModel::from_records(&sample);

        Ok(self.resolver.resolve(&seed, &pool, &patterns))
    }

    /// Recompute embeddings for low-quality records, scanning up to
    /// `limit` of them. Returns the number rewritten.
    ///
    /// Sleeps between remote calls to stay inside provider quotas.
    pub fn repair_embeddings(&self, limit: usize) -> anyhow::Result<usize> {
        let delay = Duration::from_millis(self.config.corpus.repair_delay_ms);
        let records = self.store.sample(limit);
        let mut repaired = 0;

        for record in &records {
            let quality = QualityReport::analyze(&record.embedding);
            if quality.is_dense() {
                continue;
            }

            log::info!("repairing embedding for {} ({})", record.video_id, quality.details);
            let input = format!("{} {}", record.title, record.description);
            let embedding = self.embedder.embed(&input);

            match self.store.update_embedding(&record.video_id, embedding) {
                Ok(true) => repaired += 1,
                Ok(false) => log::warn!("record {} missing during repair", record.video_id),
                Err(err) => return Err(err).context("could not rewrite repaired embedding"),
            }

            std::thread::sleep(delay);
        }

        log::info!("repaired {repaired} of {} scanned embeddings", records.len());
        Ok(repaired)
    }

    /// Fetch an item from the catalog and store it as a corpus example.
    pub fn store_video(&self, reference: &str) -> anyhow::Result<()> {
        let video_id = extract_video_id(reference)
            .with_context(|| format!("unrecognized video reference: {reference}"))?;

        let video = self
            .catalog
            .video_details(&video_id)
            .context("could not fetch video details")?
            .with_context(|| format!("video {video_id} not found in catalog"))?;

        embed_and_upsert(self.store.as_ref(), self.embedder.as_ref(), &video)
            .context("could not store video")?;
        Ok(())
    }

    pub fn submit_feedback(
        &self,
        video_id: &str,
        is_relevant: bool,
        title: &str,
        seed_id: Option<&str>,
    ) -> FeedbackOutcome {
        self.feedback.submit(video_id, is_relevant, title, seed_id)
    }

    pub fn feedback_status(&self, video_id: &str) -> FeedbackStatus {
        self.feedback.status(video_id)
    }

    pub fn feedback_stats(&self) -> FeedbackStats {
        self.feedback.stats()
    }

    pub fn corpus_size(&self) -> usize {
        self.store.len()
    }
}
