use serde::{Deserialize, Serialize};

const DEFAULT_EMBEDDING_ENDPOINT: &str =
    "https://api-inference.huggingface.co/models/sentence-transformers/all-MiniLM-L6-v2";
const DEFAULT_CATALOG_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Default blend weights: base semantic similarity dominates, pattern
/// features re-rank. Not tuned beyond "works in practice".
const DEFAULT_SEMANTIC_WEIGHT: f32 = 0.6;
const DEFAULT_TITLE_PATTERN_WEIGHT: f32 = 0.2;
const DEFAULT_CONTENT_PATTERN_WEIGHT: f32 = 0.15;
const DEFAULT_SERIES_INDICATOR_WEIGHT: f32 = 0.05;

/// Decision threshold for batches of real model embeddings.
const DEFAULT_DENSE_THRESHOLD: f32 = 0.3;
/// Lenient threshold once fallback embeddings compress similarity values.
const DEFAULT_DEGRADED_THRESHOLD: f32 = 0.1;

/// Configuration for the embedding provider.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Call the remote inference service (fallback-only when false).
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Inference endpoint for the sentence-transformer model.
    #[serde(default = "default_embedding_endpoint")]
    pub endpoint: String,

    /// Per-call timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Delay before the single retry when the model is still loading.
    #[serde(default = "default_loading_retry_delay_ms")]
    pub loading_retry_delay_ms: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: DEFAULT_EMBEDDING_ENDPOINT.to_string(),
            request_timeout_secs: default_request_timeout_secs(),
            loading_retry_delay_ms: default_loading_retry_delay_ms(),
        }
    }
}

/// Configuration for blending and thresholding.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MatchingConfig {
    #[serde(default = "default_semantic_weight")]
    pub semantic_weight: f32,

    #[serde(default = "default_title_pattern_weight")]
    pub title_pattern_weight: f32,

    #[serde(default = "default_content_pattern_weight")]
    pub content_pattern_weight: f32,

    #[serde(default = "default_series_indicator_weight")]
    pub series_indicator_weight: f32,

    #[serde(default = "default_dense_threshold")]
    pub dense_threshold: f32,

    #[serde(default = "default_degraded_threshold")]
    pub degraded_threshold: f32,

    /// Ranked results are truncated to this many entries.
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Candidate embeddings dispatched concurrently.
    #[serde(default = "default_embed_parallelism")]
    pub embed_parallelism: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            semantic_weight: DEFAULT_SEMANTIC_WEIGHT,
            title_pattern_weight: DEFAULT_TITLE_PATTERN_WEIGHT,
            content_pattern_weight: DEFAULT_CONTENT_PATTERN_WEIGHT,
            series_indicator_weight: DEFAULT_SERIES_INDICATOR_WEIGHT,
            dense_threshold: DEFAULT_DENSE_THRESHOLD,
            degraded_threshold: DEFAULT_DEGRADED_THRESHOLD,
            max_results: default_max_results(),
            embed_parallelism: default_embed_parallelism(),
        }
    }
}

/// Configuration for the corpus store and repair pass.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CorpusConfig {
    /// Reference-corpus sample size for the pattern matcher.
    #[serde(default = "default_sample_limit")]
    pub sample_limit: usize,

    /// Delay between remote calls during embedding repair.
    #[serde(default = "default_repair_delay_ms")]
    pub repair_delay_ms: u64,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            sample_limit: default_sample_limit(),
            repair_delay_ms: default_repair_delay_ms(),
        }
    }
}

/// Configuration for the catalog client.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_base_url")]
    pub base_url: String,

    /// Channel listings are cut off here to bound cost.
    #[serde(default = "default_max_channel_videos")]
    pub max_channel_videos: usize,

    /// Delay between listing pages.
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,

    /// Per-call timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_CATALOG_BASE_URL.to_string(),
            max_channel_videos: default_max_channel_videos(),
            page_delay_ms: default_page_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Configuration for feedback ingestion.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FeedbackConfig {
    /// Stored as the seed id when the caller does not supply one.
    #[serde(default = "default_seed_placeholder")]
    pub default_seed_id: String,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            default_seed_id: default_seed_placeholder(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub feedback: FeedbackConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: String,
}

fn default_true() -> bool {
    true
}

fn default_embedding_endpoint() -> String {
    DEFAULT_EMBEDDING_ENDPOINT.to_string()
}

fn default_catalog_base_url() -> String {
    DEFAULT_CATALOG_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    20
}

fn default_loading_retry_delay_ms() -> u64 {
    2000
}

fn default_semantic_weight() -> f32 {
    DEFAULT_SEMANTIC_WEIGHT
}

fn default_title_pattern_weight() -> f32 {
    DEFAULT_TITLE_PATTERN_WEIGHT
}

fn default_content_pattern_weight() -> f32 {
    DEFAULT_CONTENT_PATTERN_WEIGHT
}

fn default_series_indicator_weight() -> f32 {
    DEFAULT_SERIES_INDICATOR_WEIGHT
}

fn default_dense_threshold() -> f32 {
    DEFAULT_DENSE_THRESHOLD
}

fn default_degraded_threshold() -> f32 {
    DEFAULT_DEGRADED_THRESHOLD
}

fn default_max_results() -> usize {
    10
}

fn default_embed_parallelism() -> usize {
    8
}

fn default_sample_limit() -> usize {
    100
}

fn default_repair_delay_ms() -> u64 {
    500
}

fn default_max_channel_videos() -> usize {
    100
}

fn default_page_delay_ms() -> u64 {
    100
}

fn default_seed_placeholder() -> String {
    "unknown".to_string()
}

/// Resolve the data directory: `NEXTPART_BASE_PATH` or the default under
/// the user's home.
pub fn resolve_base_path() -> String {
    std::env::var("NEXTPART_BASE_PATH").unwrap_or_else(|_| {
        let home = homedir::my_home()
            .expect("could not determine home directory")
            .expect("home directory path is empty");
        format!("{}/.local/share/nextpart", home.to_string_lossy())
    })
}

impl Config {
    fn validate(&self) {
        let bounded = [
            ("matching.semantic_weight", self.matching.semantic_weight),
            (
                "matching.title_pattern_weight",
                self.matching.title_pattern_weight,
            ),
            (
                "matching.content_pattern_weight",
                self.matching.content_pattern_weight,
            ),
            (
                "matching.series_indicator_weight",
                self.matching.series_indicator_weight,
            ),
            ("matching.dense_threshold", self.matching.dense_threshold),
            (
                "matching.degraded_threshold",
                self.matching.degraded_threshold,
            ),
        ];
        for (name, value) in bounded {
            if !(0.0..=1.0).contains(&value) {
                panic!("{name} must be between 0.0 and 1.0, got {value}");
            }
        }

        if self.matching.max_results == 0 {
            panic!("matching.max_results must be greater than 0");
        }

        if self.matching.embed_parallelism == 0 {
            panic!("matching.embed_parallelism must be greater than 0");
        }

        if self.corpus.sample_limit == 0 {
            panic!("corpus.sample_limit must be greater than 0");
        }

        if self.embedding.request_timeout_secs == 0 || self.catalog.request_timeout_secs == 0 {
            panic!("request_timeout_secs must be greater than 0");
        }
    }

    pub fn load_with(base_path: &str) -> Self {
        std::fs::create_dir_all(base_path).expect("could not create data directory");

        let config_path = format!("{base_path}/config.yaml");

        // create new if does not exist
        if std::fs::metadata(&config_path).is_err() {
            std::fs::write(&config_path, serde_yml::to_string(&Self::default()).unwrap())
                .expect("could not write default config");
        }

        let config_str = std::fs::read_to_string(&config_path).expect("could not read config");
        let mut config: Self = serde_yml::from_str(&config_str).expect("config is malformed");

        config.base_path = base_path.to_string();

        config.validate();

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config).unwrap() {
            config.save();
        }

        config
    }

    pub fn save(&self) {
        let config_path = format!("{}/config.yaml", self.base_path);
        let config_str = serde_yml::to_string(&self).unwrap();
        std::fs::write(config_path, config_str).expect("could not write config");
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }
}
