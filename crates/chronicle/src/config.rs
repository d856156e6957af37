use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub storage: StorageConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    pub embedding: EmbeddingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Bucket holding the corpus and both persisted artifacts.
    pub bucket: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint for S3-compatible services (MinIO, LocalStack).
    #[serde(default)]
    pub endpoint_url: Option<String>,
    #[serde(default = "default_corpus_object")]
    pub corpus_object: String,
    #[serde(default = "default_index_object")]
    pub index_object: String,
    #[serde(default = "default_mapping_object")]
    pub mapping_object: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_words")]
    pub max_words: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_words: default_max_words(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// Embeddings endpoint URL (OpenAI-compatible `/v1/embeddings`).
    pub endpoint: String,
    pub model: String,
    /// Vector dimensionality, fixed per model version. Must match
    /// between build time and query time.
    pub dims: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_region() -> String {
    "us-east-1".to_string()
}
fn default_corpus_object() -> String {
    "knowledge.txt".to_string()
}
fn default_index_object() -> String {
    "corpus.index".to_string()
}
fn default_mapping_object() -> String {
    "mapping.txt".to_string()
}
fn default_max_words() -> usize {
    chronicle_core::chunk::DEFAULT_MAX_WORDS
}
fn default_top_k() -> usize {
    3
}
fn default_timeout_secs() -> u64 {
    30
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.storage.bucket.is_empty() {
        anyhow::bail!("storage.bucket must not be empty");
    }

    if config.chunking.max_words == 0 {
        anyhow::bail!("chunking.max_words must be > 0");
    }

    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }

    if config.embedding.dims == 0 {
        anyhow::bail!("embedding.dims must be > 0");
    }

    if config.embedding.model.is_empty() {
        anyhow::bail!("embedding.model must not be empty");
    }

    if config.embedding.endpoint.is_empty() {
        anyhow::bail!("embedding.endpoint must not be empty");
    }

    Ok(config)
}
