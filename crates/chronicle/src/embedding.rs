//! Embedding service collaborator.
//!
//! [`Embedder`] is the boundary to the external embedding model; the
//! production implementation, [`HttpEmbedder`], calls an
//! OpenAI-compatible `/v1/embeddings` endpoint.
//!
//! Failures are not retried here. A failed call aborts the enclosing
//! operation and propagates to the caller, which owns retry policy — a
//! partially embedded corpus would produce a silently incomplete index,
//! which is worse than a clean abort.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::EmbeddingConfig;

/// Maps text to a fixed-dimension vector in semantic space.
///
/// `dims` is fixed per model version and must match between build-time
/// and query-time embeddings; a mismatch is fatal at index-build or
/// index-load time.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;

    /// Vector dimensionality.
    fn dims(&self) -> usize;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch, semantically equivalent to per-item calls issued
    /// sequentially. The first failure aborts the whole batch.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Debug, Deserialize)]
struct EmbedData {
    embedding: Vec<f32>,
}

/// Embedder backed by an OpenAI-compatible embeddings endpoint.
pub struct HttpEmbedder {
    endpoint: String,
    model: String,
    dims: usize,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpEmbedder {
    /// Environment variable holding the bearer token for the endpoint.
    pub const API_KEY_VAR: &'static str = "EMBEDDING_API_KEY";

    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            dims: config.dims,
            api_key: std::env::var(Self::API_KEY_VAR).ok(),
            client,
        })
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(model = %self.model, len = text.len(), "embedding text");

        let body = EmbedRequest {
            model: &self.model,
            input: text,
        };

        let mut req = self.client.post(&self.endpoint).json(&body);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await.context("Embedding request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            bail!(
                "Embedding API error {}: {}",
                status,
                body_text.chars().take(500).collect::<String>()
            );
        }

        let parsed: EmbedResponse = resp
            .json()
            .await
            .context("Failed to parse embedding response")?;

        let vector = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| anyhow::anyhow!("Embedding response contained no vectors"))?;

        if vector.len() != self.dims {
            bail!(
                "Embedding model '{}' returned {} dimensions, expected {}",
                self.model,
                vector.len(),
                self.dims
            );
        }

        Ok(vector)
    }
}
