//! Online retrieval over the persisted artifacts.
//!
//! [`Retriever`] owns the process-wide retrieval cache as an explicit
//! object: the flat index, the chunk mapping, and the embedder handle.
//! The cache is populated on first use behind an exclusive
//! initialization guard — concurrent first callers block while exactly
//! one load runs — and is never invalidated afterwards. A rebuilt corpus
//! takes effect on process restart, not at runtime.
//!
//! A failed load leaves the cache empty, so the next call retries the
//! full fetch; no half-initialized state is ever retained.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{info, warn};

use chronicle_core::error::{Error, Result};
use chronicle_core::index::FlatIndex;
use chronicle_core::mapping::ChunkMapping;
use chronicle_core::search::{compose_context, nearest_passages, Passage};

use crate::builder::local_artifact_name;
use crate::config::Config;
use crate::embedding::Embedder;
use crate::storage::BlobStore;

/// Artifacts held in memory for the process lifetime.
#[derive(Debug)]
pub struct LoadedIndex {
    pub index: FlatIndex,
    pub mapping: ChunkMapping,
}

/// Lazily loaded retrieval engine.
pub struct Retriever {
    store: Arc<dyn BlobStore>,
    embedder: Arc<dyn Embedder>,
    index_object: String,
    mapping_object: String,
    top_k: usize,
    cache: OnceCell<LoadedIndex>,
}

impl Retriever {
    pub fn new(config: &Config, store: Arc<dyn BlobStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            store,
            embedder,
            index_object: config.storage.index_object.clone(),
            mapping_object: config.storage.mapping_object.clone(),
            top_k: config.retrieval.top_k,
            cache: OnceCell::new(),
        }
    }

    /// Configured default result count.
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Load the persisted artifacts if not already resident.
    ///
    /// Idempotent: the first call downloads and deserializes the index
    /// and mapping; later calls return the cached state without touching
    /// storage. Concurrent first calls are serialized so exactly one
    /// load executes.
    pub async fn ensure_loaded(&self) -> Result<&LoadedIndex> {
        self.cache.get_or_try_init(|| self.load()).await
    }

    /// Explicitly populate the cache ahead of the first query.
    pub async fn warm_up(&self) -> Result<()> {
        self.ensure_loaded().await.map(|_| ())
    }

    async fn load(&self) -> Result<LoadedIndex> {
        let local_index: PathBuf =
            std::env::temp_dir().join(local_artifact_name(&self.index_object));

        self.store
            .download_to_local(&self.index_object, &local_index)
            .await
            .map_err(Error::upstream)?;

        let bytes = std::fs::read(&local_index).map_err(Error::upstream)?;
        let _ = std::fs::remove_file(&local_index);
        let index = FlatIndex::from_bytes(&bytes)?;

        if index.dim() != self.embedder.dims() {
            return Err(Error::DimensionMismatch {
                expected: self.embedder.dims(),
                actual: index.dim(),
            });
        }

        let mapping_text = self
            .store
            .download_text(&self.mapping_object)
            .await
            .map_err(Error::upstream)?;
        let mapping = ChunkMapping::parse(&mapping_text);

        if mapping.len() < index.len() {
            warn!(
                index_len = index.len(),
                mapping_len = mapping.len(),
                "mapping covers fewer chunks than the index; some hits will be skipped"
            );
        }

        info!(
            vectors = index.len(),
            passages = mapping.len(),
            dim = index.dim(),
            "retrieval cache loaded"
        );

        Ok(LoadedIndex { index, mapping })
    }

    /// Embed `query` and return the `top_k` nearest passages.
    ///
    /// Returns at most `top_k` passages; fewer (including zero) when hit
    /// ids are unresolvable through the mapping.
    pub async fn retrieve_passages(&self, query: &str, top_k: usize) -> Result<Vec<Passage>> {
        let loaded = self.ensure_loaded().await?;
        let query_vec = self.embedder.embed(query).await.map_err(Error::upstream)?;
        nearest_passages(&loaded.index, &loaded.mapping, &query_vec, top_k)
    }

    /// Retrieve the composed context block for `query` using the
    /// configured default `top_k`.
    ///
    /// An empty context is a valid result; the downstream
    /// prompt-assembly layer must handle it.
    pub async fn retrieve(&self, query: &str) -> Result<String> {
        let passages = self.retrieve_passages(query, self.top_k).await?;
        Ok(compose_context(&passages))
    }
}
