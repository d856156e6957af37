//! Offline index construction.
//!
//! Batch and non-incremental: every build recomputes the full index from
//! the full corpus. There is no delta/append mode. The pipeline fails
//! fast — a violated precondition or an embedding failure aborts with no
//! partial artifacts written.
//!
//! ```text
//! corpus blob ──▶ chunk ──▶ embed (sequential) ──▶ FlatIndex + mapping
//!                                                       │
//!                                   local files ◀───────┘
//!                                       │
//!                                       ▼ upload
//!                              {index, mapping} blobs
//! ```

use tracing::info;

use chronicle_core::chunk::split_sentences;
use chronicle_core::error::{Error, Result};
use chronicle_core::index::FlatIndex;
use chronicle_core::mapping::ChunkMapping;

use crate::config::Config;
use crate::embedding::Embedder;
use crate::storage::BlobStore;

/// Outcome of a completed build, for reporting.
#[derive(Debug)]
pub struct BuildSummary {
    pub chunks: usize,
    pub dims: usize,
    pub index_object: String,
    pub mapping_object: String,
}

/// Chunk and embed a corpus into a flat index and its chunk mapping.
///
/// Chunks are embedded one at a time, in corpus order, so index position
/// *i* always holds chunk *i*'s vector.
///
/// # Errors
///
/// - [`Error::Precondition`] — the corpus yields zero chunks, or the
///   embedder returns zero vectors.
/// - [`Error::DimensionMismatch`] — an embedding disagrees with the
///   first one's dimensionality.
/// - [`Error::Upstream`] — an embedding call failed; nothing is retried
///   and nothing partial is kept.
pub async fn build_artifacts(
    corpus: &str,
    max_words: usize,
    embedder: &dyn Embedder,
) -> Result<(FlatIndex, ChunkMapping)> {
    let chunks = split_sentences(corpus, max_words);
    if chunks.is_empty() {
        return Err(Error::Precondition(
            "corpus produced no chunks; is the corpus file empty?".to_string(),
        ));
    }
    info!(chunks = chunks.len(), max_words, "chunked corpus");

    let vectors = embedder
        .embed_batch(&chunks)
        .await
        .map_err(Error::upstream)?;
    if vectors.is_empty() {
        return Err(Error::Precondition(
            "embedder returned no vectors".to_string(),
        ));
    }

    let mut index = FlatIndex::new(vectors[0].len())?;
    for vector in &vectors {
        index.add(vector)?;
    }

    info!(
        vectors = index.len(),
        dim = index.dim(),
        model = embedder.model_name(),
        "built flat index"
    );

    Ok((index, ChunkMapping::from_chunks(chunks)))
}

/// Run the full one-shot build job: download the corpus, build both
/// artifacts, write them to local files, and upload them.
pub async fn run_build(
    config: &Config,
    store: &dyn BlobStore,
    embedder: &dyn Embedder,
) -> Result<BuildSummary> {
    let corpus = store
        .download_text(&config.storage.corpus_object)
        .await
        .map_err(Error::upstream)?;

    let (index, mapping) = build_artifacts(&corpus, config.chunking.max_words, embedder).await?;

    let work_dir = std::env::temp_dir();
    let index_path = work_dir.join(local_artifact_name(&config.storage.index_object));
    let mapping_path = work_dir.join(local_artifact_name(&config.storage.mapping_object));

    std::fs::write(&index_path, index.to_bytes()).map_err(Error::upstream)?;
    std::fs::write(&mapping_path, mapping.serialize()).map_err(Error::upstream)?;

    store
        .upload_from_local(&index_path, &config.storage.index_object)
        .await
        .map_err(Error::upstream)?;
    store
        .upload_from_local(&mapping_path, &config.storage.mapping_object)
        .await
        .map_err(Error::upstream)?;

    let _ = std::fs::remove_file(&index_path);
    let _ = std::fs::remove_file(&mapping_path);

    info!(
        index = %config.storage.index_object,
        mapping = %config.storage.mapping_object,
        "uploaded artifacts"
    );

    Ok(BuildSummary {
        chunks: mapping.len(),
        dims: index.dim(),
        index_object: config.storage.index_object.clone(),
        mapping_object: config.storage.mapping_object.clone(),
    })
}

/// Unique local scratch name for an artifact, so concurrent processes
/// sharing a temp directory cannot clobber each other.
pub(crate) fn local_artifact_name(object: &str) -> String {
    format!(
        "chronicle-{}-{}",
        std::process::id(),
        object.replace(['/', '\\'], "-")
    )
}
