//! # Chronicle
//!
//! A corpus retrieval engine for historical question answering.
//!
//! Chronicle turns a plain-text knowledge corpus into a persisted pair
//! of artifacts — an exact-L2 flat vector index and a chunk mapping —
//! and answers queries by nearest-neighbor search over them. The
//! retrieved context block is handed to a downstream prompt-assembly and
//! generation layer, which is outside this crate.
//!
//! ## Architecture
//!
//! ```text
//! offline (one-shot batch job)              online (per request)
//! ┌────────┐  ┌──────────────┐  ┌─────────────────┐
//! │ corpus │─▶│ chunk + embed │─▶│  blob storage    │
//! │ (blob) │  │  IndexBuilder │  │ {index, mapping} │
//! └────────┘  └──────────────┘  └───────┬─────────┘
//!                                       │ lazy load, once
//!                                       ▼
//!                 query ──▶ embed ──▶ ┌───────────┐
//!                                     │ Retriever │──▶ context block
//!                                     └───────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`storage`] | Blob storage boundary (S3-compatible + in-memory) |
//! | [`embedding`] | Embedding service boundary (OpenAI-compatible HTTP) |
//! | [`builder`] | Offline index construction and artifact upload |
//! | [`retriever`] | Lazily loaded online retrieval cache |
//!
//! Pure algorithms (chunking, the flat index, the mapping codec, the
//! nearest-neighbor search) live in the `chronicle-core` crate.

pub mod builder;
pub mod config;
pub mod embedding;
pub mod retriever;
pub mod storage;
