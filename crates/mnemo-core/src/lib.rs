//! MnemoDB Core Library
//!
//! This crate provides the fundamental types, vector math, and error
//! handling shared by every MnemoDB store.
//!
//! # Overview
//!
//! MnemoDB is a cognitive memory engine for AI agents, combining vector
//! similarity, episodic recency, and semantic association into one ranked
//! and validated answer per query.
//!
//! # Modules
//!
//! - `error` - Error types and result alias
//! - `embedding` - Embedding vector math and similarity functions
//! - `temporal` - Millisecond timestamps for recency decay
//! - `types` - Scored results and source tags
//! - `snapshot` - Checksummed snapshot file read/write

pub mod embedding;
pub mod error;
pub mod snapshot;
pub mod temporal;
pub mod types;

pub use embedding::{Embedding, cosine_similarity, dot_product, hash_embedding, normalize_vector};
pub use error::{Error, Result};
pub use snapshot::{read_snapshot, write_snapshot};
pub use temporal::Timestamp;
pub use types::{Metadata, ScoredResult, SourceTag};
