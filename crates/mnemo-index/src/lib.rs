//! MnemoDB Vector Index
//!
//! Approximate nearest-neighbor retrieval over document embeddings.
//!
//! # Overview
//!
//! A hand-built HNSW proximity graph stores L2-normalized vectors in
//! inner-product space, wrapped by a document layer that owns ids, content,
//! and metadata. Removal tombstones slots; persistence writes a checksummed
//! ANN snapshot plus a JSON sidecar of document records.
//!
//! # Modules
//!
//! - `hnsw` - The layered proximity graph
//! - `index` - Document-level index, configuration, persistence

pub mod hnsw;
pub mod index;

pub use hnsw::{HnswGraph, HnswNode};
pub use index::{DocumentRecord, IndexStats, SearchResult, VectorIndex, VectorIndexConfig};
