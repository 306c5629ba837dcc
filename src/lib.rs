//! MnemoDB - Cognitive retrieval engine
//!
//! This is the main library crate that re-exports all MnemoDB components.

pub use mnemo_core as core;
pub use mnemo_engine as engine;
pub use mnemo_graph as graph;
pub use mnemo_index as index;
pub use mnemo_memory as memory;
pub use mnemo_reason as reason;

// Re-export commonly used types
pub use mnemo_core::{Embedding, Error, Metadata, Result, ScoredResult, SourceTag, Timestamp};

pub use mnemo_engine::{CognitiveEngine, EngineConfig, QueryOptions, QueryResponse};
pub use mnemo_graph::{ActivationParams, ConceptGraph};
pub use mnemo_index::{VectorIndex, VectorIndexConfig};
pub use mnemo_memory::{Episode, EpisodicMemory};
pub use mnemo_reason::{EvidenceFusion, Explanation, FusionWeights, HallucinationDetector};
