//! MnemoDB Cognitive Engine
//!
//! Ties the vector index, episodic memory and concept graph together
//! behind one query pipeline with evidence fusion, hallucination
//! detection and explanation traces.
//!
//! # Modules
//!
//! - `config` - Engine configuration
//! - `engine` - The pipeline orchestrator and its request/response types

pub mod config;
pub mod engine;

pub use config::EngineConfig;
pub use engine::{
    BatchDocument, BatchOutcome, CognitiveEngine, EngineStats, QueryOptions, QueryResponse,
};
