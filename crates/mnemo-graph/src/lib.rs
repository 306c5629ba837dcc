//! Semantic concept graph with spreading activation
//!
//! A directed, weighted graph over named concepts. Nodes may carry an
//! embedding for similarity lookup, and [`ConceptGraph::spread_activation`]
//! propagates relevance outward from seed concepts through weighted edges
//! with per-hop decay.

pub mod activation;
pub mod graph;

pub use activation::ActivationParams;
pub use graph::{Concept, ConceptGraph, ConceptId};
