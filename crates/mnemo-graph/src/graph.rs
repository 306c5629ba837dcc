//! Concept graph implementation
//!
//! Named concepts live in a dense arena indexed by `ConceptId`; edges are
//! directed, weighted, and stored per source node. Names are the public
//! handle, ids are the internal one.

use mnemo_core::{Embedding, Error, Result, cosine_similarity};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Concept identifier, an index into the graph's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConceptId(pub(crate) u32);

impl ConceptId {
    /// Get as raw index
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

/// A named concept node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Concept {
    /// Unique concept name
    pub name: String,

    /// Optional embedding for similarity lookup
    pub embedding: Option<Embedding>,

    /// Outgoing weighted edges
    pub edges: Vec<(ConceptId, f32)>,

    /// Activation from the most recent traversal
    pub activation: f32,
}

/// Snapshot payload for persistence
#[derive(Serialize, Deserialize)]
struct GraphSnapshot {
    nodes: Vec<Concept>,
}

/// Directed weighted graph of named concepts
#[derive(Debug, Clone, Default)]
pub struct ConceptGraph {
    pub(crate) nodes: Vec<Concept>,
    name_to_id: HashMap<String, ConceptId>,
}

impl ConceptGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Node Operations ==========

    /// Add a concept, returning its id
    ///
    /// Idempotent: re-adding an existing name returns the existing id and
    /// changes nothing, the stored embedding included.
    pub fn add_node(&mut self, name: &str, embedding: Option<Embedding>) -> ConceptId {
        if let Some(&id) = self.name_to_id.get(name) {
            return id;
        }

        let id = ConceptId(self.nodes.len() as u32);
        self.nodes.push(Concept {
            name: name.to_string(),
            embedding,
            edges: Vec::new(),
            activation: 0.0,
        });
        self.name_to_id.insert(name.to_string(), id);
        debug!("Added concept '{}' as {:?}", name, id);
        id
    }

    /// Add a directed weighted edge
    ///
    /// Missing endpoints are auto-created without an embedding; an existing
    /// edge has its weight overwritten.
    pub fn add_edge(&mut self, source: &str, target: &str, weight: f32) {
        let source_id = self.add_node(source, None);
        let target_id = self.add_node(target, None);

        if let Some(node) = self.nodes.get_mut(source_id.0 as usize) {
            match node.edges.iter_mut().find(|(t, _)| *t == target_id) {
                Some((_, w)) => *w = weight,
                None => node.edges.push((target_id, weight)),
            }
        }
    }

    /// Look up a concept by name
    pub fn get_node(&self, name: &str) -> Option<&Concept> {
        self.name_to_id
            .get(name)
            .and_then(|id| self.nodes.get(id.0 as usize))
    }

    /// Whether a concept with this name exists
    pub fn contains(&self, name: &str) -> bool {
        self.name_to_id.contains_key(name)
    }

    /// Number of concepts
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of directed edges
    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|n| n.edges.len()).sum()
    }

    /// True when the graph has no concepts
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drop all concepts and edges
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.name_to_id.clear();
    }

    pub(crate) fn id_of(&self, name: &str) -> Option<ConceptId> {
        self.name_to_id.get(name).copied()
    }

    // ========== Similarity ==========

    /// Rank embedded concepts by cosine similarity to a query embedding
    ///
    /// Concepts without an embedding never match. Returns `(name,
    /// similarity)` pairs at or above `threshold`, best first, at most
    /// `top_k` of them.
    pub fn find_similar_concepts(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        threshold: f32,
    ) -> Result<Vec<(String, f32)>> {
        let mut matches = Vec::new();

        for node in &self.nodes {
            let Some(embedding) = &node.embedding else {
                continue;
            };
            let similarity = cosine_similarity(query_embedding, embedding)?;
            if similarity >= threshold {
                matches.push((node.name.clone(), similarity));
            }
        }

        matches.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        matches.truncate(top_k);

        Ok(matches)
    }

    // ========== Activation Maintenance ==========

    /// Multiply every stored activation by `rate`
    pub fn decay_activations(&mut self, rate: f32) {
        for node in &mut self.nodes {
            node.activation *= rate;
        }
    }

    /// Zero every stored activation
    pub fn reset_activations(&mut self) {
        for node in &mut self.nodes {
            node.activation = 0.0;
        }
    }

    // ========== Persistence ==========

    /// Save the graph arena
    pub fn save(&self, path: &Path) -> Result<()> {
        let snapshot = GraphSnapshot {
            nodes: self.nodes.clone(),
        };
        mnemo_core::write_snapshot(path, &snapshot)?;

        info!(
            "Saved concept graph ({} nodes, {} edges) to {}",
            self.node_count(),
            self.edge_count(),
            path.display()
        );
        Ok(())
    }

    /// Load a graph saved by [`ConceptGraph::save`]
    ///
    /// The name lookup map is rebuilt from the arena. Constructs a fresh
    /// graph; a failed load leaves any existing graph untouched.
    pub fn load(path: &Path) -> Result<ConceptGraph> {
        let snapshot: GraphSnapshot = mnemo_core::read_snapshot(path)?;

        let node_count = snapshot.nodes.len() as u32;
        let mut name_to_id = HashMap::with_capacity(snapshot.nodes.len());

        for (index, node) in snapshot.nodes.iter().enumerate() {
            for (target, _) in &node.edges {
                if target.0 >= node_count {
                    return Err(Error::SnapshotCorrupt(format!(
                        "concept '{}' has an edge to missing id {}",
                        node.name, target.0
                    )));
                }
            }
            if name_to_id
                .insert(node.name.clone(), ConceptId(index as u32))
                .is_some()
            {
                return Err(Error::SnapshotCorrupt(format!(
                    "duplicate concept name '{}'",
                    node.name
                )));
            }
        }

        info!(
            "Loaded concept graph ({} nodes) from {}",
            snapshot.nodes.len(),
            path.display()
        );

        Ok(ConceptGraph {
            nodes: snapshot.nodes,
            name_to_id,
        })
    }
}
