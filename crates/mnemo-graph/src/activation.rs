//! Spreading activation traversal

use crate::graph::{ConceptGraph, ConceptId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

/// Tuning for a spreading-activation traversal
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ActivationParams {
    /// Maximum number of hops from any seed (default: 3)
    pub max_hops: usize,

    /// Multiplier applied per hop (default: 0.7)
    pub decay_factor: f32,

    /// Proposals below this level are pruned (default: 0.1)
    pub threshold: f32,
}

impl Default for ActivationParams {
    fn default() -> Self {
        Self {
            max_hops: 3,
            decay_factor: 0.7,
            threshold: 0.1,
        }
    }
}

impl ActivationParams {
    /// Builder: set the hop cap
    pub fn with_max_hops(mut self, max_hops: usize) -> Self {
        self.max_hops = max_hops;
        self
    }

    /// Builder: set the per-hop decay factor
    pub fn with_decay_factor(mut self, decay_factor: f32) -> Self {
        self.decay_factor = decay_factor;
        self
    }

    /// Builder: set the pruning threshold
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }
}

impl ConceptGraph {
    /// Spread activation outward from seed concepts
    ///
    /// All stored activations are reset first. Known seeds enter the
    /// frontier at 1.0; unknown seed names are skipped. Each edge proposes
    /// `parent * decay_factor * weight` to its target; proposals below the
    /// threshold are pruned, and a node reached along several paths keeps
    /// the maximum proposal, not the sum.
    ///
    /// Traversal is breadth-first with first-visit expansion: a node is
    /// enqueued the first time it is reached and expands with that
    /// activation, so a stronger path found later raises its stored level
    /// but does not propagate further. Final levels are written back to the
    /// nodes; the returned list (seeds included) is sorted descending.
    pub fn spread_activation(
        &mut self,
        seeds: &[String],
        params: &ActivationParams,
    ) -> Vec<(String, f32)> {
        self.reset_activations();

        let mut activations: HashMap<ConceptId, f32> = HashMap::new();
        let mut visited: HashSet<ConceptId> = HashSet::new();

        // BFS frontier: (concept, hops from seed, activation at first visit)
        let mut frontier: VecDeque<(ConceptId, usize, f32)> = VecDeque::new();

        for seed in seeds {
            if let Some(id) = self.id_of(seed) {
                frontier.push_back((id, 0, 1.0));
                activations.insert(id, 1.0);
                visited.insert(id);
            }
        }

        while let Some((current, hops, activation)) = frontier.pop_front() {
            if hops >= params.max_hops {
                continue;
            }

            let edges = match self.nodes.get(current.0 as usize) {
                Some(node) => node.edges.clone(),
                None => continue,
            };

            for (neighbor, edge_weight) in edges {
                let new_activation = activation * params.decay_factor * edge_weight;

                if new_activation < params.threshold {
                    continue;
                }

                let entry = activations.entry(neighbor).or_insert(0.0);
                if new_activation > *entry {
                    *entry = new_activation;
                }

                if visited.insert(neighbor) {
                    frontier.push_back((neighbor, hops + 1, new_activation));
                }
            }
        }

        for (&id, &activation) in &activations {
            if let Some(node) = self.nodes.get_mut(id.0 as usize) {
                node.activation = activation;
            }
        }

        let mut results: Vec<(String, f32)> = activations
            .iter()
            .filter_map(|(&id, &activation)| {
                self.nodes
                    .get(id.0 as usize)
                    .map(|node| (node.name.clone(), activation))
            })
            .collect();

        results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

        debug!(
            "Activated {} concepts from {} seeds",
            results.len(),
            seeds.len()
        );

        results
    }
}
