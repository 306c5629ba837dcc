//! Hierarchical navigable small world graph
//!
//! Layered proximity graph over a slot-addressed node arena. Vectors are
//! expected to be L2-normalized so that inner-product distance equals
//! `1 - cosine`. Removal tombstones a slot: dead nodes keep their edges and
//! stay navigable as waypoints, they are only excluded from search results.
//! Slots are assigned monotonically and never reused.

use mnemo_core::dot_product;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

/// A node in the HNSW graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HnswNode {
    /// Slot of this node in the arena
    pub slot: u32,

    /// The stored vector (L2-normalized)
    pub vector: Vec<f32>,

    /// Top layer this node participates in
    pub level: usize,

    /// Neighbor slots per layer (index 0 = ground layer)
    pub neighbors: Vec<Vec<u32>>,

    /// False once the slot has been tombstoned
    pub alive: bool,
}

impl HnswNode {
    fn new(slot: u32, vector: Vec<f32>, level: usize, max_level: usize) -> Self {
        let level = level.min(max_level);
        Self {
            slot,
            vector,
            level,
            neighbors: vec![Vec::new(); level + 1],
            alive: true,
        }
    }
}

/// Candidate for the min-heap (closest first)
#[derive(Debug, Clone, PartialEq)]
struct Candidate {
    distance: f32,
    slot: u32,
}

impl Eq for Candidate {}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for min-heap behavior
        other
            .distance
            .partial_cmp(&self.distance)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Candidate for the max-heap (furthest first)
#[derive(Debug, Clone, PartialEq)]
struct MaxCandidate {
    distance: f32,
    slot: u32,
}

impl Eq for MaxCandidate {}

impl Ord for MaxCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .partial_cmp(&other.distance)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for MaxCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Inner-product distance between two unit vectors
///
/// Equals `1 - cosine` when both sides are L2-normalized.
pub(crate) fn ip_distance(a: &[f32], b: &[f32]) -> f32 {
    1.0 - dot_product(a, b)
}

/// The layered proximity graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HnswGraph {
    /// Maximum connections per node per layer
    m: usize,

    /// Candidate list size during construction
    ef_construction: usize,

    /// Maximum number of layers
    max_level: usize,

    /// Level generation multiplier, 1 / ln(m)
    ml: f32,

    /// Node arena, indexed by slot
    nodes: Vec<HnswNode>,

    /// Entry point slot (highest-level node, kept even when tombstoned)
    entry_point: Option<u32>,

    /// Current maximum level in the graph
    current_max_level: usize,
}

impl HnswGraph {
    /// Create an empty graph
    pub fn new(m: usize, ef_construction: usize, max_level: usize, ml: f32) -> Self {
        Self {
            m,
            ef_construction,
            max_level,
            ml,
            nodes: Vec::new(),
            entry_point: None,
            current_max_level: 0,
        }
    }

    /// Number of slots ever assigned, tombstones included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when no vector was ever inserted
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of live (not tombstoned) nodes
    pub fn alive_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.alive).count()
    }

    /// Whether the slot exists and has not been tombstoned
    pub fn is_alive(&self, slot: u32) -> bool {
        self.nodes
            .get(slot as usize)
            .map(|n| n.alive)
            .unwrap_or(false)
    }

    /// Get a node by slot
    pub fn node(&self, slot: u32) -> Option<&HnswNode> {
        self.nodes.get(slot as usize)
    }

    /// Generate a random level for a new node
    fn random_level(&self) -> usize {
        let mut level = 0;
        let threshold = self.ml;

        while rand_float() < threshold && level < self.max_level {
            level += 1;
        }

        level
    }

    /// Insert a vector, returning its assigned slot
    ///
    /// The caller is responsible for dimension checks and normalization.
    pub fn insert(&mut self, vector: Vec<f32>) -> u32 {
        let slot = self.nodes.len() as u32;
        let node_level = self.random_level();
        self.nodes
            .push(HnswNode::new(slot, vector, node_level, self.max_level));

        // First node just becomes the entry point
        let Some(mut ep) = self.entry_point else {
            self.entry_point = Some(slot);
            self.current_max_level = node_level;
            return slot;
        };

        let query = match self.nodes.get(slot as usize) {
            Some(node) => node.vector.clone(),
            None => return slot,
        };
        let current_max = self.current_max_level;

        // Phase 1: greedy descent through layers above the node's level
        for layer in (node_level + 1..=current_max).rev() {
            let nearest = self.search_layer(&query, ep, 1, layer);
            if let Some(candidate) = nearest.first() {
                ep = candidate.slot;
            }
        }

        // Phase 2: connect on layers 0..=node_level
        for layer in (0..=node_level.min(current_max)).rev() {
            let candidates = self.search_layer(&query, ep, self.ef_construction, layer);

            let max_connections = if layer == 0 { self.m * 2 } else { self.m };
            let selected: Vec<u32> = candidates
                .iter()
                .take(max_connections)
                .map(|c| c.slot)
                .collect();

            self.add_connections(slot, &selected, layer);

            if let Some(candidate) = candidates.first() {
                ep = candidate.slot;
            }
        }

        // A node above the current top layer becomes the new entry point
        if node_level > current_max {
            self.entry_point = Some(slot);
            self.current_max_level = node_level;
        }

        slot
    }

    /// Search for the k nearest live neighbors of a query vector
    ///
    /// Returns `(slot, distance)` pairs sorted by distance ascending.
    /// Tombstoned nodes are traversed but never returned.
    pub fn search(&self, query: &[f32], k: usize, ef: usize) -> Vec<(u32, f32)> {
        let Some(entry) = self.entry_point else {
            return Vec::new();
        };

        // Phase 1: greedy descent from the top layer down to layer 1
        let mut ep = entry;
        for layer in (1..=self.current_max_level).rev() {
            let nearest = self.search_layer(query, ep, 1, layer);
            if let Some(candidate) = nearest.first() {
                ep = candidate.slot;
            }
        }

        // Phase 2: bounded sweep at layer 0
        let candidates = self.search_layer(query, ep, ef, 0);

        candidates
            .into_iter()
            .filter(|c| self.is_alive(c.slot))
            .take(k)
            .map(|c| (c.slot, c.distance))
            .collect()
    }

    /// Search a single layer starting from an entry slot
    fn search_layer(&self, query: &[f32], entry: u32, ef: usize, layer: usize) -> Vec<Candidate> {
        let Some(entry_node) = self.nodes.get(entry as usize) else {
            return Vec::new();
        };

        let entry_dist = ip_distance(query, &entry_node.vector);

        let mut visited: HashSet<u32> = HashSet::new();
        visited.insert(entry);

        // Min-heap of nodes to expand (closest first)
        let mut candidates: BinaryHeap<Candidate> = BinaryHeap::new();
        candidates.push(Candidate {
            distance: entry_dist,
            slot: entry,
        });

        // Max-heap of the ef best results seen so far (furthest first)
        let mut results: BinaryHeap<MaxCandidate> = BinaryHeap::new();
        results.push(MaxCandidate {
            distance: entry_dist,
            slot: entry,
        });

        while let Some(current) = candidates.pop() {
            let furthest_dist = results.peek().map(|r| r.distance).unwrap_or(f32::INFINITY);

            if current.distance > furthest_dist && results.len() >= ef {
                break;
            }

            let Some(current_node) = self.nodes.get(current.slot as usize) else {
                continue;
            };

            if layer >= current_node.neighbors.len() {
                continue;
            }

            for &neighbor in &current_node.neighbors[layer] {
                if visited.contains(&neighbor) {
                    continue;
                }
                visited.insert(neighbor);

                let Some(neighbor_node) = self.nodes.get(neighbor as usize) else {
                    continue;
                };

                let dist = ip_distance(query, &neighbor_node.vector);
                let furthest_dist = results.peek().map(|r| r.distance).unwrap_or(f32::INFINITY);

                if dist < furthest_dist || results.len() < ef {
                    candidates.push(Candidate {
                        distance: dist,
                        slot: neighbor,
                    });
                    results.push(MaxCandidate {
                        distance: dist,
                        slot: neighbor,
                    });

                    while results.len() > ef {
                        results.pop();
                    }
                }
            }
        }

        let mut result_vec: Vec<Candidate> = results
            .into_iter()
            .map(|mc| Candidate {
                distance: mc.distance,
                slot: mc.slot,
            })
            .collect();

        result_vec.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap_or(Ordering::Equal));

        result_vec
    }

    /// Add bidirectional connections between a node and its selected neighbors
    fn add_connections(&mut self, slot: u32, neighbors: &[u32], layer: usize) {
        // Forward edges
        if let Some(node) = self.nodes.get_mut(slot as usize) {
            if layer < node.neighbors.len() {
                for &neighbor in neighbors {
                    if !node.neighbors[layer].contains(&neighbor) {
                        node.neighbors[layer].push(neighbor);
                    }
                }
            }
        }

        let Some(node_vec) = self.nodes.get(slot as usize).map(|n| n.vector.clone()) else {
            return;
        };

        let m = if layer == 0 { self.m * 2 } else { self.m };

        // Reverse edges, pruning the neighbor's list when it overflows
        for &neighbor in neighbors {
            let overflowed = match self.nodes.get_mut(neighbor as usize) {
                Some(node) if layer < node.neighbors.len() => {
                    if !node.neighbors[layer].contains(&slot) {
                        node.neighbors[layer].push(slot);
                    }
                    node.neighbors[layer].len() > m
                }
                _ => continue,
            };

            if overflowed {
                let (neighbor_vec, connections) = match self.nodes.get(neighbor as usize) {
                    Some(node) => (node.vector.clone(), node.neighbors[layer].clone()),
                    None => continue,
                };
                let pruned = self.prune_connections(&neighbor_vec, &connections, m);
                if let Some(node) = self.nodes.get_mut(neighbor as usize) {
                    node.neighbors[layer] = pruned;
                }
            }
        }

        // Prune the node's own list when it overflows
        let own_overflowed = self
            .nodes
            .get(slot as usize)
            .map(|n| layer < n.neighbors.len() && n.neighbors[layer].len() > m)
            .unwrap_or(false);

        if own_overflowed {
            let connections = match self.nodes.get(slot as usize) {
                Some(node) => node.neighbors[layer].clone(),
                None => return,
            };
            let pruned = self.prune_connections(&node_vec, &connections, m);
            if let Some(node) = self.nodes.get_mut(slot as usize) {
                node.neighbors[layer] = pruned;
            }
        }
    }

    /// Keep only the m closest connections, measured from `from`
    fn prune_connections(&self, from: &[f32], connections: &[u32], m: usize) -> Vec<u32> {
        let mut by_distance: Vec<(u32, f32)> = connections
            .iter()
            .filter_map(|&conn| {
                self.nodes
                    .get(conn as usize)
                    .map(|node| (conn, ip_distance(from, &node.vector)))
            })
            .collect();

        by_distance.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

        by_distance.into_iter().take(m).map(|(slot, _)| slot).collect()
    }

    /// Tombstone a slot
    ///
    /// The node keeps its edges and remains a traversal waypoint; it will no
    /// longer appear in search results. Returns false when the slot does not
    /// exist or is already dead. The entry point is kept even when dead so
    /// the graph stays reachable.
    pub fn mark_deleted(&mut self, slot: u32) -> bool {
        match self.nodes.get_mut(slot as usize) {
            Some(node) if node.alive => {
                node.alive = false;
                true
            }
            _ => false,
        }
    }
}

/// Pseudo-random float in [0, 1) from a thread-local LCG
fn rand_float() -> f32 {
    use std::cell::Cell;

    thread_local! {
        static SEED: Cell<u64> = Cell::new(
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.subsec_nanos() as u64)
                .unwrap_or(12345),
        );
    }

    SEED.with(|seed| {
        let next = seed.get().wrapping_mul(1103515245).wrapping_add(12345);
        seed.set(next);
        ((next >> 16) & 0x7FFF) as f32 / 32768.0
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemo_core::normalize_vector;

    fn unit(mut v: Vec<f32>) -> Vec<f32> {
        normalize_vector(&mut v);
        v
    }

    fn test_graph() -> HnswGraph {
        HnswGraph::new(16, 200, 16, 1.0 / (16.0_f32).ln())
    }

    #[test]
    fn test_first_insert_becomes_entry_point() {
        let mut graph = test_graph();
        let slot = graph.insert(unit(vec![1.0, 0.0, 0.0]));

        assert_eq!(slot, 0);
        assert_eq!(graph.len(), 1);
        assert!(graph.is_alive(0));
    }

    #[test]
    fn test_insert_and_search_nearest() {
        let mut graph = test_graph();
        graph.insert(unit(vec![1.0, 0.0, 0.0, 0.0]));
        graph.insert(unit(vec![0.0, 1.0, 0.0, 0.0]));
        graph.insert(unit(vec![0.0, 0.0, 1.0, 0.0]));
        graph.insert(unit(vec![0.0, 0.0, 0.0, 1.0]));

        let results = graph.search(&unit(vec![1.0, 0.0, 0.0, 0.0]), 2, 50);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, 0);
        assert!(results[0].1 < 0.01);
    }

    #[test]
    fn test_search_empty_graph() {
        let graph = test_graph();
        assert!(graph.search(&[1.0, 0.0], 5, 50).is_empty());
    }

    #[test]
    fn test_mark_deleted_excludes_from_results() {
        let mut graph = test_graph();
        let a = graph.insert(unit(vec![1.0, 0.0]));
        graph.insert(unit(vec![0.9, 0.1]));
        graph.insert(unit(vec![0.0, 1.0]));

        assert!(graph.mark_deleted(a));
        assert!(!graph.mark_deleted(a));

        let results = graph.search(&unit(vec![1.0, 0.0]), 3, 50);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|(slot, _)| *slot != a));
    }

    #[test]
    fn test_deleted_nodes_remain_waypoints() {
        let mut graph = test_graph();
        for i in 0..20 {
            let angle = i as f32 * 0.3;
            graph.insert(unit(vec![angle.cos(), angle.sin()]));
        }

        // Tombstone the entry surroundings; the rest must stay reachable
        graph.mark_deleted(0);
        graph.mark_deleted(1);
        graph.mark_deleted(2);

        let results = graph.search(&unit(vec![1.0, 0.0]), 20, 50);
        assert_eq!(results.len(), 17);
        assert_eq!(graph.alive_count(), 17);
    }

    #[test]
    fn test_levels_capped_by_max_level() {
        let mut graph = HnswGraph::new(4, 50, 3, 1.0 / (4.0_f32).ln());
        for i in 0..64 {
            let angle = i as f32 * 0.1;
            graph.insert(unit(vec![angle.cos(), angle.sin()]));
        }

        for slot in 0..64 {
            let node = graph.node(slot).unwrap();
            assert!(node.level <= 3);
            assert_eq!(node.neighbors.len(), node.level + 1);
        }
    }

    #[test]
    fn test_search_quality_on_circle() {
        let mut graph = test_graph();
        for i in 0..100 {
            let angle = i as f32 * 0.1;
            graph.insert(unit(vec![angle.cos(), angle.sin()]));
        }

        let results = graph.search(&unit(vec![1.0, 0.0]), 5, 50);

        assert_eq!(results.len(), 5);
        assert_eq!(results[0].0, 0);
        for (_, distance) in &results {
            assert!(*distance < 0.1);
        }
    }
}
