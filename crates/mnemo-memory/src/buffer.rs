//! Bounded episodic memory
//!
//! A strict FIFO ring of recent exchanges. Retrieval scores every episode
//! by cosine similarity times an exponential recency decay, so an old
//! episode has to be very similar to outrank a fresh one.

use crate::episode::{Episode, EpisodeId};
use mnemo_core::{Embedding, Error, Metadata, Result, Timestamp, cosine_similarity};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::VecDeque;
use std::path::Path;
use tracing::{debug, info};

/// Default number of episodes kept
pub const DEFAULT_CAPACITY: usize = 128;

/// Default decay rate per millisecond of age
pub const DEFAULT_DECAY_LAMBDA: f32 = 1e-6;

/// An episode together with its retrieval score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredEpisode {
    /// The retrieved episode
    pub episode: Episode,

    /// Combined similarity and recency score
    pub score: f32,
}

/// Snapshot payload for persistence
#[derive(Serialize, Deserialize)]
struct MemorySnapshot {
    capacity: usize,
    lambda: f32,
    episodes: Vec<Episode>,
}

/// Fixed-capacity FIFO buffer of recent query/response episodes
#[derive(Debug, Clone)]
pub struct EpisodicMemory {
    capacity: usize,
    lambda: f32,
    episodes: VecDeque<Episode>,
}

impl EpisodicMemory {
    /// Create an empty buffer holding at most `capacity` episodes
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            lambda: DEFAULT_DECAY_LAMBDA,
            episodes: VecDeque::new(),
        }
    }

    /// Builder: override the recency decay rate (per millisecond)
    pub fn with_decay_lambda(mut self, lambda: f32) -> Self {
        self.lambda = lambda;
        self
    }

    /// Record an exchange, evicting the oldest episode when full
    ///
    /// Returns the id of the stored episode.
    pub fn add(
        &mut self,
        query: &str,
        response: &str,
        embedding: Embedding,
        metadata: Metadata,
    ) -> EpisodeId {
        let episode = Episode::new(query, response, embedding).with_metadata(metadata);
        let id = episode.id;
        self.push(episode);
        debug!("Stored episode {} ({} in buffer)", id, self.episodes.len());
        id
    }

    /// Append a pre-built episode, applying the same eviction rule
    pub fn push(&mut self, episode: Episode) {
        self.episodes.push_back(episode);
        if self.episodes.len() > self.capacity {
            self.episodes.pop_front();
        }
    }

    /// Retrieve episodes similar to the query embedding
    ///
    /// Each episode scores `cosine * exp(-lambda * age_ms)`; scores below
    /// `min_score` are dropped, the rest are returned best-first, at most
    /// `top_k` of them.
    pub fn retrieve_similar(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        min_score: f32,
    ) -> Result<Vec<ScoredEpisode>> {
        let now = Timestamp::now();
        let mut scored = Vec::new();

        for episode in &self.episodes {
            let similarity = cosine_similarity(query_embedding, &episode.embedding)?;
            let age_ms = episode.created_at.elapsed_ms(now).max(0) as f32;
            let score = similarity * (-self.lambda * age_ms).exp();

            if score >= min_score {
                scored.push(ScoredEpisode {
                    episode: episode.clone(),
                    score,
                });
            }
        }

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        scored.truncate(top_k);

        Ok(scored)
    }

    /// The last `n` episodes in insertion order, oldest first
    pub fn get_recent(&self, n: usize) -> Vec<Episode> {
        let skip = self.episodes.len().saturating_sub(n);
        self.episodes.iter().skip(skip).cloned().collect()
    }

    /// Number of episodes currently held
    pub fn len(&self) -> usize {
        self.episodes.len()
    }

    /// Maximum number of episodes held
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True when no episodes are held
    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }

    /// True once the buffer has reached capacity
    pub fn is_full(&self) -> bool {
        self.episodes.len() >= self.capacity
    }

    /// Drop all episodes
    pub fn clear(&mut self) {
        self.episodes.clear();
    }

    // ========== Persistence ==========

    /// Save the buffer, episodes and embeddings included
    pub fn save(&self, path: &Path) -> Result<()> {
        let snapshot = MemorySnapshot {
            capacity: self.capacity,
            lambda: self.lambda,
            episodes: self.episodes.iter().cloned().collect(),
        };
        mnemo_core::write_snapshot(path, &snapshot)?;

        info!(
            "Saved episodic memory ({} episodes) to {}",
            snapshot.episodes.len(),
            path.display()
        );
        Ok(())
    }

    /// Load a buffer saved by [`EpisodicMemory::save`]
    ///
    /// Constructs a fresh buffer; a failed load leaves any existing buffer
    /// the caller holds untouched.
    pub fn load(path: &Path) -> Result<EpisodicMemory> {
        let snapshot: MemorySnapshot = mnemo_core::read_snapshot(path)?;

        if snapshot.episodes.len() > snapshot.capacity {
            return Err(Error::SnapshotCorrupt(format!(
                "{} episodes exceed capacity {}",
                snapshot.episodes.len(),
                snapshot.capacity
            )));
        }

        info!(
            "Loaded episodic memory ({} episodes) from {}",
            snapshot.episodes.len(),
            path.display()
        );

        Ok(EpisodicMemory {
            capacity: snapshot.capacity,
            lambda: snapshot.lambda,
            episodes: snapshot.episodes.into(),
        })
    }
}

impl Default for EpisodicMemory {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add_simple(memory: &mut EpisodicMemory, query: &str, embedding: Embedding) -> EpisodeId {
        memory.add(query, "response", embedding, Metadata::new())
    }

    #[test]
    fn test_add_and_len() {
        let mut memory = EpisodicMemory::new(10);
        add_simple(&mut memory, "q1", vec![1.0, 0.0]);
        add_simple(&mut memory, "q2", vec![0.0, 1.0]);

        assert_eq!(memory.len(), 2);
        assert!(!memory.is_full());
    }

    #[test]
    fn test_fifo_eviction() {
        let mut memory = EpisodicMemory::new(2);
        add_simple(&mut memory, "e1", vec![1.0, 0.0]);
        add_simple(&mut memory, "e2", vec![0.0, 1.0]);
        add_simple(&mut memory, "e3", vec![1.0, 1.0]);

        assert_eq!(memory.len(), 2);
        assert!(memory.is_full());

        let recent = memory.get_recent(10);
        let queries: Vec<&str> = recent.iter().map(|e| e.query.as_str()).collect();
        assert_eq!(queries, vec!["e2", "e3"]);
    }

    #[test]
    fn test_get_recent_limit() {
        let mut memory = EpisodicMemory::new(10);
        add_simple(&mut memory, "e1", vec![1.0]);
        add_simple(&mut memory, "e2", vec![1.0]);
        add_simple(&mut memory, "e3", vec![1.0]);

        let recent = memory.get_recent(1);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].query, "e3");
    }

    #[test]
    fn test_retrieve_similar_ranks_by_similarity() {
        let mut memory = EpisodicMemory::new(10);
        add_simple(&mut memory, "about cats", vec![1.0, 0.0]);
        add_simple(&mut memory, "about planes", vec![0.0, 1.0]);

        let results = memory.retrieve_similar(&[1.0, 0.0], 5, 0.5).unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].episode.query, "about cats");
        assert!(results[0].score > 0.9);
    }

    #[test]
    fn test_retrieve_similar_applies_recency_decay() {
        let mut memory = EpisodicMemory::new(10);

        let old_created = Timestamp::from_millis(Timestamp::now().as_millis() - 3_000_000);
        memory.push(Episode::new("old", "r", vec![1.0, 0.0]).with_created_at(old_created));
        memory.push(Episode::new("fresh", "r", vec![1.0, 0.0]));

        let results = memory.retrieve_similar(&[1.0, 0.0], 5, 0.0).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].episode.query, "fresh");
        assert!(results[0].score > 0.9);
        // exp(-1e-6 * 3e6) is roughly 0.05
        assert!(results[1].score < 0.1);
        assert!(results[1].score > 0.01);
    }

    #[test]
    fn test_retrieve_similar_dimension_mismatch() {
        let mut memory = EpisodicMemory::new(10);
        add_simple(&mut memory, "q", vec![1.0, 0.0]);

        let result = memory.retrieve_similar(&[1.0, 0.0, 0.0], 5, 0.0);
        assert!(matches!(result, Err(Error::DimensionMismatch { .. })));
    }

    #[test]
    fn test_retrieve_similar_respects_top_k() {
        let mut memory = EpisodicMemory::new(10);
        for i in 0..5 {
            add_simple(&mut memory, &format!("q{i}"), vec![1.0, 0.1 * i as f32]);
        }

        let results = memory.retrieve_similar(&[1.0, 0.0], 3, 0.0).unwrap();
        assert_eq!(results.len(), 3);
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn test_clear() {
        let mut memory = EpisodicMemory::new(10);
        add_simple(&mut memory, "q", vec![1.0]);
        memory.clear();

        assert!(memory.is_empty());
        assert!(memory.retrieve_similar(&[1.0], 5, 0.0).unwrap().is_empty());
    }

    #[test]
    fn test_save_load_preserves_embeddings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("episodes.snap");

        let mut memory = EpisodicMemory::new(4);
        let mut metadata = Metadata::new();
        metadata.insert("topic".to_string(), "test".to_string());
        memory.add("q1", "r1", vec![0.25, -0.5, 0.125], metadata);
        memory.add("q2", "r2", vec![1.0, 0.0, 0.0], Metadata::new());
        memory.save(&path).unwrap();

        let loaded = EpisodicMemory::load(&path).unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.capacity(), 4);

        let original = memory.get_recent(10);
        let restored = loaded.get_recent(10);
        for (a, b) in original.iter().zip(restored.iter()) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.query, b.query);
            assert_eq!(a.embedding, b.embedding);
            assert_eq!(a.created_at, b.created_at);
            assert_eq!(a.metadata, b.metadata);
        }

        // Similarity retrieval still works on the reloaded buffer
        let results = loaded.retrieve_similar(&[1.0, 0.0, 0.0], 1, 0.5).unwrap();
        assert_eq!(results[0].episode.query, "q2");
    }

    #[test]
    fn test_load_corrupt_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("episodes.snap");

        let mut memory = EpisodicMemory::new(2);
        add_simple(&mut memory, "q", vec![1.0]);
        memory.save(&path).unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        std::fs::write(&path, bytes).unwrap();

        assert!(matches!(
            EpisodicMemory::load(&path),
            Err(Error::SnapshotCorrupt(_))
        ));
    }
}
