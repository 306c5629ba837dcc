//! Shared result types
//!
//! Every retrieval stage produces `ScoredResult`s tagged with the source
//! that found them; fusion consumes and re-tags them.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// String key/value metadata attached to documents and episodes
pub type Metadata = HashMap<String, String>;

/// Which retrieval stage produced a result
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum SourceTag {
    /// Approximate nearest-neighbor search over indexed documents
    Vector,
    /// Recency-weighted episodic memory
    Episodic,
    /// Spreading activation over the concept graph
    Semantic,
    /// Weighted combination of the above
    Fused,
}

impl SourceTag {
    /// Stable lowercase name, used in logs and rendered explanations
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTag::Vector => "vector",
            SourceTag::Episodic => "episodic",
            SourceTag::Semantic => "semantic",
            SourceTag::Fused => "fused",
        }
    }
}

impl std::fmt::Display for SourceTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single retrieved item with its relevance score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    /// The retrieved content
    pub content: String,

    /// Relevance score, higher is better
    pub score: f32,

    /// Stage that produced this result
    pub source: SourceTag,

    /// Per-source contributions, populated by fusion
    pub side_scores: BTreeMap<SourceTag, f32>,
}

impl ScoredResult {
    /// Create a result with no side scores
    pub fn new(content: impl Into<String>, score: f32, source: SourceTag) -> Self {
        Self {
            content: content.into(),
            score,
            source,
            side_scores: BTreeMap::new(),
        }
    }

    /// Builder: attach a per-source contribution
    pub fn with_side_score(mut self, source: SourceTag, score: f32) -> Self {
        self.side_scores.insert(source, score);
        self
    }

    /// Contribution recorded for one source, zero when absent
    pub fn side_score(&self, source: SourceTag) -> f32 {
        self.side_scores.get(&source).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_tag_names() {
        assert_eq!(SourceTag::Vector.as_str(), "vector");
        assert_eq!(SourceTag::Fused.to_string(), "fused");
    }

    #[test]
    fn test_scored_result_construction() {
        let result = ScoredResult::new("some content", 0.9, SourceTag::Vector)
            .with_side_score(SourceTag::Vector, 0.9)
            .with_side_score(SourceTag::Episodic, 0.0);

        assert_eq!(result.content, "some content");
        assert_eq!(result.side_scores.len(), 2);
        assert_eq!(result.side_score(SourceTag::Vector), 0.9);
        assert_eq!(result.side_score(SourceTag::Semantic), 0.0);
    }

    #[test]
    fn test_source_tag_ordering_is_stable() {
        let mut map = BTreeMap::new();
        map.insert(SourceTag::Semantic, 0.1);
        map.insert(SourceTag::Vector, 0.2);
        map.insert(SourceTag::Episodic, 0.3);

        let keys: Vec<SourceTag> = map.keys().copied().collect();
        assert_eq!(
            keys,
            vec![SourceTag::Vector, SourceTag::Episodic, SourceTag::Semantic]
        );
    }
}
