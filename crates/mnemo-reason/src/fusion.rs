//! Weighted fusion of evidence streams
//!
//! Combines ranked results from vector search, episodic memory and the
//! concept graph into a single deduplicated ranking.

use mnemo_core::{Error, Result, ScoredResult, SourceTag};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::debug;

const LEARNING_RATE: f32 = 0.1;

/// Relative contribution of each evidence source
///
/// Held normalized to sum 1 inside [`EvidenceFusion`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionWeights {
    pub vector: f32,
    pub episodic: f32,
    pub semantic: f32,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            vector: 0.6,
            episodic: 0.2,
            semantic: 0.2,
        }
    }
}

impl FusionWeights {
    pub fn new(vector: f32, episodic: f32, semantic: f32) -> Self {
        Self {
            vector,
            episodic,
            semantic,
        }
    }

    fn sum(&self) -> f32 {
        self.vector + self.episodic + self.semantic
    }

    /// Scale so components sum to 1. Caller ensures the sum is positive.
    fn normalized(self) -> Self {
        let sum = self.sum();
        Self::new(self.vector / sum, self.episodic / sum, self.semantic / sum)
    }
}

/// Merges per-source rankings into one scored list
#[derive(Debug, Clone)]
pub struct EvidenceFusion {
    weights: FusionWeights,
}

impl Default for EvidenceFusion {
    fn default() -> Self {
        Self::new()
    }
}

impl EvidenceFusion {
    /// Create a fusion stage with the default 0.6/0.2/0.2 weighting
    pub fn new() -> Self {
        Self {
            weights: FusionWeights::default(),
        }
    }

    /// Create a fusion stage with explicit weights
    pub fn with_weights(weights: FusionWeights) -> Result<Self> {
        let mut fusion = Self::new();
        fusion.set_weights(weights)?;
        Ok(fusion)
    }

    /// Current weights, normalized to sum 1
    pub fn weights(&self) -> FusionWeights {
        self.weights
    }

    /// Replace the weights
    ///
    /// Rejects negative components and all-zero weight sets; accepted
    /// weights are renormalized to sum 1.
    pub fn set_weights(&mut self, weights: FusionWeights) -> Result<()> {
        if weights.vector < 0.0 || weights.episodic < 0.0 || weights.semantic < 0.0 {
            return Err(Error::InvalidInput(
                "Fusion weights must be non-negative".to_string(),
            ));
        }

        let sum = weights.sum();
        if !sum.is_finite() || sum <= 0.0 {
            return Err(Error::InvalidInput(
                "Fusion weights must sum to a positive value".to_string(),
            ));
        }

        self.weights = weights.normalized();
        Ok(())
    }

    /// Fuse three ranked lists into one
    ///
    /// Results are grouped by exact content string; a source that did not
    /// surface a given content contributes zero for it. Output entries are
    /// tagged [`SourceTag::Fused`], carry all three per-source
    /// contributions as side scores, and are sorted descending by fused
    /// score, truncated to `top_k`.
    pub fn fuse(
        &self,
        vector_results: &[ScoredResult],
        episodic_results: &[ScoredResult],
        semantic_results: &[ScoredResult],
        top_k: usize,
    ) -> Vec<ScoredResult> {
        // Ordered map keyed by content keeps tie order deterministic
        let mut grouped: BTreeMap<&str, [f32; 3]> = BTreeMap::new();

        for result in vector_results {
            grouped.entry(result.content.as_str()).or_insert([0.0; 3])[0] = result.score;
        }
        for result in episodic_results {
            grouped.entry(result.content.as_str()).or_insert([0.0; 3])[1] = result.score;
        }
        for result in semantic_results {
            grouped.entry(result.content.as_str()).or_insert([0.0; 3])[2] = result.score;
        }

        let mut fused: Vec<ScoredResult> = grouped
            .into_iter()
            .map(|(content, [vector, episodic, semantic])| {
                let score = self.weights.vector * vector
                    + self.weights.episodic * episodic
                    + self.weights.semantic * semantic;
                ScoredResult::new(content, score, SourceTag::Fused)
                    .with_side_score(SourceTag::Vector, vector)
                    .with_side_score(SourceTag::Episodic, episodic)
                    .with_side_score(SourceTag::Semantic, semantic)
            })
            .collect();

        let candidates = fused.len();
        fused.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        fused.truncate(top_k);

        debug!("Fused {} candidates into {} results", candidates, fused.len());

        fused
    }

    /// Nudge weights toward the sources that correlate with feedback
    ///
    /// `feedback` holds one relevance signal per fused result, aligned by
    /// index. Components are clamped at zero after the update; if clamping
    /// zeroes all three, the previous weights are kept.
    pub fn learn_weights(&mut self, results: &[ScoredResult], feedback: &[f32]) -> Result<()> {
        if results.len() != feedback.len() {
            return Err(Error::InvalidInput(format!(
                "Feedback length {} does not match result count {}",
                feedback.len(),
                results.len()
            )));
        }
        if results.is_empty() {
            return Ok(());
        }

        let mut vector_corr = 0.0f32;
        let mut episodic_corr = 0.0f32;
        let mut semantic_corr = 0.0f32;

        for (result, &signal) in results.iter().zip(feedback) {
            vector_corr += result.side_score(SourceTag::Vector) * signal;
            episodic_corr += result.side_score(SourceTag::Episodic) * signal;
            semantic_corr += result.side_score(SourceTag::Semantic) * signal;
        }

        let n = results.len() as f32;
        let updated = FusionWeights::new(
            (self.weights.vector + LEARNING_RATE * vector_corr / n).max(0.0),
            (self.weights.episodic + LEARNING_RATE * episodic_corr / n).max(0.0),
            (self.weights.semantic + LEARNING_RATE * semantic_corr / n).max(0.0),
        );

        if updated.sum() > 0.0 {
            self.weights = updated.normalized();
            debug!(
                "Learned weights: vector={:.3} episodic={:.3} semantic={:.3}",
                self.weights.vector, self.weights.episodic, self.weights.semantic
            );
        }

        Ok(())
    }
}
