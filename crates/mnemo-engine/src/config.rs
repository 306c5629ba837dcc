//! Engine configuration

use mnemo_graph::ActivationParams;
use mnemo_index::VectorIndexConfig;
use mnemo_memory::DEFAULT_CAPACITY;
use mnemo_reason::FusionWeights;
use serde::{Deserialize, Serialize};

/// Configuration for [`CognitiveEngine`](crate::CognitiveEngine)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Vector index parameters
    pub index: VectorIndexConfig,

    /// Maximum retained conversation episodes
    pub episodic_capacity: usize,

    /// Initial fusion weights
    pub weights: FusionWeights,

    /// Spreading-activation tuning
    pub activation: ActivationParams,

    /// Episodes considered per query
    pub episodic_top_k: usize,

    /// Minimum decayed similarity for an episode to contribute
    pub episodic_min_score: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            index: VectorIndexConfig::default(),
            episodic_capacity: DEFAULT_CAPACITY,
            weights: FusionWeights::default(),
            activation: ActivationParams::default(),
            episodic_top_k: 5,
            episodic_min_score: 0.6,
        }
    }
}

impl EngineConfig {
    /// Create a configuration for the given embedding dimension
    pub fn new(dimension: usize) -> Self {
        Self {
            index: VectorIndexConfig::new(dimension),
            ..Default::default()
        }
    }

    /// Small low-dimension preset for tests and experiments
    pub fn for_testing() -> Self {
        Self {
            index: VectorIndexConfig::small(8),
            episodic_capacity: 16,
            ..Default::default()
        }
    }

    /// Builder: set the episodic memory capacity
    pub fn with_episodic_capacity(mut self, capacity: usize) -> Self {
        self.episodic_capacity = capacity;
        self
    }

    /// Builder: set the initial fusion weights
    pub fn with_weights(mut self, weights: FusionWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Builder: set the spreading-activation parameters
    pub fn with_activation(mut self, activation: ActivationParams) -> Self {
        self.activation = activation;
        self
    }
}
