//! MnemoDB Episodic Memory
//!
//! Short-term conversational memory: a fixed-capacity FIFO buffer of
//! query/response episodes retrieved by similarity times recency.
//!
//! # Modules
//!
//! - `episode` - Episode and id types
//! - `buffer` - The bounded buffer with decayed retrieval and persistence

pub mod buffer;
pub mod episode;

pub use buffer::{DEFAULT_CAPACITY, DEFAULT_DECAY_LAMBDA, EpisodicMemory, ScoredEpisode};
pub use episode::{Episode, EpisodeId};
