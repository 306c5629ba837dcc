//! Conversation episodes

use mnemo_core::{Embedding, Metadata, Timestamp};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Episode identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EpisodeId(Uuid);

impl EpisodeId {
    /// Create a new random episode ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get as UUID
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EpisodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EpisodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One remembered query/response exchange
///
/// Episodes carry the embedding of the exchange so they can be retrieved
/// by similarity later, and a creation timestamp for recency decay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    /// Unique identifier
    pub id: EpisodeId,

    /// What was asked
    pub query: String,

    /// What was answered
    pub response: String,

    /// Embedding of the exchange
    pub embedding: Embedding,

    /// When this episode was recorded
    pub created_at: Timestamp,

    /// Additional metadata
    pub metadata: Metadata,
}

impl Episode {
    /// Create a new episode stamped with the current time
    pub fn new(query: &str, response: &str, embedding: Embedding) -> Self {
        Self {
            id: EpisodeId::new(),
            query: query.to_string(),
            response: response.to_string(),
            embedding,
            created_at: Timestamp::now(),
            metadata: Metadata::new(),
        }
    }

    /// Builder: attach metadata
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Builder: override the creation timestamp
    pub fn with_created_at(mut self, created_at: Timestamp) -> Self {
        self.created_at = created_at;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_episode_creation() {
        let episode = Episode::new("What's the weather?", "It's sunny today.", vec![1.0, 0.0]);

        assert_eq!(episode.query, "What's the weather?");
        assert_eq!(episode.response, "It's sunny today.");
        assert_eq!(episode.embedding, vec![1.0, 0.0]);
        assert!(episode.metadata.is_empty());
    }

    #[test]
    fn test_episode_ids_are_unique() {
        let a = Episode::new("q", "r", vec![]);
        let b = Episode::new("q", "r", vec![]);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_episode_id_display_round_trip() {
        let id = EpisodeId::new();
        let parsed = EpisodeId::from_uuid(id.to_string().parse().unwrap());
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_episode_builders() {
        let mut metadata = Metadata::new();
        metadata.insert("topic".to_string(), "weather".to_string());

        let episode = Episode::new("q", "r", vec![0.5])
            .with_metadata(metadata)
            .with_created_at(Timestamp::from_millis(42));

        assert_eq!(episode.metadata["topic"], "weather");
        assert_eq!(episode.created_at.as_millis(), 42);
    }
}
