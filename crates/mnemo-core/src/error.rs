//! Error types for MnemoDB
//!
//! Provides the error hierarchy shared by every store and the engine.

use thiserror::Error;

/// The main error type for MnemoDB operations
#[derive(Error, Debug)]
pub enum Error {
    // ========== Validation Errors ==========
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Capacity exceeded: index is full at {capacity} elements")]
    CapacityExceeded { capacity: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ========== Serialization Errors ==========
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Snapshot corrupt: {0}")]
    SnapshotCorrupt(String),

    // ========== IO Errors ==========
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ========== Internal Errors ==========
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for MnemoDB operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns true if this error was caused by invalid caller input
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::DimensionMismatch { .. }
                | Error::CapacityExceeded { .. }
                | Error::InvalidInput(_)
        )
    }

    /// Returns true if this error indicates corrupt or undecodable data
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::SnapshotCorrupt(_) | Error::Serialization(_))
    }

    /// Returns true if this error came from the filesystem
    pub fn is_io_error(&self) -> bool {
        matches!(self, Error::Io(_))
    }
}
