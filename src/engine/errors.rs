use thiserror::Error;

/// Errors that can arise while loading content or persisting engine state.
///
/// Gameplay problems (unknown commands, gates, blocked input) are never reported
/// through this type; they come back as [`crate::engine::CommandResult`] values.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Content documents that fail to parse.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Wrapper around IO errors (directory creation, lock files, content files).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Returned when fetching a record that is not present.
    #[error("record not found: {0}")]
    NotFound(String),

    /// Returned when deserializing a record with an unexpected schema version.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },

    /// Content definitions that violate integrity rules (duplicate ids, dangling prerequisites).
    #[error("content integrity error: {0}")]
    Content(String),

    /// Another session already owns the data directory.
    #[error("data directory is locked by another session: {0}")]
    Locked(String),
}

/// Failures reported by a [`crate::engine::adapter::SystemCommandAdapter`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdapterError {
    #[error("adapter unavailable: {0}")]
    Unavailable(String),

    #[error("adapter timed out after {0} ms")]
    Timeout(u64),

    #[error("command failed: {0}")]
    Failed(String),
}
