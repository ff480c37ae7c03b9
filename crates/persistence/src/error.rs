use common::EntityId;
use thiserror::Error;

/// Errors raised by the persistence layer.
///
/// The variants are deliberately distinct: callers recover differently from a
/// concurrent update (reload and retry) than from a validation failure
/// (reject the request) or an invalid operation (programmer error), so none
/// of them may be collapsed into a generic failure.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// A repository operation was used outside its contract, e.g. `update`
    /// on an aggregate never loaded through this unit of work, or any
    /// staging call after the unit of work has committed or failed.
    #[error("Invalid operation: {reason}")]
    InvalidOperation { reason: String },

    /// A deferred cross-aggregate rule failed during commit. Nothing was
    /// written.
    #[error("Validation failed for {aggregate_type} {aggregate_id}: {reason}")]
    ValidationFailed {
        aggregate_type: String,
        aggregate_id: EntityId,
        reason: String,
    },

    /// The store rejected the commit because another writer got there first,
    /// either as a row-version mismatch or as a reference that disappeared
    /// in the race window. Recoverable: reload and retry.
    #[error("Concurrent update detected on {aggregate_type} {aggregate_id}")]
    ConcurrentUpdate {
        aggregate_type: String,
        aggregate_id: EntityId,
    },

    /// Store-level: the row version supplied with an update or delete does
    /// not match the stored row version.
    #[error("Version mismatch on {aggregate_type} {aggregate_id}")]
    VersionMismatch {
        aggregate_type: String,
        aggregate_id: EntityId,
    },

    /// Store-level: a declared reference does not resolve at save time.
    #[error("{aggregate_type} {aggregate_id} references missing {referenced_type} {referenced_id}")]
    ReferenceNotFound {
        aggregate_type: String,
        aggregate_id: EntityId,
        referenced_type: String,
        referenced_id: EntityId,
    },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for persistence operations.
pub type Result<T> = std::result::Result<T, PersistenceError>;
