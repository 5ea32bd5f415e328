//! Error types for the EstuGrow core library.

use thiserror::Error;

/// Failures of the durable storage boundary.
///
/// Kept separate from [`EstuGrowError`] so the store can tell "the write did
/// not happen" apart from caller mistakes such as an unknown note id.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// A SQLite operation failed.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// An I/O operation on the filesystem failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The note collection could not be serialised or deserialised.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The file exists but is not a note store.
    #[error("Invalid store: {0}")]
    InvalidStore(String),

    /// The stored collection was written by a newer format than this build reads.
    #[error("Unsupported collection version: {0}")]
    UnsupportedVersion(u32),

    /// A blocking storage task panicked or was cancelled.
    #[error("Storage task failed: {0}")]
    Task(String),

    /// The backend refused the write (used by the in-memory store to simulate failures).
    #[error("Write rejected: {0}")]
    WriteRejected(String),
}

/// All errors that can occur within the EstuGrow core library.
#[derive(Debug, Error)]
pub enum EstuGrowError {
    /// A note ID was requested that does not exist in the collection.
    #[error("Note not found: {0}")]
    NoteNotFound(String),

    /// Durable storage could not be written; the in-memory collection was left unchanged.
    #[error("Persistence failure: {0}")]
    Persistence(#[from] PersistenceError),

    /// The store has not finished loading, or has already been closed.
    #[error("Note store is not ready")]
    NotReady,

    /// User-supplied input did not satisfy the note rules.
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

/// Convenience alias that pins the error type to [`EstuGrowError`].
pub type Result<T> = std::result::Result<T, EstuGrowError>;

impl EstuGrowError {
    /// Returns a short, human-readable message suitable for display to the end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NoteNotFound(_) => "Note no longer exists".to_string(),
            Self::Persistence(e) => format!("Failed to save: {e}"),
            Self::NotReady => "Notes are still loading, please try again".to_string(),
            Self::ValidationFailed(msg) => msg.clone(),
        }
    }

    /// True when the error came from the storage layer rather than from the request itself.
    #[must_use]
    pub fn is_persistence_failure(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistence_error_converts_into_store_error() {
        let e: EstuGrowError = PersistenceError::WriteRejected("disk full".to_string()).into();
        assert!(e.is_persistence_failure());
        assert!(e.user_message().contains("disk full"));
    }

    #[test]
    fn test_not_found_user_message_hides_id() {
        let e = EstuGrowError::NoteNotFound("abc-123".to_string());
        assert!(e.to_string().contains("abc-123"));
        assert!(!e.user_message().contains("abc-123"));
        assert!(!e.is_persistence_failure());
    }
}
