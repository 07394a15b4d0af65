//! Error types for the tomedb storage engine.

use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in tomedb operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The supplied API key does not match the configured secret.
    ///
    /// Fatal to the construction attempt only; nothing has been opened
    /// or locked when this is returned.
    #[error("invalid API key")]
    InvalidApiKey,

    /// Another engine instance holds the data directory lock.
    #[error("database locked: another instance has exclusive access to the data directory")]
    DatabaseLocked,

    /// A named version does not exist.
    #[error("version not found: {name}")]
    VersionNotFound {
        /// The version name that was looked up.
        name: String,
    },

    /// A version name is not usable as a directory name.
    #[error("invalid version name: {name:?}")]
    InvalidVersionName {
        /// The offending name.
        name: String,
    },

    /// A record field uses a reserved name (`id` or `metadata`).
    #[error("reserved field name: {name:?}")]
    ReservedField {
        /// The offending field name.
        name: String,
    },

    /// Durable append or directory/file I/O failure.
    ///
    /// When returned from a mutating operation, in-memory state is
    /// guaranteed unchanged: the engine only applies entries that were
    /// durably appended first.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON encode/decode failure.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Internal invariant violation.
    ///
    /// Indicates a prior corrupted apply. This is a logic fault, not a
    /// retryable condition.
    #[error("store corruption: {message}")]
    Corrupt {
        /// Description of the broken invariant.
        message: String,
    },
}

impl StoreError {
    /// Creates a version-not-found error.
    pub fn version_not_found(name: impl Into<String>) -> Self {
        Self::VersionNotFound { name: name.into() }
    }

    /// Creates an invalid-version-name error.
    pub fn invalid_version_name(name: impl Into<String>) -> Self {
        Self::InvalidVersionName { name: name.into() }
    }

    /// Creates a reserved-field error.
    pub fn reserved_field(name: impl Into<String>) -> Self {
        Self::ReservedField { name: name.into() }
    }

    /// Creates a corruption error.
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt {
            message: message.into(),
        }
    }
}
