//! Error types for ingestion and query operations.

use thiserror::Error;

/// Errors raised by the scan ingestion pipeline and the query service.
///
/// A missing vulnerability or scan is not an error; lookups return `None`.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("{0}")]
    Validation(String),

    #[error("{context}: {source}")]
    Persistence {
        context: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("database connection lock poisoned")]
    LockPoisoned,

    #[error("{0}")]
    Serialization(String),
}

impl ScanError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }

    /// True for failures that originate in the storage backend.
    pub const fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence { .. } | Self::LockPoisoned)
    }
}

/// Attach operation context to a rusqlite failure.
pub(crate) trait PersistenceContext<T> {
    fn context(self, context: &'static str) -> Result<T, ScanError>;
}

impl<T> PersistenceContext<T> for Result<T, rusqlite::Error> {
    fn context(self, context: &'static str) -> Result<T, ScanError> {
        self.map_err(|source| ScanError::Persistence { context, source })
    }
}

pub type Result<T, E = ScanError> = std::result::Result<T, E>;
