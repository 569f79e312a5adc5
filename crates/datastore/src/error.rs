use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors reported by a [`ResumeCacheStore`](crate::ResumeCacheStore)
///
/// Nothing is retried inside the store; callers decide whether to log,
/// surface or ignore a failure.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing storage could not be read or written
    #[error("Persistence failure during {operation}: {source}")]
    Persistence {
        operation: &'static str,
        #[source]
        source: BoxError,
    },

    /// A batch carried a record the store refuses to persist
    #[error("Invalid record: {reason}")]
    InvalidRecord { reason: String },
}

impl StoreError {
    pub fn persistence(operation: &'static str, source: impl Into<BoxError>) -> Self {
        StoreError::Persistence {
            operation,
            source: source.into(),
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        StoreError::InvalidRecord {
            reason: reason.into(),
        }
    }

    pub fn is_persistence(&self) -> bool {
        matches!(self, StoreError::Persistence { .. })
    }
}
