use thiserror::Error;

/// Errors surfaced by the durable key-value store collaborator.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),

    #[error("storage operation failed: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum NoticeError {
    #[error("Persistence error during operation '{operation}': {source_message}")]
    PersistenceError {
        operation: String,
        source_message: String,
        #[source]
        source: Option<StorageError>,
    },

    #[error("Internal error in notice registry: {0}")]
    InternalError(String),
}

impl NoticeError {
    pub fn persistence_error_no_source(
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        NoticeError::PersistenceError {
            operation: operation.into(),
            source_message: message.into(),
            source: None,
        }
    }

    pub(crate) fn storage(operation: &str, source: StorageError) -> Self {
        NoticeError::PersistenceError {
            operation: operation.to_string(),
            source_message: source.to_string(),
            source: Some(source),
        }
    }
}
