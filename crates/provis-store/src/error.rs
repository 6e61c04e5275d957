use provis_schema::FieldError;

/// Errors from store and backend operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested item type is not registered.
    #[error("unknown item type: {0}")]
    UnknownType(String),

    /// The requested backend source is not registered.
    #[error("invalid source: {0}")]
    InvalidSource(String),

    /// No record exists for the uid.
    #[error("item not found: {0}")]
    ItemNotFound(String),

    /// The uid cannot be used as a storage key.
    #[error("invalid uid: {0:?}")]
    InvalidUid(String),

    /// A backend failed its boot hook.
    #[error("source {0} failed to boot")]
    BootFailed(String),

    /// A record lacks data every record must carry.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// A stored record could not be applied to its item type.
    #[error(transparent)]
    Field(#[from] FieldError),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
