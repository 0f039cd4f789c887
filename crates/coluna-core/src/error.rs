use crate::properties::ScalarKind;

/// Integrity errors raised while converting between property maps and stored
/// column bytes. A `CodecError` on decode means the row cannot be trusted —
/// assembly fails as a whole rather than returning a partially-populated
/// entity, since reserved-vs-generic provenance drives downstream type
/// expectations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("shard row key must be 24 bytes, got {0}")]
    InvalidRowKey(usize),

    #[error("reserved property `{name}` expects a {expected} value")]
    PropertyType { name: String, expected: ScalarKind },

    #[error("reserved property `{name}` holds malformed {kind} bytes: {reason}")]
    Scalar {
        name: String,
        kind: ScalarKind,
        reason: String,
    },

    #[error("property `{name}` holds malformed JSON: {reason}")]
    Json { name: String, reason: String },

    #[error("column name is not valid UTF-8")]
    ColumnName,

    #[error("column listing is missing the `{0}` column")]
    MissingColumn(&'static str),
}

/// Low-level storage errors (backing store, codec).
/// This is the error type for the `ColumnStore` trait — store operations can
/// only fail with infrastructure or integrity errors, never domain errors.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("rocksdb error: {0}")]
    RocksDb(String),

    #[error("corrupt cell: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl From<rocksdb::Error> for StorageError {
    fn from(err: rocksdb::Error) -> Self {
        StorageError::RocksDb(err.into_string())
    }
}

/// Application-level errors for queue manager operations.
#[derive(Debug, thiserror::Error)]
pub enum MqError {
    #[error("queue not found: {0}")]
    QueueNotFound(String),

    #[error("queue already exists: {0}")]
    QueueAlreadyExists(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<CodecError> for MqError {
    fn from(err: CodecError) -> Self {
        MqError::Storage(StorageError::Codec(err))
    }
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;
pub type MqResult<T> = std::result::Result<T, MqError>;
