use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum EstimatorError {
    #[error("storage error: {0}")]
    Store(#[from] ocv_traits::StoreError),
    #[error("persisted record rejected: {0}")]
    Codec(#[from] CodecError),
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing cell count")]
    MissingCells,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

/// Why a persisted record was discarded as a whole.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CodecError {
    #[error("record is empty")]
    Empty,
    #[error("unsupported version tag {0:?}")]
    Version(String),
    #[error("bucket count {found} does not match compiled count {expected}")]
    BucketCount { expected: usize, found: usize },
    #[error("missing BUCKETS line")]
    MissingBucketCount,
    #[error("field {field} has unparsable value {value:?}")]
    Field { field: &'static str, value: String },
    #[error("field {field} has {found} entries, expected {expected}")]
    Length {
        field: &'static str,
        expected: usize,
        found: usize,
    },
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
