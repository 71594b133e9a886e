use std::path::PathBuf;
use thiserror::Error;

use crate::schema::DataType;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid file {path}: {reason}")]
    InvalidFile { path: PathBuf, reason: String },
    #[error("short read at {path}: row {index} needs {expected} bytes, got {got}")]
    ShortRead {
        path: PathBuf,
        index: usize,
        expected: usize,
        got: usize,
    },
    #[error("row {index} out of bounds for column {column} with {len} rows")]
    IndexOutOfBounds {
        column: String,
        index: usize,
        len: usize,
    },
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),
    #[error("duplicate column: {0}")]
    DuplicateColumn(String),
    #[error("column not registered with this store: {0}")]
    UnknownColumn(String),
    #[error("column {column} has type {data_type}, expected a number")]
    NotNumeric { column: String, data_type: DataType },
    #[error("value for column {column} is not a {expected}")]
    TypeMismatch { column: String, expected: DataType },
    #[error("column {column} cannot hold {value:?}: {reason}")]
    Cast {
        column: String,
        value: String,
        reason: String,
    },
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn invalid(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        StoreError::InvalidFile {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
