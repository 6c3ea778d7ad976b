//! ETSI Schema Errors
//!
//! Failures of schema synthesis. All of them abort a loader run.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use etsi_common::EtsiError;
use thiserror::Error;

/// Errors raised while synthesizing a dataset schema.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("time measurement '{0}' not found in summary")]
    MissingTimeMeasurement(String),

    #[error("duplicate measurement '{key}' (from '{first}' and '{second}')")]
    DuplicateMeasurement {
        key: String,
        first: String,
        second: String,
    },

    #[error("dataset identifier missing: summary has no terminator row and none was configured")]
    MissingIdentifier,

    #[error("summary error: {0}")]
    Summary(String),

    #[error("sidecar error at line {line}: {message}")]
    Sidecar { line: usize, message: String },

    #[error("name table error: {0}")]
    NameTable(#[from] EtsiError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<csv::Error> for SchemaError {
    fn from(err: csv::Error) -> Self {
        SchemaError::Summary(err.to_string())
    }
}

/// Result type alias for schema operations.
pub type Result<T> = std::result::Result<T, SchemaError>;
