//! ETSI Loader Errors
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use etsi_client::SessionError;
use etsi_common::EtsiError;
use etsi_schema::SchemaError;
use thiserror::Error;

/// Errors raised by a bulk load.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("database error: {0}")]
    Session(#[from] SessionError),

    #[error("parse error at row {row}: {message}")]
    Parse { row: usize, message: String },

    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("unknown verb '{0}'")]
    UnknownVerb(String),

    #[error("configuration error: {0}")]
    Config(#[from] EtsiError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LoadError {
    pub fn parse(row: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            row,
            message: message.into(),
        }
    }

    /// Returns true for failures of the TSDB rather than of the input.
    pub fn is_database_error(&self) -> bool {
        matches!(self, Self::Session(_))
    }
}

impl From<csv::Error> for LoadError {
    fn from(err: csv::Error) -> Self {
        LoadError::Dataset(err.to_string())
    }
}

/// Result type alias for loader operations.
pub type Result<T> = std::result::Result<T, LoadError>;
