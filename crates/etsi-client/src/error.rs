//! ETSI Client Error Types
//!
//! Errors raised by TSDB sessions. Every variant is a database error from
//! the point of view of the loader and the stream router.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use thiserror::Error;

// =============================================================================
// Session Error
// =============================================================================

/// Errors that can occur during session operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("timeout after {0} ms")]
    Timeout(u64),

    #[error("not connected")]
    NotConnected,

    #[error("statement failed [{code}]: {message}")]
    StatementFailed { code: i64, message: String },

    #[error("query failed: {0}")]
    QueryFailed(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("protocol error: {0}")]
    Protocol(String),
}

impl SessionError {
    /// Check if the error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Check if the server rejected a create because the target exists.
    pub fn is_already_exists(&self) -> bool {
        match self {
            Self::StatementFailed { message, .. } | Self::QueryFailed(message) => {
                let lower = message.to_ascii_lowercase();
                lower.contains("already been created") || lower.contains("already exist")
            }
            _ => false,
        }
    }

    /// Short reason suitable for a single diagnostic line.
    pub fn reason(&self) -> String {
        self.to_string().lines().next().unwrap_or_default().to_string()
    }
}

// =============================================================================
// Tests
// =============================================================================
