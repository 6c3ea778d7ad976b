//! ETSI Error - Unified Error Types
//!
//! Error type shared by the pipeline crates for concerns that are not owned
//! by a single component: configuration loading, file IO and resource
//! parsing. Component crates wrap this type in their own error enums.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// Unified error type for shared pipeline operations.
#[derive(Error, Debug)]
pub enum EtsiError {
    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    // Resource errors
    #[error("resource error: {0}")]
    Resource(String),

    // Parse errors
    #[error("parse error: {0}")]
    Parse(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Type Aliases
// =============================================================================

/// Result type alias for shared pipeline operations.
pub type Result<T> = std::result::Result<T, EtsiError>;

// =============================================================================
// Error Classification
// =============================================================================

impl EtsiError {
    /// Returns true if the error came from the operating system rather than
    /// from malformed input.
    pub fn is_io(&self) -> bool {
        matches!(self, EtsiError::Io(_))
    }

    /// Returns true if this is a user error (bad input or configuration).
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            EtsiError::Configuration(_) | EtsiError::Resource(_) | EtsiError::Parse(_)
        )
    }
}

// =============================================================================
// Tests
// =============================================================================
