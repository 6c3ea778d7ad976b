//! ETSI Stream Errors
//!
//! Protocol errors raised while reading client frames. None of them are
//! reported to the client; the router logs them and drops the offending
//! token or frame.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use thiserror::Error;

/// Problems with a client command frame.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("empty command")]
    Empty,

    #[error("unknown verb '{0}'")]
    UnknownVerb(String),

    #[error("{0}: missing argument")]
    MissingArgument(&'static str),

    #[error("{verb}: invalid target '{target}'")]
    InvalidTarget { verb: &'static str, target: String },

    #[error("{verb}: unexpected token '{token}'")]
    UnexpectedToken { verb: &'static str, token: String },

    #[error("unknown parameter '{0}'")]
    UnknownParameter(String),

    #[error("parameter '{0}' has no value")]
    MissingValue(String),

    #[error("parameter '{name}': {reason} ('{value}'), using default")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: &'static str,
    },
}

impl ProtocolError {
    /// Unknown verbs are dropped without a trace at the default log level.
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::Empty | Self::UnknownVerb(_))
    }
}
