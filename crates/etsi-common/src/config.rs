//! ETSI Config - Configuration Helpers
//!
//! Environment and TOML helpers shared by the loader and the stream router.
//! Every lookup has a documented default; a missing or malformed variable
//! never fails start-up, it falls back and logs.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use crate::error::{EtsiError, Result};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::str::FromStr;

// =============================================================================
// Defaults
// =============================================================================

/// Process-wide default for the first two levels of every series path.
pub const DEFAULT_IDENTIFIER_ROOT: &str = "root.etsidata";

/// Environment variable overriding [`DEFAULT_IDENTIFIER_ROOT`].
pub const ENV_IDENTIFIER_ROOT: &str = "ETSI_ROOT";

// =============================================================================
// Environment Lookup
// =============================================================================

/// Read a string variable, falling back to `default` when unset or blank.
pub fn env_or(key: &str, default: &str) -> String {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => default.to_string(),
    }
}

/// Read and parse a variable, falling back to `default` when unset or
/// unparseable.
pub fn env_parse_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => match value.trim().parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                tracing::warn!("Ignoring malformed {}={:?}, using default", key, value);
                default
            }
        },
        _ => default,
    }
}

/// Identifier root taken from the environment or the built-in default.
pub fn identifier_root_from_env() -> String {
    env_or(ENV_IDENTIFIER_ROOT, DEFAULT_IDENTIFIER_ROOT)
}

// =============================================================================
// TOML Files
// =============================================================================

/// Load a TOML document from disk into `T`.
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    parse_toml(&content)
}

/// Parse an in-memory TOML document into `T`.
pub fn parse_toml<T: DeserializeOwned>(content: &str) -> Result<T> {
    toml::from_str(content).map_err(|e| EtsiError::Configuration(e.to_string()))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_env_fallbacks() {
        std::env::remove_var("ETSI_TEST_UNSET_VAR");
        assert_eq!(env_or("ETSI_TEST_UNSET_VAR", "fallback"), "fallback");
        assert_eq!(env_parse_or("ETSI_TEST_UNSET_VAR", 42u16), 42);

        std::env::set_var("ETSI_TEST_BAD_PORT", "not-a-port");
        assert_eq!(env_parse_or("ETSI_TEST_BAD_PORT", 8080u16), 8080);

        std::env::set_var("ETSI_TEST_GOOD_PORT", " 9000 ");
        assert_eq!(env_parse_or("ETSI_TEST_GOOD_PORT", 8080u16), 9000);
    }

    #[test]
    fn test_parse_toml() {
        #[derive(Debug, Deserialize)]
        struct Sample {
            name: String,
        }

        let sample: Sample = parse_toml("name = \"ecobee\"").unwrap();
        assert_eq!(sample.name, "ecobee");

        let err = parse_toml::<Sample>("name = ").unwrap_err();
        assert!(err.is_user_error());
    }
}
