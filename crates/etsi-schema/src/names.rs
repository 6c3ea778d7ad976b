//! ETSI Schema Name Table
//!
//! Preferred measurement keys for known raw field names. The default table
//! ships inside the binary; deployments can extend or override it with a
//! TOML file of the same shape.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use crate::error::Result;
use etsi_common::config::{load_toml, parse_toml};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

const EMBEDDED: &str = include_str!("../resources/name_table.toml");

/// Raw field name to measurement key mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NameTable {
    #[serde(default)]
    aliases: HashMap<String, String>,
}

impl NameTable {
    /// An empty table that maps nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The table compiled into the crate.
    pub fn embedded() -> Result<Self> {
        let table: NameTable = parse_toml(EMBEDDED)?;
        Ok(table.normalized())
    }

    /// Load a table from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let table: NameTable = load_toml(path.as_ref())?;
        Ok(table.normalized())
    }

    /// The embedded table, extended by `path` when given. Entries from the
    /// file win.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut table = Self::embedded()?;
        if let Some(path) = path {
            table.extend(Self::from_file(path)?);
        }
        Ok(table)
    }

    pub fn with_alias(mut self, raw: &str, key: impl Into<String>) -> Self {
        self.aliases.insert(raw.trim().to_lowercase(), key.into());
        self
    }

    pub fn extend(&mut self, other: NameTable) {
        self.aliases.extend(other.aliases);
    }

    /// Preferred key for a raw field name.
    pub fn lookup(&self, raw: &str) -> Option<&str> {
        self.aliases
            .get(&raw.trim().to_lowercase())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    fn normalized(self) -> Self {
        Self {
            aliases: self
                .aliases
                .into_iter()
                .map(|(raw, key)| (raw.trim().to_lowercase(), key))
                .collect(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_embedded_table() {
        let table = NameTable::embedded().unwrap();
        assert!(!table.is_empty());
        assert_eq!(table.lookup("Utc_timestamp"), Some("Time1"));
        assert_eq!(table.lookup("  T_OUT "), Some("OutdoorTemperature"));
        assert_eq!(table.lookup("Temperature"), None);
    }

    #[test]
    fn test_file_overrides_embedded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[aliases]\nT_Out = \"OutsideTemp\"\nkwh = \"Energy\"").unwrap();

        let table = NameTable::load(Some(file.path())).unwrap();
        assert_eq!(table.lookup("t_out"), Some("OutsideTemp"));
        assert_eq!(table.lookup("KWH"), Some("Energy"));
        assert_eq!(table.lookup("utc_timestamp"), Some("Time1"));
    }

    #[test]
    fn test_missing_file() {
        assert!(NameTable::load(Some(Path::new("/nonexistent/names.toml"))).is_err());
    }
}
