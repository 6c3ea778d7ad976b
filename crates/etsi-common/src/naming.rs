//! ETSI Naming - Measurement Name Normalizer
//!
//! Deterministic mapping from raw source column names to a human-facing
//! canonical form and an alias that is safe inside IoTDB path identifiers.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use serde::{Deserialize, Serialize};

// =============================================================================
// Constants
// =============================================================================

/// Alias substituted for columns literally named `time` or `timestamp`,
/// which collide with the TSDB's own time column.
pub const RESERVED_TIME_ALIAS: &str = "Time1";

const RESERVED_NAMES: [&str; 2] = ["time", "timestamp"];

/// Characters removed from canonical names.
const STRIPPED: &str = "~!@#$%^&*/?.,:;|\\=+)}]";

/// Opening brackets, kept as a separator.
const OPENERS: &str = "({[";

// =============================================================================
// Normalized Name
// =============================================================================

/// Result of normalizing one raw column name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NormalizedName {
    pub canonical: String,
    pub alias: String,
}

impl NormalizedName {
    /// Returns true when normalization had to change the canonical string to
    /// make it identifier-safe.
    pub fn changed(&self) -> bool {
        self.canonical != self.alias
    }

    /// Split into `(measurement key, human label)`.
    ///
    /// The key is always the identifier-safe alias. When normalization
    /// changed the string, the label keeps the canonical form so the original
    /// wording survives in the alias slot of the measurement.
    pub fn into_key_and_label(self) -> (String, String) {
        (self.alias, self.canonical)
    }
}

// =============================================================================
// Normalization
// =============================================================================

/// Normalize a raw column name.
pub fn normalize(raw: &str) -> NormalizedName {
    let canonical = canonicalize(raw);
    let alias = alias_for(&canonical);
    NormalizedName { canonical, alias }
}

/// Returns true if `name` is one of the reserved time column names.
pub fn is_reserved(name: &str) -> bool {
    let lower = name.trim().to_lowercase();
    RESERVED_NAMES.contains(&lower.as_str())
}

/// Returns true if `name` can be used unquoted as an IoTDB path node.
pub fn is_identifier_safe(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn canonicalize(raw: &str) -> String {
    raw.split_whitespace()
        .map(strip_word)
        .filter(|word| !word.is_empty())
        .map(|word| title_case(&word))
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_word(word: &str) -> String {
    word.chars()
        .filter(|c| !STRIPPED.contains(*c))
        .map(|c| if OPENERS.contains(c) { '_' } else { c })
        .collect()
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn alias_for(canonical: &str) -> String {
    if is_reserved(canonical) {
        return RESERVED_TIME_ALIAS.to_string();
    }

    let mut alias: String = canonical
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    match alias.chars().next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        Some(_) => alias.replace_range(..1, "_"),
        None => alias.push('_'),
    }
    alias
}

// =============================================================================
// Tests
// =============================================================================
