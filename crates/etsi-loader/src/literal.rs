//! ETSI Loader Literals
//!
//! SQL literal formatting for source cells, one rule per logical type.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use etsi_common::LogicalType;
use etsi_schema::Measurement;

pub const NULL: &str = "null";

const TRUTHY: [&str; 6] = ["1", "true", "t", "yes", "y", "on"];

/// Format one cell as an SQL literal for the given logical type.
pub fn format_literal(text: &str, logical_type: LogicalType) -> String {
    let trimmed = text.trim();
    match logical_type {
        LogicalType::Double | LogicalType::Float => {
            if trimmed.is_empty() {
                NULL.to_string()
            } else {
                trimmed.to_string()
            }
        }
        LogicalType::Int32 | LogicalType::Int64 => {
            if trimmed.is_empty() {
                return NULL.to_string();
            }
            let integral = trimmed.split('.').next().unwrap_or_default();
            match integral {
                "" | "-" | "+" => "0".to_string(),
                _ => integral.to_string(),
            }
        }
        LogicalType::Boolean => {
            if trimmed.is_empty() {
                NULL.to_string()
            } else if TRUTHY.contains(&trimmed.to_ascii_lowercase().as_str()) {
                "1".to_string()
            } else {
                "0".to_string()
            }
        }
        LogicalType::String | LogicalType::Datetime => quote(text),
    }
}

/// Quote text as a string literal, replacing both quote characters with a
/// back-tick.
pub fn quote(text: &str) -> String {
    let escaped: String = text
        .chars()
        .map(|c| if c == '"' || c == '\'' { '`' } else { c })
        .collect();
    format!("'{}'", escaped)
}

/// Format a cell for a measurement, mapping its declared fill value to
/// `null`.
pub fn format_cell(text: &str, measurement: &Measurement) -> String {
    if let Some(fill) = measurement.fill_value() {
        if is_fill(text, fill) {
            return NULL.to_string();
        }
    }
    format_literal(text, measurement.logical_type)
}

fn is_fill(text: &str, fill: &str) -> bool {
    let text = text.trim();
    if text == fill {
        return true;
    }
    match (text.parse::<f64>(), fill.parse::<f64>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floating_unchanged() {
        assert_eq!(format_literal("21.5", LogicalType::Float), "21.5");
        assert_eq!(format_literal("1e-3", LogicalType::Double), "1e-3");
        assert_eq!(format_literal("", LogicalType::Double), "null");
    }

    #[test]
    fn test_integer_truncation() {
        assert_eq!(format_literal("42.9", LogicalType::Int32), "42");
        assert_eq!(format_literal("-7.1", LogicalType::Int64), "-7");
        assert_eq!(format_literal("1700000000", LogicalType::Int64), "1700000000");
        assert_eq!(format_literal(".5", LogicalType::Int32), "0");
        assert_eq!(format_literal(" ", LogicalType::Int32), "null");
    }

    #[test]
    fn test_boolean() {
        for truthy in ["1", "TRUE", "t", "Yes", "y", "on"] {
            assert_eq!(format_literal(truthy, LogicalType::Boolean), "1");
        }
        assert_eq!(format_literal("off", LogicalType::Boolean), "0");
        assert_eq!(format_literal("0", LogicalType::Boolean), "0");
        assert_eq!(format_literal("", LogicalType::Boolean), "null");
    }

    #[test]
    fn test_text_quoting() {
        assert_eq!(format_literal("heat", LogicalType::String), "'heat'");
        assert_eq!(format_literal("it's \"on\"", LogicalType::String), "'it`s `on`'");
        assert_eq!(format_literal("2024-01-01", LogicalType::Datetime), "'2024-01-01'");
        assert_eq!(format_literal("", LogicalType::String), "''");
    }

    #[test]
    fn test_fill_value_is_null() {
        let mut m = Measurement::new("Temp", LogicalType::Float, "degC");
        m.netcdf = Some(etsi_schema::NetcdfAttributes {
            fill_value: Some("-999".to_string()),
            ..Default::default()
        });
        assert_eq!(format_cell("-999", &m), "null");
        assert_eq!(format_cell("-999.0", &m), "null");
        assert_eq!(format_cell("12.5", &m), "12.5");
    }
}
