//! ETSI Schema Summary Descriptor
//!
//! Reader for `summary_*.csv` descriptors: one row per source column with
//! its declared type, range statistics and units, closed by a terminator
//! row carrying the dataset identifier.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use crate::error::{Result, SchemaError};
use std::io::Read;
use std::path::Path;

/// Field values that end the measurement rows of a summary.
const TERMINATORS: [&str; 2] = ["interpolated", "\\"];

// =============================================================================
// Summary Row
// =============================================================================

/// One described source column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryRow {
    pub field: String,
    pub type_name: String,
    pub min: String,
    pub max: String,
    pub mean: Option<String>,
    pub units: String,
}

impl SummaryRow {
    pub fn new(field: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            type_name: type_name.into(),
            ..Default::default()
        }
    }

    pub fn with_stats(mut self, min: &str, max: &str, mean: Option<&str>) -> Self {
        self.min = min.to_string();
        self.max = max.to_string();
        self.mean = mean.map(str::to_string);
        self
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = units.into();
        self
    }

    /// Returns true when every present statistic parses to zero, which marks
    /// a column with no signal.
    pub fn is_all_zero(&self) -> bool {
        let zero = |cell: &str| cell.trim().parse::<f64>().map(|v| v == 0.0).unwrap_or(false);
        zero(&self.min) && zero(&self.max) && self.mean.as_deref().map(zero).unwrap_or(true)
    }
}

// =============================================================================
// Summary
// =============================================================================

/// A parsed summary descriptor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    pub rows: Vec<SummaryRow>,
    /// Identifier from the terminator row, if the summary has one.
    pub identifier: Option<String>,
}

/// Header positions resolved by name.
struct Columns {
    field: usize,
    type_name: usize,
    min: usize,
    max: usize,
    mean: Option<usize>,
    units: usize,
}

impl Columns {
    fn resolve(headers: &csv::StringRecord) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let require = |name: &str| {
            find(name).ok_or_else(|| SchemaError::Summary(format!("missing '{}' column", name)))
        };

        Ok(Self {
            field: require("field")?,
            type_name: require("type")?,
            min: require("min")?,
            max: require("max")?,
            mean: find("mean"),
            units: require("units")?,
        })
    }
}

impl Summary {
    pub fn new(rows: Vec<SummaryRow>) -> Self {
        Self {
            rows,
            identifier: None,
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    /// Read a summary from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Parse a summary, stopping at the first terminator row.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv = csv::ReaderBuilder::new()
            .flexible(true)
            .has_headers(true)
            .from_reader(reader);

        let columns = Columns::resolve(csv.headers()?)?;
        let mut summary = Summary::default();

        for record in csv.records() {
            let record = record?;
            let cell = |i: usize| record.get(i).unwrap_or("").trim().to_string();

            let field = cell(columns.field);
            if TERMINATORS.contains(&field.as_str()) {
                let identifier = record.get(1).unwrap_or("").trim();
                if !identifier.is_empty() {
                    summary.identifier = Some(identifier.to_string());
                }
                break;
            }
            if field.is_empty() {
                continue;
            }

            summary.rows.push(SummaryRow {
                field,
                type_name: cell(columns.type_name),
                min: cell(columns.min),
                max: cell(columns.max),
                mean: columns.mean.map(cell),
                units: cell(columns.units),
            });
        }

        Ok(summary)
    }
}

// =============================================================================
// Tests
// =============================================================================
