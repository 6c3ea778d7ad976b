//! ETSI Stream Result Materializer
//!
//! Converts TSDB result sets into the header and rows streamed to clients,
//! and renders them as CSV or JSON text frames.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use crate::command::{Command, Format};
use etsi_client::ResultSet;
use serde::Serialize;
use serde_json::{Map, Number, Value};

/// Terminator frame of every successful stream.
pub const END_OF_DATA: &str = "<end of data>";

/// Column names of a `SHOW TIMESERIES` row, in output order.
pub const PROFILE_COLUMNS: [&str; 10] = [
    "timeseries",
    "alias",
    "database",
    "dataType",
    "encoding",
    "compression",
    "tags",
    "attributes",
    "deadband",
    "deadbandParameters",
];

// =============================================================================
// Table
// =============================================================================

/// A materialized result: one header and the rows in result order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl Table {
    pub fn new(header: Vec<String>) -> Self {
        Self {
            header,
            rows: Vec::new(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn header_frame(&self, format: Format) -> String {
        match format {
            Format::Csv => self.header.join(","),
            Format::Json => Value::from(self.header.clone()).to_string(),
        }
    }

    pub fn row_frame(&self, index: usize, format: Format) -> Option<String> {
        let row = self.rows.get(index)?;
        Some(match format {
            Format::Csv => row
                .iter()
                .map(|cell| cell.as_deref().unwrap_or(""))
                .collect::<Vec<_>>()
                .join(","),
            Format::Json => {
                let object: Map<String, Value> = self
                    .header
                    .iter()
                    .zip(row)
                    .map(|(name, cell)| (name.clone(), json_value(cell.as_deref())))
                    .collect();
                Value::Object(object).to_string()
            }
        })
    }
}

fn json_value(cell: Option<&str>) -> Value {
    let Some(text) = cell else {
        return Value::Null;
    };
    if let Ok(int) = text.parse::<i64>() {
        return Value::from(int);
    }
    if let Some(number) = text.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(number);
    }
    Value::String(text.to_string())
}

// =============================================================================
// Materialization
// =============================================================================

/// Materialize the result of a query command.
pub fn materialize(command: &Command, result: ResultSet, root: &str) -> Table {
    match command {
        Command::Groups => segments(result, root, "group"),
        Command::GroupDevice(group) => segments(result, &format!("{}.{}", root, group), "device"),
        Command::Timeseries(_) => profiles(result),
        Command::Count(_) => counts(result),
        _ => data(result),
    }
}

/// Time-ordered rows with the path prefix stripped from column names.
pub fn data(mut result: ResultSet) -> Table {
    let columns = result.column_count();
    let header = (0..columns)
        .map(|i| leaf(result.column_name(i).unwrap_or_default()).to_string())
        .collect();

    let mut table = Table::new(header);
    while result.next() {
        table
            .rows
            .push((0..columns).map(|i| result.get_text(i)).collect());
    }
    table
}

/// Distinct path nodes directly below `prefix`, in first-seen order.
pub fn segments(mut result: ResultSet, prefix: &str, label: &str) -> Table {
    let column = path_column(&result);
    let prefix = format!("{}.", prefix);

    let mut table = Table::new(vec![label.to_string()]);
    while result.next() {
        let Some(path) = result.get_text(column) else {
            continue;
        };
        let Some(rest) = path.strip_prefix(&prefix) else {
            continue;
        };
        let Some(node) = rest.split('.').next().filter(|n| !n.is_empty()) else {
            continue;
        };
        let node = Some(node.to_string());
        if !table.rows.iter().any(|row| row[0] == node) {
            table.rows.push(vec![node]);
        }
    }
    table
}

/// One row per series of a `SHOW TIMESERIES` result.
pub fn profiles(mut result: ResultSet) -> Table {
    let positions: Vec<Option<usize>> = PROFILE_COLUMNS
        .iter()
        .map(|name| find_column(&result, name))
        .collect();

    let mut table = Table::new(PROFILE_COLUMNS.iter().map(|c| c.to_string()).collect());
    while result.next() {
        let profile = TimeseriesProfile::from_cells(
            positions
                .iter()
                .map(|p| p.and_then(|i| result.get_text(i)))
                .collect(),
        );
        table.rows.push(profile.into_cells());
    }
    table
}

/// `measurement,count` pairs from a `SELECT COUNT(*)` result.
pub fn counts(mut result: ResultSet) -> Table {
    let mut table = Table::new(vec!["measurement".to_string(), "count".to_string()]);
    if !result.next() {
        return table;
    }
    for i in 0..result.column_count() {
        let Some(name) = result.column_name(i) else {
            continue;
        };
        let Some(series) = name
            .strip_prefix("count(")
            .or_else(|| name.strip_prefix("COUNT("))
            .and_then(|s| s.strip_suffix(')'))
        else {
            continue;
        };
        let measurement = leaf(series).to_string();
        table.rows.push(vec![Some(measurement), result.get_text(i)]);
    }
    table
}

// =============================================================================
// Timeseries Profile
// =============================================================================

/// Metadata of one stored series.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeseriesProfile {
    pub timeseries: Option<String>,
    pub alias: Option<String>,
    pub database: Option<String>,
    pub data_type: Option<String>,
    pub encoding: Option<String>,
    pub compression: Option<String>,
    pub tags: Option<String>,
    pub attributes: Option<String>,
    pub deadband: Option<String>,
    pub deadband_parameters: Option<String>,
}

impl TimeseriesProfile {
    /// Build from cells in [`PROFILE_COLUMNS`] order.
    pub fn from_cells(cells: Vec<Option<String>>) -> Self {
        let mut cells = cells.into_iter();
        let mut next = || cells.next().flatten();
        Self {
            timeseries: next(),
            alias: next(),
            database: next(),
            data_type: next(),
            encoding: next(),
            compression: next(),
            tags: next(),
            attributes: next(),
            deadband: next(),
            deadband_parameters: next(),
        }
    }

    pub fn into_cells(self) -> Vec<Option<String>> {
        vec![
            self.timeseries,
            self.alias,
            self.database,
            self.data_type,
            self.encoding,
            self.compression,
            self.tags,
            self.attributes,
            self.deadband,
            self.deadband_parameters,
        ]
    }
}

fn find_column(result: &ResultSet, name: &str) -> Option<usize> {
    (0..result.column_count()).find(|&i| {
        result
            .column_name(i)
            .map(|c| c.eq_ignore_ascii_case(name))
            .unwrap_or(false)
    })
}

fn path_column(result: &ResultSet) -> usize {
    find_column(result, "timeseries").unwrap_or(0)
}

/// Last node of a dotted path.
fn leaf(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}

// =============================================================================
// Tests
// =============================================================================
