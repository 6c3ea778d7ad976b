//! ETSI Loader Dataset
//!
//! The source table of a load: a header row and raw text cells, read with
//! the `csv` crate and never reinterpreted until a literal is formatted.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use crate::error::Result;
use etsi_schema::DatasetSchema;
use std::io::Read;
use std::path::Path;
use tracing::info;

/// Magnitude below which floating point cells are written as zero.
pub const TINY_VALUE: f64 = 1e-9;

/// A tabular dataset held as text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Dataset {
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { header, rows }
    }

    /// Read a CSV dataset from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Read a CSV dataset whose first record is the header.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv = csv::ReaderBuilder::new()
            .flexible(true)
            .has_headers(true)
            .from_reader(reader);

        let header = csv.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in csv.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { header, rows })
    }

    /// Number of data rows, header excluded.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell text, or an empty string past the end of a short row.
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Rewrite floating point cells whose magnitude is below [`TINY_VALUE`]
    /// to `0`. Returns the number of substituted cells.
    pub fn clamp_tiny_values(&mut self, schema: &DatasetSchema) -> usize {
        let columns: Vec<usize> = schema
            .active_measurements()
            .filter(|m| m.logical_type.is_floating())
            .map(|m| m.column_order)
            .collect();

        let mut substituted = 0;
        for row in &mut self.rows {
            for &column in &columns {
                let Some(cell) = row.get_mut(column) else {
                    continue;
                };
                if is_tiny(cell) {
                    *cell = "0".to_string();
                    substituted += 1;
                }
            }
        }

        if substituted > 0 {
            info!("Clamped {} near-zero values to 0", substituted);
        }
        substituted
    }
}

/// Zero in any spelling counts; a cell that already reads `0` does not.
fn is_tiny(cell: &str) -> bool {
    let cell = cell.trim();
    if cell == "0" {
        return false;
    }
    match cell.parse::<f64>() {
        Ok(v) => v.abs() < TINY_VALUE,
        Err(_) => false,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use etsi_common::LogicalType;
    use etsi_schema::Measurement;

    fn schema() -> DatasetSchema {
        let mut time = Measurement::new("Time1", LogicalType::Int64, "unixutc");
        time.column_order = 0;
        let mut temp = Measurement::new("Temperature", LogicalType::Float, "°C");
        temp.column_order = 1;
        let mut count = Measurement::new("Count", LogicalType::Int32, "unitless");
        count.column_order = 2;
        DatasetSchema::new("ds", "ds", "Time1", vec![time, temp, count])
    }

    #[test]
    fn test_read_csv() {
        let data = Dataset::from_reader("time,temp\n1,2.5\n2,\n".as_bytes()).unwrap();
        assert_eq!(data.header, vec!["time", "temp"]);
        assert_eq!(data.row_count(), 2);
        assert_eq!(data.cell(1, 1), "");
        assert_eq!(data.cell(5, 0), "");
    }

    #[test]
    fn test_tiny_value_clamp() {
        let mut data = Dataset::new(
            vec!["t".into(), "temp".into(), "n".into()],
            vec![
                vec!["1".into(), "1e-12".into(), "0".into()],
                vec!["2".into(), "-3e-10".into(), "0".into()],
                vec!["3".into(), "0.5".into(), "0".into()],
                vec!["4".into(), "NaN".into(), "0".into()],
                vec!["5".into(), "0.0".into(), "0".into()],
                vec!["6".into(), "-0".into(), "0".into()],
                vec!["7".into(), "0e0".into(), "0".into()],
                vec!["8".into(), "0".into(), "0".into()],
            ],
        );
        let substituted = data.clamp_tiny_values(&schema());

        assert_eq!(substituted, 5);
        assert_eq!(data.cell(0, 1), "0");
        assert_eq!(data.cell(1, 1), "0");
        assert_eq!(data.cell(2, 1), "0.5");
        assert_eq!(data.cell(3, 1), "NaN");
        for row in 4..8 {
            assert_eq!(data.cell(row, 1), "0");
        }
    }

    #[test]
    fn test_clamp_skips_integer_columns() {
        let mut data = Dataset::new(
            vec![],
            vec![vec!["1e-12".into(), "1".into(), "1e-12".into()]],
        );
        assert_eq!(data.clamp_tiny_values(&schema()), 0);
        assert_eq!(data.cell(0, 2), "1e-12");
    }
}
