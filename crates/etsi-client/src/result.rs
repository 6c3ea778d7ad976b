//! ETSI Client Query Results
//!
//! Cursor-style result sets returned by TSDB queries, plus conversion from
//! the IoTDB REST columnar payload and from the tab/newline text table the
//! TSDB prints.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use crate::error::SessionError;
use serde::{Deserialize, Serialize};

/// Name reported for the implicit time column.
pub const TIME_COLUMN: &str = "Time";

// =============================================================================
// Result Set
// =============================================================================

/// Result of a query execution, read one row at a time.
///
/// When the result carries timestamps, column 0 is the implicit `Time`
/// column and data columns start at index 1.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    columns: Vec<String>,
    timestamps: Option<Vec<i64>>,
    rows: Vec<Vec<Option<String>>>,
    #[serde(skip)]
    cursor: Option<usize>,
}

impl ResultSet {
    /// Create a result without a time column.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self {
            columns,
            timestamps: None,
            rows,
            cursor: None,
        }
    }

    /// Create a result whose rows are keyed by timestamp.
    pub fn with_timestamps(
        columns: Vec<String>,
        timestamps: Vec<i64>,
        rows: Vec<Vec<Option<String>>>,
    ) -> Self {
        Self {
            columns,
            timestamps: Some(timestamps),
            rows,
            cursor: None,
        }
    }

    /// Create an empty result.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a tab-separated text table. The first line is the header; a
    /// leading `Time` header marks the first column as timestamps. Cells
    /// spelled `null` read back as missing.
    pub fn from_text(raw: &str) -> Result<Self, SessionError> {
        let mut lines = raw.lines().filter(|l| !l.trim().is_empty());
        let header = match lines.next() {
            Some(header) => header,
            None => return Ok(Self::empty()),
        };

        let mut columns: Vec<String> = header.split('\t').map(|c| c.trim().to_string()).collect();
        let timed = columns
            .first()
            .map(|c| c.eq_ignore_ascii_case(TIME_COLUMN))
            .unwrap_or(false);
        if timed {
            columns.remove(0);
        }

        let mut timestamps = Vec::new();
        let mut rows = Vec::new();
        for (index, line) in lines.enumerate() {
            let mut cells = line.split('\t').map(str::trim);
            if timed {
                let ts = cells.next().unwrap_or_default();
                let ts: i64 = ts.parse().map_err(|_| {
                    SessionError::Protocol(format!("row {}: bad timestamp {:?}", index + 1, ts))
                })?;
                timestamps.push(ts);
            }
            let mut row: Vec<Option<String>> = cells
                .map(|c| if c == "null" { None } else { Some(c.to_string()) })
                .collect();
            row.resize(columns.len(), None);
            rows.push(row);
        }

        Ok(if timed {
            Self::with_timestamps(columns, timestamps, rows)
        } else {
            Self::new(columns, rows)
        })
    }

    /// Number of columns, including the time column when present.
    pub fn column_count(&self) -> usize {
        self.columns.len() + usize::from(self.has_timestamps())
    }

    /// Name of column `index`.
    pub fn column_name(&self, index: usize) -> Option<&str> {
        if self.has_timestamps() {
            if index == 0 {
                return Some(TIME_COLUMN);
            }
            return self.columns.get(index - 1).map(String::as_str);
        }
        self.columns.get(index).map(String::as_str)
    }

    /// Data column names, excluding the time column.
    pub fn data_columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns true if rows carry timestamps.
    pub fn has_timestamps(&self) -> bool {
        self.timestamps.is_some()
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Check if the result is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Advance to the next row. Returns false once the rows are exhausted.
    pub fn next(&mut self) -> bool {
        let next = self.cursor.map_or(0, |c| c + 1);
        if next < self.rows.len() {
            self.cursor = Some(next);
            true
        } else {
            self.cursor = Some(self.rows.len());
            false
        }
    }

    /// Rewind to before the first row.
    pub fn reset(&mut self) {
        self.cursor = None;
    }

    /// Text of column `index` in the current row; `None` for SQL null, an
    /// out-of-range column or when no row is current.
    pub fn get_text(&self, index: usize) -> Option<String> {
        let row = self.cursor.filter(|c| *c < self.rows.len())?;
        if let Some(timestamps) = &self.timestamps {
            if index == 0 {
                return timestamps.get(row).map(|t| t.to_string());
            }
            return self.rows[row].get(index - 1).cloned().flatten();
        }
        self.rows[row].get(index).cloned().flatten()
    }

    /// Timestamp of the current row.
    pub fn timestamp(&self) -> Option<i64> {
        let row = self.cursor?;
        self.timestamps.as_ref()?.get(row).copied()
    }

    /// Render as a tab-separated text table, the inverse of [`from_text`].
    ///
    /// [`from_text`]: ResultSet::from_text
    pub fn to_text(&self) -> String {
        let mut header: Vec<&str> = Vec::with_capacity(self.column_count());
        if self.has_timestamps() {
            header.push(TIME_COLUMN);
        }
        header.extend(self.columns.iter().map(String::as_str));

        let mut out = header.join("\t");
        out.push('\n');
        for (index, row) in self.rows.iter().enumerate() {
            let mut cells: Vec<String> = Vec::with_capacity(self.column_count());
            if let Some(timestamps) = &self.timestamps {
                cells.push(timestamps[index].to_string());
            }
            cells.extend(row.iter().map(|c| c.clone().unwrap_or_else(|| "null".to_string())));
            out.push_str(&cells.join("\t"));
            out.push('\n');
        }
        out
    }
}

// =============================================================================
// REST Payload
// =============================================================================

/// Body of a successful `/rest/v2/query` response. Values are column-major.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub expressions: Option<Vec<String>>,
    #[serde(default)]
    pub column_names: Option<Vec<String>>,
    #[serde(default)]
    pub timestamps: Option<Vec<i64>>,
    #[serde(default)]
    pub values: Vec<Vec<serde_json::Value>>,
}

impl QueryResponse {
    /// Transpose the columnar payload into a row-major [`ResultSet`].
    pub fn into_result_set(self) -> Result<ResultSet, SessionError> {
        let columns = self
            .expressions
            .or(self.column_names)
            .unwrap_or_default();

        if self.values.len() != columns.len() {
            return Err(SessionError::Protocol(format!(
                "{} value columns for {} names",
                self.values.len(),
                columns.len()
            )));
        }

        let row_count = match &self.timestamps {
            Some(ts) => ts.len(),
            None => self.values.iter().map(Vec::len).max().unwrap_or(0),
        };

        let mut rows = vec![Vec::with_capacity(columns.len()); row_count];
        for column in &self.values {
            for (index, row) in rows.iter_mut().enumerate() {
                row.push(column.get(index).and_then(json_text));
            }
        }

        Ok(match self.timestamps {
            Some(ts) => ResultSet::with_timestamps(columns, ts, rows),
            None => ResultSet::new(columns, rows),
        })
    }
}

fn json_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cursor_over_timed_rows() {
        let mut rs = ResultSet::with_timestamps(
            vec!["root.a.b.x".to_string()],
            vec![10, 20],
            vec![vec![Some("1.5".to_string())], vec![None]],
        );

        assert_eq!(rs.column_count(), 2);
        assert_eq!(rs.column_name(0), Some("Time"));
        assert_eq!(rs.column_name(1), Some("root.a.b.x"));
        assert_eq!(rs.get_text(0), None);

        assert!(rs.next());
        assert_eq!(rs.get_text(0).as_deref(), Some("10"));
        assert_eq!(rs.get_text(1).as_deref(), Some("1.5"));

        assert!(rs.next());
        assert_eq!(rs.timestamp(), Some(20));
        assert_eq!(rs.get_text(1), None);

        assert!(!rs.next());
        assert!(!rs.next());

        rs.reset();
        assert!(rs.next());
        assert_eq!(rs.timestamp(), Some(10));
    }

    #[test]
    fn test_text_table_round_trip() {
        let raw = "Time\troot.a.b.x\troot.a.b.y\n1\t2.0\tnull\n2\t3.0\tok\n";
        let rs = ResultSet::from_text(raw).unwrap();
        assert!(rs.has_timestamps());
        assert_eq!(rs.row_count(), 2);
        assert_eq!(rs.to_text(), raw);
    }

    #[test]
    fn test_text_table_without_time() {
        let rs = ResultSet::from_text("count(root.a.b.x)\n42\n").unwrap();
        assert!(!rs.has_timestamps());
        assert_eq!(rs.column_count(), 1);

        let err = ResultSet::from_text("Time\tx\nnot-a-number\t1\n").unwrap_err();
        assert!(matches!(err, SessionError::Protocol(_)));
    }

    #[test]
    fn test_rest_payload_transpose() {
        let payload: QueryResponse = serde_json::from_value(json!({
            "expressions": ["root.a.b.x", "root.a.b.flag"],
            "column_names": null,
            "timestamps": [1, 2],
            "values": [[1.5, null], [true, false]]
        }))
        .unwrap();

        let mut rs = payload.into_result_set().unwrap();
        assert!(rs.next());
        assert_eq!(rs.get_text(1).as_deref(), Some("1.5"));
        assert_eq!(rs.get_text(2).as_deref(), Some("true"));
        assert!(rs.next());
        assert_eq!(rs.get_text(1), None);
    }

    #[test]
    fn test_rest_payload_show_statement() {
        let payload: QueryResponse = serde_json::from_value(json!({
            "expressions": null,
            "column_names": ["timeseries", "dataType"],
            "timestamps": null,
            "values": [["root.a.b.x", "root.a.b.y"], ["DOUBLE", "TEXT"]]
        }))
        .unwrap();

        let mut rs = payload.into_result_set().unwrap();
        assert!(!rs.has_timestamps());
        assert_eq!(rs.row_count(), 2);
        assert!(rs.next());
        assert_eq!(rs.get_text(1).as_deref(), Some("DOUBLE"));
    }

    #[test]
    fn test_rest_payload_shape_mismatch() {
        let payload = QueryResponse {
            expressions: Some(vec!["a".to_string()]),
            values: vec![],
            ..Default::default()
        };
        assert!(payload.into_result_set().is_err());
    }
}
