//! ETSI Loader Statements
//!
//! SQL text for the lifecycle verbs.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use crate::literal::{format_cell, quote};
use etsi_schema::{DatasetSchema, DATASET_NAME_MEASUREMENT};

pub fn create_database(schema: &DatasetSchema) -> String {
    format!("CREATE DATABASE {}", schema.identifier)
}

/// One `CREATE ALIGNED TIMESERIES` per device. Empty when every
/// measurement is ignored or the schema was cleared.
pub fn create_timeseries(schema: &DatasetSchema) -> Vec<String> {
    let declarations: Vec<String> = schema
        .active_measurements()
        .map(|m| m.storage().declaration(&m.name))
        .collect();
    if declarations.is_empty() {
        return Vec::new();
    }

    let body = declarations.join(", ");
    schema
        .device_keys()
        .iter()
        .map(|device| {
            format!(
                "CREATE ALIGNED TIMESERIES {}({})",
                schema.device_path(device),
                body
            )
        })
        .collect()
}

pub fn drop_timeseries(schema: &DatasetSchema) -> Vec<String> {
    schema
        .device_keys()
        .iter()
        .map(|device| format!("DROP TIMESERIES {}.*", schema.device_path(device)))
        .collect()
}

pub fn delete_data(schema: &DatasetSchema) -> Vec<String> {
    let mut statements = Vec::new();
    for device in schema.device_keys() {
        let path = schema.device_path(&device);
        for measurement in schema.active_measurements() {
            statements.push(format!("DELETE FROM {}.{}", path, measurement.name));
        }
    }
    statements
}

/// A multi-row aligned INSERT. `rows` pairs the parsed epoch time with the
/// row's source cells.
pub fn insert(schema: &DatasetSchema, device: &str, rows: &[(i64, &[String])]) -> String {
    let measurements: Vec<_> = schema.active_measurements().collect();
    let columns: Vec<&str> = measurements.iter().map(|m| m.name.as_str()).collect();
    let dataset_literal = quote(&schema.dataset_name);

    let values: Vec<String> = rows
        .iter()
        .map(|(time, cells)| {
            let mut literals = Vec::with_capacity(measurements.len() + 1);
            literals.push(time.to_string());
            for m in &measurements {
                if m.name == DATASET_NAME_MEASUREMENT {
                    literals.push(dataset_literal.clone());
                } else {
                    let cell = cells.get(m.column_order).map(String::as_str).unwrap_or("");
                    literals.push(format_cell(cell, m));
                }
            }
            format!("({})", literals.join(","))
        })
        .collect();

    format!(
        "INSERT INTO {} (time,{}) ALIGNED VALUES {};",
        schema.device_path(device),
        columns.join(","),
        values.join(",")
    )
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
        let mut spare = Measurement::new("Spare", LogicalType::Double, "kW").ignored(true);
        spare.column_order = 2;
        let mut name = Measurement::new(DATASET_NAME_MEASUREMENT, LogicalType::String, "unitless");
        name.column_order = 3;
        DatasetSchema::new("my_ds", "my_ds", "Time1", vec![time, temp, spare, name])
    }

    #[test]
    fn test_insert_shape() {
        let row = vec!["1700000000".to_string(), "21.5".to_string(), "9".to_string()];
        let sql = insert(&schema(), "my_ds", &[(1_700_000_000, row.as_slice())]);
        assert_eq!(
            sql,
            "INSERT INTO my_ds.my_ds (time,Time1,Temperature,DatasetName) ALIGNED VALUES \
             (1700000000,1700000000,21.5,'my_ds');"
        );
    }

    #[test]
    fn test_insert_multiple_rows_and_short_row() {
        let a = vec!["1".to_string(), "2.5".to_string()];
        let b = vec!["2".to_string()];
        let sql = insert(&schema(), "my_ds", &[(1, a.as_slice()), (2, b.as_slice())]);
        assert!(sql.ends_with("VALUES (1,1,2.5,'my_ds'),(2,2,null,'my_ds');"));
    }

    #[test]
    fn test_create_timeseries_skips_ignored() {
        let statements = create_timeseries(&schema());
        assert_eq!(
            statements,
            vec![
                "CREATE ALIGNED TIMESERIES my_ds.my_ds(\
                 Time1 INT64 encoding=GORILLA compressor=SNAPPY, \
                 Temperature FLOAT encoding=GORILLA compressor=SNAPPY, \
                 DatasetName TEXT encoding=PLAIN compressor=SNAPPY)"
                    .to_string()
            ]
        );
    }

    #[test]
    fn test_per_device_statements() {
        let schema = schema().with_devices(vec!["a".into(), "1b".into()]);
        assert_eq!(create_database(&schema), "CREATE DATABASE my_ds");
        assert_eq!(
            drop_timeseries(&schema),
            vec!["DROP TIMESERIES my_ds.a.*", "DROP TIMESERIES my_ds.`1b`.*"]
        );
        let deletes = delete_data(&schema);
        assert_eq!(deletes.len(), 6);
        assert_eq!(deletes[0], "DELETE FROM my_ds.a.Time1");
        assert_eq!(deletes[5], "DELETE FROM my_ds.`1b`.DatasetName");
    }

    #[test]
    fn test_cleared_schema_creates_nothing() {
        let mut schema = schema();
        schema.clear_measurements();
        assert!(create_timeseries(&schema).is_empty());
        assert!(delete_data(&schema).is_empty());
    }
}
