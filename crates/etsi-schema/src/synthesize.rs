//! ETSI Schema Synthesizer
//!
//! Builds a [`DatasetSchema`] from a summary descriptor and an optional
//! NetCDF sidecar: names are normalized, types mapped, units repaired and
//! the device partition taken from the sidecar.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use crate::error::{Result, SchemaError};
use crate::names::NameTable;
use crate::sidecar::{Sidecar, SidecarVariable};
use crate::summary::{Summary, SummaryRow};
use crate::types::{
    DatasetSchema, Measurement, NetcdfAttributes, DATASET_NAME_MEASUREMENT, UNITLESS, UNIX_UTC,
};
use etsi_common::{normalize, LogicalType, RESERVED_TIME_ALIAS};
use std::collections::HashMap;
use tracing::{debug, info, warn};

// =============================================================================
// Options
// =============================================================================

/// Caller-supplied synthesis settings.
#[derive(Debug, Clone)]
pub struct SynthesisOptions {
    /// Key of the measurement that carries the time axis.
    pub time_measurement: String,
    /// Identifier used when the summary has no terminator row.
    pub identifier: Option<String>,
    /// Dataset name; defaults to the last dotted segment of the identifier.
    pub dataset_name: Option<String>,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            time_measurement: RESERVED_TIME_ALIAS.to_string(),
            identifier: None,
            dataset_name: None,
        }
    }
}

impl SynthesisOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_time_measurement(mut self, key: impl Into<String>) -> Self {
        self.time_measurement = key.into();
        self
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_dataset_name(mut self, name: impl Into<String>) -> Self {
        self.dataset_name = Some(name.into());
        self
    }
}

// =============================================================================
// Synthesis
// =============================================================================

/// Synthesize the schema of one dataset.
pub fn synthesize(
    summary: &Summary,
    sidecar: Option<&Sidecar>,
    names: &NameTable,
    options: &SynthesisOptions,
) -> Result<DatasetSchema> {
    let identifier = summary
        .identifier
        .clone()
        .or_else(|| options.identifier.clone())
        .filter(|id| !id.trim().is_empty())
        .ok_or(SchemaError::MissingIdentifier)?;
    let dataset_name = options
        .dataset_name
        .clone()
        .unwrap_or_else(|| last_segment(&identifier).to_string());

    let mut measurements = Vec::with_capacity(summary.rows.len() + 1);
    let mut seen: HashMap<String, String> = HashMap::new();

    for row in &summary.rows {
        let variable = sidecar.and_then(|s| s.variable(&row.field));
        let measurement = build_measurement(row, variable, names, measurements.len());
        check_unique(&mut seen, &measurement.name, &row.field)?;
        debug!(
            "Measurement {} ({}) <- '{}' {} [{}]{}",
            measurement.name,
            measurement.alias,
            row.field,
            measurement.logical_type,
            measurement.unit,
            if measurement.ignore { " ignored" } else { "" }
        );
        measurements.push(measurement);
    }

    check_unique(&mut seen, DATASET_NAME_MEASUREMENT, DATASET_NAME_MEASUREMENT)?;
    let mut dataset = Measurement::new(DATASET_NAME_MEASUREMENT, LogicalType::String, UNITLESS);
    dataset.column_order = measurements.len();
    measurements.push(dataset);

    let time = measurements
        .iter_mut()
        .find(|m| m.name == options.time_measurement)
        .ok_or_else(|| SchemaError::MissingTimeMeasurement(options.time_measurement.clone()))?;
    time.ignore = false;

    let mut schema = DatasetSchema::new(
        identifier,
        dataset_name,
        options.time_measurement.clone(),
        measurements,
    );

    if let Some(sidecar) = sidecar {
        schema = schema
            .with_dimensions(sidecar.dimensions.clone())
            .with_devices(sidecar.device_ids());
    }

    info!(
        "Synthesized schema {} ({} measurements, {} ignored, {} devices)",
        schema.identifier,
        schema.len(),
        schema.measurements().iter().filter(|m| m.ignore).count(),
        schema.devices.len()
    );

    Ok(schema)
}

fn build_measurement(
    row: &SummaryRow,
    variable: Option<&SidecarVariable>,
    names: &NameTable,
    column_order: usize,
) -> Measurement {
    let (key, label) = match names.lookup(&row.field) {
        Some(preferred) => (preferred.to_string(), normalize(&row.field).canonical),
        None => normalize(&row.field).into_key_and_label(),
    };

    let logical_type = resolve_type(row, variable);
    let raw_unit = variable
        .and_then(SidecarVariable::units)
        .unwrap_or(row.units.as_str());
    let unit = repair_unit(&key, raw_unit);

    let mut measurement = Measurement::new(key, logical_type, unit)
        .with_alias(label)
        .ignored(row.is_all_zero());
    measurement.column_order = column_order;
    measurement.netcdf = variable.map(netcdf_attributes);
    measurement
}

fn resolve_type(row: &SummaryRow, variable: Option<&SidecarVariable>) -> LogicalType {
    if let Some(parsed) = LogicalType::parse(&row.type_name) {
        return parsed;
    }
    if let Some(parsed) = variable.and_then(|v| LogicalType::from_netcdf(&v.type_name)) {
        return parsed;
    }
    warn!(
        "Unknown type '{}' for field '{}', defaulting to string",
        row.type_name, row.field
    );
    LogicalType::String
}

/// Apply the unit heuristics for a measurement key.
pub fn repair_unit(key: &str, unit: &str) -> String {
    let unit = unit.trim();
    if unit.contains(char::is_whitespace) {
        return UNIX_UTC.to_string();
    }
    if !unit.is_empty() && unit != UNITLESS {
        return unit.to_string();
    }

    let inferred = if key.contains("Temperature") || key.contains("Setpoint") {
        "°F"
    } else if key.contains("RunTime") {
        "seconds"
    } else if key.contains("Humidity") {
        "%rh"
    } else if key.contains("DetectedMotion") {
        "boolean"
    } else {
        UNITLESS
    };
    inferred.to_string()
}

fn netcdf_attributes(variable: &SidecarVariable) -> NetcdfAttributes {
    let attr = |name: &str| variable.attribute(name).map(str::to_string);
    NetcdfAttributes {
        dimension_index: variable.index,
        dimensions: variable.dimensions.clone(),
        fill_value: attr("_FillValue"),
        comment: attr("comment"),
        calendar: attr("calendar"),
        long_name: attr("long_name"),
    }
}

fn check_unique(seen: &mut HashMap<String, String>, key: &str, field: &str) -> Result<()> {
    if let Some(first) = seen.get(key) {
        return Err(SchemaError::DuplicateMeasurement {
            key: key.to_string(),
            first: first.clone(),
            second: field.to_string(),
        });
    }
    seen.insert(key.to_string(), field.to_string());
    Ok(())
}

fn last_segment(identifier: &str) -> &str {
    identifier.rsplit('.').next().unwrap_or(identifier)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn e1_summary() -> Summary {
        Summary::new(vec![
            SummaryRow::new("Utc_timestamp", "longint")
                .with_stats("0", "0", Some("0"))
                .with_units("unixutc"),
            SummaryRow::new("Temperature", "float")
                .with_stats("10", "20", Some("30"))
                .with_units("°C"),
        ])
        .with_identifier("my_ds")
    }

    #[test]
    fn test_schema_from_summary() {
        let names = NameTable::embedded().unwrap();
        let schema = synthesize(&e1_summary(), None, &names, &SynthesisOptions::default()).unwrap();

        assert_eq!(schema.identifier, "my_ds");
        assert_eq!(schema.dataset_name, "my_ds");
        assert_eq!(schema.time_measurement, "Time1");
        assert_eq!(schema.len(), 3);

        let time = schema.get("Time1").unwrap();
        assert_eq!(time.logical_type, LogicalType::Int64);
        assert_eq!(time.unit, "unixutc");
        assert!(!time.ignore);

        let temp = schema.get("Temperature").unwrap();
        assert_eq!(temp.logical_type, LogicalType::Float);
        assert_eq!(temp.unit, "°C");

        let last = schema.measurements().last().unwrap();
        assert_eq!(last.name, DATASET_NAME_MEASUREMENT);
        assert_eq!(last.logical_type, LogicalType::String);
        assert_eq!(last.unit, UNITLESS);
    }

    #[test]
    fn test_column_order_is_permutation() {
        let summary = Summary::new(vec![
            SummaryRow::new("time", "longint").with_units("unixutc"),
            SummaryRow::new("a b", "double"),
            SummaryRow::new("c", "int"),
        ])
        .with_identifier("root.x.y");
        let schema = synthesize(&summary, None, &NameTable::empty(), &SynthesisOptions::default())
            .unwrap();

        let mut orders: Vec<_> = schema.measurements().iter().map(|m| m.column_order).collect();
        orders.sort_unstable();
        assert_eq!(orders, (0..schema.len()).collect::<Vec<_>>());
        assert_eq!(schema.dataset_name, "y");
    }

    #[test]
    fn test_reserved_time_column() {
        let summary = Summary::new(vec![SummaryRow::new("time", "longint").with_units("unixutc")])
            .with_identifier("ds");
        let schema = synthesize(&summary, None, &NameTable::empty(), &SynthesisOptions::default())
            .unwrap();
        let time = schema.time().unwrap();
        assert_eq!(time.name, "Time1");
        assert_eq!(time.alias, "Time");
    }

    #[test]
    fn test_missing_time_measurement() {
        let summary = Summary::new(vec![SummaryRow::new("Power", "double")]).with_identifier("ds");
        let err = synthesize(&summary, None, &NameTable::empty(), &SynthesisOptions::default())
            .unwrap_err();
        assert!(matches!(err, SchemaError::MissingTimeMeasurement(ref key) if key == "Time1"));
    }

    #[test]
    fn test_duplicate_after_normalization() {
        let summary = Summary::new(vec![
            SummaryRow::new("time", "longint"),
            SummaryRow::new("Outdoor Temp", "float"),
            SummaryRow::new("outdoor temp", "float"),
        ])
        .with_identifier("ds");
        let err = synthesize(&summary, None, &NameTable::empty(), &SynthesisOptions::default())
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateMeasurement { ref key, .. } if key == "OutdoorTemp"));
    }

    #[test]
    fn test_missing_identifier() {
        let summary = Summary::new(vec![SummaryRow::new("time", "longint")]);
        let err = synthesize(&summary, None, &NameTable::empty(), &SynthesisOptions::default())
            .unwrap_err();
        assert!(matches!(err, SchemaError::MissingIdentifier));

        let options = SynthesisOptions::new().with_identifier("root.fallback");
        let schema = synthesize(&summary, None, &NameTable::empty(), &options).unwrap();
        assert_eq!(schema.identifier, "root.fallback");
    }

    #[test]
    fn test_unknown_type_defaults_to_string() {
        let summary = Summary::new(vec![
            SummaryRow::new("time", "longint"),
            SummaryRow::new("Label", "varchar"),
        ])
        .with_identifier("ds");
        let schema = synthesize(&summary, None, &NameTable::empty(), &SynthesisOptions::default())
            .unwrap();
        assert_eq!(schema.get("Label").unwrap().logical_type, LogicalType::String);
    }

    #[test]
    fn test_unit_heuristics() {
        assert_eq!(repair_unit("Time1", "seconds since 1970"), UNIX_UTC);
        assert_eq!(repair_unit("OutdoorTemperature", ""), "°F");
        assert_eq!(repair_unit("HeatSetpoint", "unitless"), "°F");
        assert_eq!(repair_unit("FanRunTime", ""), "seconds");
        assert_eq!(repair_unit("Humidity", ""), "%rh");
        assert_eq!(repair_unit("ThermostatDetectedMotion", ""), "boolean");
        assert_eq!(repair_unit("Mode", ""), UNITLESS);
        assert_eq!(repair_unit("Power", ""), UNITLESS);
        assert_eq!(repair_unit("Power", "kW"), "kW");
    }

    #[test]
    fn test_all_zero_columns_ignored() {
        let summary = Summary::new(vec![
            SummaryRow::new("time", "longint").with_stats("0", "0", Some("0")),
            SummaryRow::new("Spare", "double").with_stats("0", "0", Some("0")),
            SummaryRow::new("Power", "double").with_stats("0", "4", Some("1")),
        ])
        .with_identifier("ds");
        let schema = synthesize(&summary, None, &NameTable::empty(), &SynthesisOptions::default())
            .unwrap();
        assert!(!schema.get("Time1").unwrap().ignore);
        assert!(schema.get("Spare").unwrap().ignore);
        assert!(!schema.get("Power").unwrap().ignore);
    }

    #[test]
    fn test_sidecar_enrichment() {
        let cdl = "dimensions:\n id = 2 ;\n time = 3 ;\nvariables:\n float Temp(id, time) ;\n  Temp:units = \"degC\" ;\n  Temp:_FillValue = -999.f ;\n int time(time) ;\ndata:\n id = 7, 9 ;\n";
        let sidecar = Sidecar::parse(cdl).unwrap();
        let summary = Summary::new(vec![
            SummaryRow::new("time", "int64").with_units("unixutc"),
            SummaryRow::new("Temp", "mystery").with_units("K"),
        ])
        .with_identifier("root.meters");
        let schema = synthesize(
            &summary,
            Some(&sidecar),
            &NameTable::empty(),
            &SynthesisOptions::default(),
        )
        .unwrap();

        let temp = schema.get("Temp").unwrap();
        assert_eq!(temp.unit, "degC");
        assert_eq!(temp.logical_type, LogicalType::Float);
        assert_eq!(temp.fill_value(), Some("-999"));
        assert_eq!(temp.netcdf.as_ref().map(|n| n.dimension_index), Some(0));

        assert_eq!(schema.devices, vec!["7".to_string(), "9".to_string()]);
        assert_eq!(schema.dimension("time"), Some(3));
    }
}
