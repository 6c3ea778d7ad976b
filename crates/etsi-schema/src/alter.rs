//! ETSI Schema ALTER Catalog
//!
//! Attribute and tag statements that annotate created series with their
//! logical type and unit.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use crate::types::DatasetSchema;

/// ALTER statements for every device and non-ignored measurement, two per
/// series: the `datatype` attribute and the `units` tag.
pub fn alter_statements(schema: &DatasetSchema) -> Vec<String> {
    let mut statements = Vec::new();
    for device in schema.device_keys() {
        let device_path = schema.device_path(&device);
        for measurement in schema.active_measurements() {
            let path = format!("{}.{}", device_path, measurement.name);
            statements.push(format!(
                "ALTER timeseries {} ADD ATTRIBUTES 'datatype'='{}'",
                path, measurement.logical_type
            ));
            statements.push(format!(
                "ALTER timeseries {} ADD TAGS 'units'='{}'",
                path,
                measurement.unit.replace('\'', "`")
            ));
        }
    }
    statements
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Measurement;
    use etsi_common::LogicalType;

    #[test]
    fn test_statements_per_device_and_measurement() {
        let mut time = Measurement::new("Time1", LogicalType::Int64, "unixutc");
        time.column_order = 0;
        let mut power = Measurement::new("Power", LogicalType::Double, "kW");
        power.column_order = 1;
        let mut spare = Measurement::new("Spare", LogicalType::Double, "kW").ignored(true);
        spare.column_order = 2;

        let schema = DatasetSchema::new("root.m", "m", "Time1", vec![time, power, spare])
            .with_devices(vec!["a".into(), "b".into()]);
        let statements = alter_statements(&schema);

        assert_eq!(statements.len(), 8);
        assert_eq!(
            statements[0],
            "ALTER timeseries root.m.a.Time1 ADD ATTRIBUTES 'datatype'='int64'"
        );
        assert_eq!(
            statements[3],
            "ALTER timeseries root.m.a.Power ADD TAGS 'units'='kW'"
        );
        assert!(statements.iter().all(|s| !s.contains("Spare")));
    }
}
