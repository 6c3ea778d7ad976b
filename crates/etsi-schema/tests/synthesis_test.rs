//! Schema synthesis tests over on-disk descriptors.

use etsi_common::LogicalType;
use etsi_schema::{
    alter_statements, synthesize, NameTable, SchemaError, Sidecar, Summary, SynthesisOptions,
    DATASET_NAME_MEASUREMENT,
};
use std::io::Write;

fn write_temp(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_summary_file_to_schema() {
    let summary = write_temp(
        "field,type,min,max,mean,stddev,units\n\
         Utc_timestamp,longint,0,0,0,0,unixutc\n\
         Temperature,float,10,20,30,1,°C\n\
         interpolated,my_ds,,,,,\n",
    );

    let summary = Summary::from_path(summary.path()).unwrap();
    let names = NameTable::embedded().unwrap();
    let schema = synthesize(&summary, None, &names, &SynthesisOptions::default()).unwrap();

    let keys: Vec<_> = schema.measurements().iter().map(|m| m.name.as_str()).collect();
    assert_eq!(keys, vec!["Time1", "Temperature", DATASET_NAME_MEASUREMENT]);
    assert_eq!(schema.identifier, "my_ds");
    assert_eq!(schema.get("Time1").unwrap().logical_type, LogicalType::Int64);
    assert!(!schema.is_multi_device());
}

#[test]
fn test_multi_device_sidecar() {
    let summary = write_temp(
        "field,type,min,max,units\n\
         time,int64,1,9,seconds since 1970-01-01\n\
         Power,double,0,5,kW\n\
         Energy,double,0,0,kWh\n\
         \\,root.meters.campus,,,\n",
    );
    let sidecar = write_temp(
        "netcdf campus {\n\
         dimensions:\n\
         \tid = 3 ;\n\
         \ttime = UNLIMITED ; // (4 currently)\n\
         variables:\n\
         \tint time(time) ;\n\
         \t\ttime:units = \"seconds since 1970-01-01\" ;\n\
         \tdouble Power(id, time) ;\n\
         \t\tPower:_FillValue = -1. ;\n\
         data:\n\
         \n\
         \tid = \"b101\", \"b102\", \"b103\" ;\n\
         }\n",
    );

    let summary = Summary::from_path(summary.path()).unwrap();
    let sidecar = Sidecar::from_path(sidecar.path()).unwrap();
    let schema = synthesize(
        &summary,
        Some(&sidecar),
        &NameTable::empty(),
        &SynthesisOptions::default(),
    )
    .unwrap();

    assert_eq!(schema.identifier, "root.meters.campus");
    assert_eq!(schema.dataset_name, "campus");
    assert_eq!(schema.devices, vec!["b101", "b102", "b103"]);
    assert_eq!(schema.dimension("time"), Some(4));
    assert_eq!(schema.time().unwrap().unit, "unixutc");
    assert_eq!(schema.get("Power").unwrap().fill_value(), Some("-1"));
    assert!(schema.get("Energy").unwrap().ignore);

    // 3 devices x (Time1, Power, DatasetName) x 2 statements
    assert_eq!(alter_statements(&schema).len(), 18);
}

#[test]
fn test_custom_time_measurement_missing() {
    let summary = Summary::from_reader("field,type,min,max,units\ntime,int64,1,2,unixutc\n".as_bytes())
        .unwrap();
    let options = SynthesisOptions::new()
        .with_identifier("ds")
        .with_time_measurement("Epoch");
    let err = synthesize(&summary, None, &NameTable::empty(), &options).unwrap_err();
    assert!(matches!(err, SchemaError::MissingTimeMeasurement(_)));
}
