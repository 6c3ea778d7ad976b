//! ETSI Schema Types
//!
//! The in-memory dataset schema shared read-only by the loader and the
//! stream router: measurements in source column order, the dataset
//! namespace and the optional device partition.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use etsi_common::naming::is_identifier_safe;
use etsi_common::{LogicalType, Storage};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Key of the synthetic measurement appended to every schema.
pub const DATASET_NAME_MEASUREMENT: &str = "DatasetName";

/// Unit of values without a physical dimension.
pub const UNITLESS: &str = "unitless";

/// Unit of integer epoch-second time columns.
pub const UNIX_UTC: &str = "unixutc";

// =============================================================================
// Measurement
// =============================================================================

/// One column of a dataset and one series in the TSDB.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Identifier-safe key used in series paths.
    pub name: String,
    /// Human label kept from the source column.
    pub alias: String,
    pub logical_type: LogicalType,
    pub unit: String,
    pub column_order: usize,
    pub ignore: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub netcdf: Option<NetcdfAttributes>,
}

impl Measurement {
    pub fn new(name: impl Into<String>, logical_type: LogicalType, unit: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            alias: name.clone(),
            name,
            logical_type,
            unit: unit.into(),
            column_order: 0,
            ignore: false,
            netcdf: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    pub fn ignored(mut self, ignore: bool) -> Self {
        self.ignore = ignore;
        self
    }

    /// Storage tuple for this measurement's logical type.
    pub fn storage(&self) -> Storage {
        self.logical_type.storage()
    }

    /// Fill value declared by the sidecar, if any.
    pub fn fill_value(&self) -> Option<&str> {
        self.netcdf.as_ref()?.fill_value.as_deref()
    }
}

/// Per-variable attributes contributed by a NetCDF sidecar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetcdfAttributes {
    pub dimension_index: usize,
    pub dimensions: Vec<String>,
    pub fill_value: Option<String>,
    pub comment: Option<String>,
    pub calendar: Option<String>,
    pub long_name: Option<String>,
}

// =============================================================================
// Dataset Schema
// =============================================================================

/// Schema of one dataset, immutable once synthesized apart from the
/// measurement clear performed after a successful drop.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasetSchema {
    pub identifier: String,
    pub dataset_name: String,
    pub devices: Vec<String>,
    pub dimensions: Vec<(String, usize)>,
    pub time_measurement: String,
    measurements: Vec<Measurement>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl DatasetSchema {
    /// Build a schema from measurements already carrying contiguous
    /// column orders. Callers are expected to have checked key uniqueness.
    pub fn new(
        identifier: impl Into<String>,
        dataset_name: impl Into<String>,
        time_measurement: impl Into<String>,
        mut measurements: Vec<Measurement>,
    ) -> Self {
        measurements.sort_by_key(|m| m.column_order);
        let index = measurements
            .iter()
            .enumerate()
            .map(|(i, m)| (m.name.clone(), i))
            .collect();
        Self {
            identifier: identifier.into(),
            dataset_name: dataset_name.into(),
            devices: Vec::new(),
            dimensions: Vec::new(),
            time_measurement: time_measurement.into(),
            measurements,
            index,
        }
    }

    pub fn with_devices(mut self, devices: Vec<String>) -> Self {
        self.devices = devices;
        self
    }

    pub fn with_dimensions(mut self, dimensions: Vec<(String, usize)>) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// All measurements in column order.
    pub fn measurements(&self) -> &[Measurement] {
        &self.measurements
    }

    /// Measurements that are written to the TSDB, in column order.
    pub fn active_measurements(&self) -> impl Iterator<Item = &Measurement> {
        self.measurements.iter().filter(|m| !m.ignore)
    }

    /// Number of measurements, including ignored ones.
    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    /// Look up a measurement by key.
    pub fn get(&self, name: &str) -> Option<&Measurement> {
        match self.index.get(name) {
            Some(&i) => self.measurements.get(i),
            None => self.measurements.iter().find(|m| m.name == name),
        }
    }

    /// The time-axis measurement.
    pub fn time(&self) -> Option<&Measurement> {
        self.get(&self.time_measurement)
    }

    /// Size of a sidecar dimension.
    pub fn dimension(&self, name: &str) -> Option<usize> {
        self.dimensions
            .iter()
            .find(|(dim, _)| dim == name)
            .map(|(_, size)| *size)
    }

    /// Returns true when the dataset is partitioned into devices.
    pub fn is_multi_device(&self) -> bool {
        !self.devices.is_empty()
    }

    /// Device keys to write under; the dataset itself when there are none.
    pub fn device_keys(&self) -> Vec<String> {
        if self.devices.is_empty() {
            vec![self.dataset_name.clone()]
        } else {
            self.devices.clone()
        }
    }

    /// Path of a device: `<identifier>.<device>`, back-quoting device keys
    /// that are not valid identifiers.
    pub fn device_path(&self, device: &str) -> String {
        if is_identifier_safe(device) {
            format!("{}.{}", self.identifier, device)
        } else {
            format!("{}.`{}`", self.identifier, device.replace('`', ""))
        }
    }

    /// Drop every measurement, leaving later verbs with nothing to do.
    pub fn clear_measurements(&mut self) {
        self.measurements.clear();
        self.index.clear();
    }
}

// =============================================================================
// Tests
// =============================================================================
