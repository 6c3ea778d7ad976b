//! ETSI Schema - Dataset Schema Synthesizer
//!
//! Turns a tabular summary descriptor and an optional NetCDF-style sidecar
//! into the schema of a family of aligned TSDB series. The schema is built
//! once and shared read-only by the loader and the stream router.
//!
//! Key Features:
//! - Summary descriptor reader with header-name column lookup
//! - CDL sidecar parser (dimensions, attributes, data block)
//! - Embedded, extensible name table for preferred measurement keys
//! - Unit repair heuristics and all-zero column detection
//! - Device partition from the sidecar `id` dimension
//! - ALTER catalog for datatype attributes and unit tags
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

pub mod alter;
pub mod error;
pub mod names;
pub mod sidecar;
pub mod summary;
pub mod synthesize;
pub mod types;

pub use alter::alter_statements;
pub use error::{Result, SchemaError};
pub use names::NameTable;
pub use sidecar::{Sidecar, SidecarVariable};
pub use summary::{Summary, SummaryRow};
pub use synthesize::{repair_unit, synthesize, SynthesisOptions};
pub use types::{
    DatasetSchema, Measurement, NetcdfAttributes, DATASET_NAME_MEASUREMENT, UNITLESS, UNIX_UTC,
};
