//! ETSI Loader - Block-Oriented Bulk Loader
//!
//! Loads tabular sensor datasets into the TSDB: synthesizes the schema,
//! creates the aligned series and streams the rows in large multi-row
//! INSERT blocks.
//!
//! Key Features:
//! - Lifecycle verbs: createdb, createts, dropts, delete, insert, alter
//! - Per-device blocks for NetCDF datasets, size tiers for flat ones
//! - Typed SQL literals with fill-value and near-zero handling
//! - Epoch, pattern and free-form time column parsing
//! - One session per run, closed on every exit path
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

pub mod blocks;
pub mod config;
pub mod dataset;
pub mod error;
pub mod literal;
pub mod loader;
pub mod statements;
pub mod time;

pub use blocks::{plan_blocks, single_device_block_size, uncovered_rows, Block};
pub use config::LoaderConfig;
pub use dataset::{Dataset, TINY_VALUE};
pub use error::{LoadError, Result};
pub use literal::{format_cell, format_literal};
pub use loader::{LoadReport, Loader, Verb};
pub use time::{parse_iso, TimeParser};

use etsi_client::SessionFactory;
use etsi_schema::{synthesize, DatasetSchema, NameTable, Sidecar, Summary, SynthesisOptions};

/// Synthesize the schema described by `config`.
pub fn load_schema(config: &LoaderConfig) -> Result<DatasetSchema> {
    let summary = Summary::from_path(&config.summary)?;
    let sidecar = match &config.sidecar {
        Some(path) => Some(Sidecar::from_path(path)?),
        None => None,
    };
    let names = NameTable::load(config.name_table.as_deref())?;

    let mut options = SynthesisOptions::new().with_time_measurement(&config.time_measurement);
    if let Some(identifier) = &config.identifier {
        options = options.with_identifier(identifier);
    }
    if let Some(name) = &config.dataset_name {
        options = options.with_dataset_name(name);
    }

    Ok(synthesize(&summary, sidecar.as_ref(), &names, &options)?)
}

/// Run a complete load: schema synthesis, dataset read and the configured
/// verbs over one session from `factory`.
pub async fn run(config: &LoaderConfig, factory: &dyn SessionFactory) -> Result<LoadReport> {
    let mut schema = load_schema(config)?;

    let mut dataset = match (&config.data, config.needs_data()) {
        (Some(path), true) => Some(Dataset::from_path(path)?),
        (None, true) => {
            return Err(LoadError::Dataset("insert requires a data file".to_string()))
        }
        _ => None,
    };

    Loader::new(factory.create())
        .with_connect_timeout(config.client.timeout.connect)
        .run(&mut schema, dataset.as_mut(), &config.verbs)
        .await
}
