//! ETSI Loader Runner
//!
//! Runs lifecycle verbs against the TSDB over a single session. The session
//! is opened once per run and closed on every exit path. Schema verbs abort
//! the run on failure; INSERT blocks fail independently.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use crate::blocks::{plan_blocks, uncovered_rows, Block};
use crate::dataset::Dataset;
use crate::error::{LoadError, Result};
use crate::statements;
use crate::time::TimeParser;
use etsi_client::Session;
use etsi_schema::{alter_statements, DatasetSchema};
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, error, info, warn};

// =============================================================================
// Verbs
// =============================================================================

/// A lifecycle verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    CreateDb,
    CreateTs,
    DropTs,
    Delete,
    Insert,
    Alter,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateDb => "createdb",
            Self::CreateTs => "createts",
            Self::DropTs => "dropts",
            Self::Delete => "delete",
            Self::Insert => "insert",
            Self::Alter => "alter",
        }
    }
}

impl FromStr for Verb {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "createdb" => Ok(Self::CreateDb),
            "createts" => Ok(Self::CreateTs),
            "dropts" => Ok(Self::DropTs),
            "delete" => Ok(Self::Delete),
            "insert" => Ok(Self::Insert),
            "alter" => Ok(Self::Alter),
            other => Err(LoadError::UnknownVerb(other.to_string())),
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Report
// =============================================================================

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub statements: usize,
    pub blocks_inserted: usize,
    pub blocks_failed: usize,
    pub rows_inserted: usize,
    pub rows_skipped: usize,
    pub values_clamped: usize,
}

// =============================================================================
// Loader
// =============================================================================

/// Executes verbs for one dataset over one session.
pub struct Loader {
    session: Box<dyn Session>,
    connect_timeout: Duration,
    report: LoadReport,
}

impl Loader {
    pub fn new(session: Box<dyn Session>) -> Self {
        Self {
            session,
            connect_timeout: Duration::from_secs(1),
            report: LoadReport::default(),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Open the session, run `verbs` in order and close the session,
    /// whatever the outcome. A panicking verb still closes the session
    /// before the panic resumes.
    pub async fn run(
        mut self,
        schema: &mut DatasetSchema,
        dataset: Option<&mut Dataset>,
        verbs: &[Verb],
    ) -> Result<LoadReport> {
        self.session.open(self.connect_timeout).await?;
        info!("Session open for {} ({} verbs)", schema.identifier, verbs.len());

        let outcome = AssertUnwindSafe(self.run_verbs(schema, dataset, verbs))
            .catch_unwind()
            .await;

        if let Err(err) = self.session.close().await {
            warn!("Failed to close session: {}", err);
        }

        match outcome {
            Ok(outcome) => outcome.map(|_| self.report),
            Err(panic) => {
                error!("Load of {} panicked; session closed", schema.identifier);
                std::panic::resume_unwind(panic)
            }
        }
    }

    async fn run_verbs(
        &mut self,
        schema: &mut DatasetSchema,
        mut dataset: Option<&mut Dataset>,
        verbs: &[Verb],
    ) -> Result<()> {
        for verb in verbs {
            if let Err(err) = self.run_verb(*verb, schema, dataset.as_deref_mut()).await {
                error!("{} failed for {}: {}", verb, schema.identifier, err);
                return Err(err);
            }
        }
        Ok(())
    }

    async fn run_verb(
        &mut self,
        verb: Verb,
        schema: &mut DatasetSchema,
        dataset: Option<&mut Dataset>,
    ) -> Result<()> {
        info!("Running {} for {}", verb, schema.identifier);
        match verb {
            Verb::CreateDb => self.create_database(schema).await,
            Verb::CreateTs => self.batch(statements::create_timeseries(schema)).await,
            Verb::DropTs => {
                if schema.is_empty() {
                    return Ok(());
                }
                self.batch(statements::drop_timeseries(schema)).await?;
                schema.clear_measurements();
                Ok(())
            }
            Verb::Delete => self.batch(statements::delete_data(schema)).await,
            Verb::Alter => self.batch(alter_statements(schema)).await,
            Verb::Insert => match dataset {
                Some(dataset) => self.insert(schema, dataset).await,
                None => Err(LoadError::Dataset("insert requires a dataset".to_string())),
            },
        }
    }

    async fn create_database(&mut self, schema: &DatasetSchema) -> Result<()> {
        let sql = statements::create_database(schema);
        debug!("{}", sql);
        match self.session.execute_non_query(&sql).await {
            Ok(()) => {
                self.report.statements += 1;
                Ok(())
            }
            Err(err) if err.is_already_exists() => {
                warn!("Database {} already exists", schema.identifier);
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn batch(&mut self, sqls: Vec<String>) -> Result<()> {
        if sqls.is_empty() {
            return Ok(());
        }
        for sql in &sqls {
            debug!("{}", sql);
        }
        self.session.execute_batch(&sqls).await?;
        self.report.statements += sqls.len();
        Ok(())
    }

    async fn insert(&mut self, schema: &DatasetSchema, dataset: &mut Dataset) -> Result<()> {
        if schema.is_empty() {
            return Ok(());
        }
        let time = schema
            .time()
            .ok_or_else(|| LoadError::Dataset(format!("no time measurement '{}'", schema.time_measurement)))?;
        let parser = TimeParser::for_unit(&time.unit);
        let time_column = time.column_order;

        self.report.values_clamped += dataset.clamp_tiny_values(schema);

        let blocks = plan_blocks(schema, dataset.row_count());
        info!(
            "Inserting {} rows into {} in {} blocks",
            dataset.row_count(),
            schema.identifier,
            blocks.len()
        );

        let uncovered = uncovered_rows(&blocks, dataset.row_count());
        if uncovered > 0 {
            warn!(
                "{} rows of {} lie past the last device block and are not inserted",
                uncovered, schema.identifier
            );
            self.report.rows_skipped += uncovered;
        }

        for block in &blocks {
            self.insert_block(schema, dataset, block, &parser, time_column).await;
        }
        Ok(())
    }

    async fn insert_block(
        &mut self,
        schema: &DatasetSchema,
        dataset: &Dataset,
        block: &Block,
        parser: &TimeParser,
        time_column: usize,
    ) {
        let mut rows: Vec<(i64, &[String])> = Vec::with_capacity(block.len());
        for row in block.rows.clone() {
            match parser.parse(dataset.cell(row, time_column)) {
                Ok(time) => rows.push((time, dataset.rows[row].as_slice())),
                Err(message) => {
                    // File rows count the header as row 1.
                    let err = LoadError::parse(row + 2, message);
                    warn!("Block {} ({}): {}; stopping block", block.index, block.device, err);
                    self.report.rows_skipped += block.rows.end - row;
                    break;
                }
            }
        }
        if rows.is_empty() {
            return;
        }

        let sql = statements::insert(schema, &block.device, &rows);
        debug!("Block {} ({}): {} rows", block.index, block.device, rows.len());
        match self.session.execute_non_query(&sql).await {
            Ok(()) => {
                self.report.statements += 1;
                self.report.blocks_inserted += 1;
                self.report.rows_inserted += rows.len();
            }
            Err(err) => {
                error!("Block {} ({}) insert failed: {}", block.index, block.device, err);
                self.report.blocks_failed += 1;
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
