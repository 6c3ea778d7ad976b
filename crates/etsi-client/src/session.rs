//! ETSI Client Session
//!
//! The session abstraction the loader and the stream router talk to. A
//! session is opened, used by exactly one task and closed; implementations
//! decide how statements reach the TSDB.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use crate::error::SessionError;
use crate::result::ResultSet;
use async_trait::async_trait;
use std::time::Duration;

// =============================================================================
// Session
// =============================================================================

/// A short-lived TSDB session.
#[async_trait]
pub trait Session: Send {
    /// Establish the session, failing if the TSDB does not answer within
    /// `timeout`.
    async fn open(&mut self, timeout: Duration) -> Result<(), SessionError>;

    /// Release the session. Closing an already closed session is a no-op.
    async fn close(&mut self) -> Result<(), SessionError>;

    /// Returns true between a successful `open` and `close`.
    fn is_open(&self) -> bool;

    /// Execute a statement that produces no rows.
    async fn execute_non_query(&mut self, sql: &str) -> Result<(), SessionError>;

    /// Execute statements in order, stopping at the first failure.
    async fn execute_batch(&mut self, sqls: &[String]) -> Result<(), SessionError> {
        for sql in sqls {
            self.execute_non_query(sql).await?;
        }
        Ok(())
    }

    /// Execute a query and return its rows.
    async fn execute_query(&mut self, sql: &str, timeout: Duration)
        -> Result<ResultSet, SessionError>;
}

// =============================================================================
// Session Factory
// =============================================================================

/// Creates unopened sessions. Shared by every connection of the stream
/// router, so it must be cheap to call and thread safe.
pub trait SessionFactory: Send + Sync {
    fn create(&self) -> Box<dyn Session>;
}

/// Run a future under a deadline, mapping expiry onto [`SessionError::Timeout`].
pub async fn with_deadline<T, F>(timeout: Duration, fut: F) -> Result<T, SessionError>
where
    F: std::future::Future<Output = Result<T, SessionError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(SessionError::Timeout(timeout.as_millis() as u64)),
    }
}

// =============================================================================
// Tests
// =============================================================================
