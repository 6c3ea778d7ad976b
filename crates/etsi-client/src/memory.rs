//! ETSI Client In-Memory Session
//!
//! A scripted session backend. It records every statement, answers queries
//! from registered results and can be told to fail or stall, which lets the
//! loader and router be exercised without a running TSDB.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use crate::error::SessionError;
use crate::result::ResultSet;
use crate::session::{with_deadline, Session, SessionFactory};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// Backend State
// =============================================================================

#[derive(Debug, Default)]
struct MemoryState {
    statements: Vec<String>,
    queries: Vec<String>,
    results: Vec<(String, ResultSet)>,
    failures: Vec<(String, SessionError)>,
    query_delay: Option<Duration>,
    refuse_open: bool,
    opened: usize,
    closed: usize,
}

/// Shared backend behind any number of [`MemorySession`]s.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer queries starting with `prefix` with `result`. Later
    /// registrations win over earlier ones.
    pub fn on_query(&self, prefix: impl Into<String>, result: ResultSet) -> &Self {
        self.state.lock().results.push((prefix.into(), result));
        self
    }

    /// Fail statements or queries starting with `prefix`.
    pub fn fail_on(&self, prefix: impl Into<String>, error: SessionError) -> &Self {
        self.state.lock().failures.push((prefix.into(), error));
        self
    }

    /// Delay every query answer by `delay`.
    pub fn delay_queries(&self, delay: Duration) -> &Self {
        self.state.lock().query_delay = Some(delay);
        self
    }

    /// Make `open` fail with a connection error.
    pub fn refuse_open(&self) -> &Self {
        self.state.lock().refuse_open = true;
        self
    }

    /// Every non-query statement executed so far, in order.
    pub fn statements(&self) -> Vec<String> {
        self.state.lock().statements.clone()
    }

    /// Every query executed so far, in order.
    pub fn queries(&self) -> Vec<String> {
        self.state.lock().queries.clone()
    }

    /// Number of successful opens.
    pub fn opened(&self) -> usize {
        self.state.lock().opened
    }

    /// Number of closes of open sessions.
    pub fn closed(&self) -> usize {
        self.state.lock().closed
    }

    /// Create an unopened session on this backend.
    pub fn session(&self) -> MemorySession {
        MemorySession {
            backend: self.clone(),
            open: false,
        }
    }

    fn failure_for(&self, sql: &str) -> Option<SessionError> {
        self.state
            .lock()
            .failures
            .iter()
            .rev()
            .find(|(prefix, _)| sql.starts_with(prefix.as_str()))
            .map(|(_, err)| err.clone())
    }
}

impl SessionFactory for MemoryBackend {
    fn create(&self) -> Box<dyn Session> {
        Box::new(self.session())
    }
}

// =============================================================================
// Memory Session
// =============================================================================

/// A session whose statements land in a [`MemoryBackend`].
#[derive(Debug)]
pub struct MemorySession {
    backend: MemoryBackend,
    open: bool,
}

impl MemorySession {
    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.open {
            Ok(())
        } else {
            Err(SessionError::NotConnected)
        }
    }
}

#[async_trait]
impl Session for MemorySession {
    async fn open(&mut self, _timeout: Duration) -> Result<(), SessionError> {
        let mut state = self.backend.state.lock();
        if state.refuse_open {
            return Err(SessionError::ConnectionFailed("connection refused".to_string()));
        }
        state.opened += 1;
        self.open = true;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        if self.open {
            self.open = false;
            self.backend.state.lock().closed += 1;
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    async fn execute_non_query(&mut self, sql: &str) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.backend.state.lock().statements.push(sql.to_string());
        match self.backend.failure_for(sql) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn execute_query(
        &mut self,
        sql: &str,
        timeout: Duration,
    ) -> Result<ResultSet, SessionError> {
        self.ensure_open()?;
        let delay = {
            let mut state = self.backend.state.lock();
            state.queries.push(sql.to_string());
            state.query_delay
        };

        let backend = self.backend.clone();
        let sql = sql.to_string();
        with_deadline(timeout, async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(err) = backend.failure_for(&sql) {
                return Err(err);
            }
            let state = backend.state.lock();
            Ok(state
                .results
                .iter()
                .rev()
                .find(|(prefix, _)| sql.starts_with(prefix.as_str()))
                .map(|(_, rs)| rs.clone())
                .unwrap_or_default())
        })
        .await
    }
}

// =============================================================================
// Tests
// =============================================================================
