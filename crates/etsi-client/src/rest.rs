//! ETSI Client REST Session
//!
//! Session implementation over the IoTDB REST v2 service: `GET /ping` to
//! open, `POST /rest/v2/nonQuery` for statements and `POST /rest/v2/query`
//! for queries, authenticated with HTTP basic auth.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use crate::config::ClientConfig;
use crate::error::SessionError;
use crate::result::{QueryResponse, ResultSet};
use crate::session::{with_deadline, Session, SessionFactory};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// IoTDB status code for success.
const SUCCESS_CODE: i64 = 200;

/// Upper bound on rows returned by a single query.
const DEFAULT_ROW_LIMIT: usize = 1_000_000;

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Serialize)]
struct SqlRequest<'a> {
    sql: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    row_limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    code: i64,
    #[serde(default)]
    message: String,
}

// =============================================================================
// REST Session
// =============================================================================

/// A session against one IoTDB REST endpoint.
pub struct RestSession {
    config: ClientConfig,
    http: Option<reqwest::Client>,
    row_limit: usize,
}

impl RestSession {
    /// Create an unopened session.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            http: None,
            row_limit: DEFAULT_ROW_LIMIT,
        }
    }

    /// Set the maximum number of rows requested per query.
    pub fn with_row_limit(mut self, row_limit: usize) -> Self {
        self.row_limit = row_limit;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.connection.base_url(), path)
    }

    fn client(&self) -> Result<&reqwest::Client, SessionError> {
        self.http.as_ref().ok_or(SessionError::NotConnected)
    }

    async fn post(&self, path: &str, body: &SqlRequest<'_>) -> Result<reqwest::Response, SessionError> {
        let conn = &self.config.connection;
        self.client()?
            .post(self.url(path))
            .basic_auth(&conn.username, Some(&conn.password))
            .json(body)
            .send()
            .await
            .map_err(map_transport)
    }
}

#[async_trait]
impl Session for RestSession {
    async fn open(&mut self, timeout: Duration) -> Result<(), SessionError> {
        let http = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| SessionError::ConnectionFailed(e.to_string()))?;

        let url = self.url("/ping");
        let status: StatusResponse = with_deadline(timeout, async {
            let response = http.get(&url).send().await.map_err(map_transport)?;
            response
                .json()
                .await
                .map_err(|e| SessionError::Protocol(e.to_string()))
        })
        .await?;

        if status.code != SUCCESS_CODE {
            return Err(SessionError::ConnectionFailed(status.message));
        }

        tracing::debug!("Opened IoTDB session at {}", self.config.connection.address());
        self.http = Some(http);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        if self.http.take().is_some() {
            tracing::debug!("Closed IoTDB session at {}", self.config.connection.address());
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.http.is_some()
    }

    async fn execute_non_query(&mut self, sql: &str) -> Result<(), SessionError> {
        let timeout = self.config.timeout.statement;
        let body = SqlRequest { sql, row_limit: None };

        let status: StatusResponse = with_deadline(timeout, async {
            let response = self.post("/rest/v2/nonQuery", &body).await?;
            response
                .json()
                .await
                .map_err(|e| SessionError::Protocol(e.to_string()))
        })
        .await?;

        if status.code != SUCCESS_CODE {
            return Err(SessionError::StatementFailed {
                code: status.code,
                message: status.message,
            });
        }
        Ok(())
    }

    async fn execute_query(
        &mut self,
        sql: &str,
        timeout: Duration,
    ) -> Result<ResultSet, SessionError> {
        let body = SqlRequest {
            sql,
            row_limit: Some(self.row_limit),
        };

        let payload: serde_json::Value = with_deadline(timeout, async {
            let response = self.post("/rest/v2/query", &body).await?;
            response
                .json()
                .await
                .map_err(|e| SessionError::Protocol(e.to_string()))
        })
        .await?;

        // Failures come back as a bare status object.
        if payload.get("values").is_none() {
            let status: StatusResponse = serde_json::from_value(payload)
                .map_err(|e| SessionError::Protocol(e.to_string()))?;
            return Err(SessionError::QueryFailed(format!("[{}] {}", status.code, status.message)));
        }

        let response: QueryResponse =
            serde_json::from_value(payload).map_err(|e| SessionError::Protocol(e.to_string()))?;
        response.into_result_set()
    }
}

fn map_transport(err: reqwest::Error) -> SessionError {
    if err.is_timeout() {
        SessionError::Timeout(0)
    } else if err.is_connect() {
        SessionError::ConnectionFailed(err.to_string())
    } else {
        SessionError::Protocol(err.to_string())
    }
}

// =============================================================================
// REST Session Factory
// =============================================================================

/// Factory handing out [`RestSession`]s for one endpoint.
#[derive(Debug, Clone)]
pub struct RestSessionFactory {
    config: ClientConfig,
}

impl RestSessionFactory {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl SessionFactory for RestSessionFactory {
    fn create(&self) -> Box<dyn Session> {
        Box::new(RestSession::new(self.config.clone()))
    }
}

// =============================================================================
// Tests
// =============================================================================
