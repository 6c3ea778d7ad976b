//! ETSI Stream Connection
//!
//! Per-connection state machine. The socket is split: a writer task owns
//! the sink and drains a bounded frame queue, the reader loop parses
//! commands, and each query runs on its own stream task so `stop` can
//! interrupt it.
//!
//! Phases: `Idle -> login -> Authenticated -> query -> Streaming ->
//! (end | stop) -> Authenticated -> logout -> Closed`.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use crate::command::{parse_command, Command, GRAMMAR};
use crate::compile::compile;
use crate::emitter::{emit, end_of_data, EmitOutcome, Outbound, Pacing, NORMAL_CLOSURE};
use crate::materialize::materialize;
use crate::state::{AppState, ConnectionGuard};
use axum::extract::ws::{CloseFrame, Message, WebSocket};
use etsi_client::{with_deadline, Session, SessionError};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type SharedSession = Arc<tokio::sync::Mutex<Option<Box<dyn Session>>>>;

// =============================================================================
// Phase
// =============================================================================

/// Connection lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Authenticated,
    Streaming,
    Closed,
}

/// What the reader loop does after a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Close,
}

// =============================================================================
// Socket Driver
// =============================================================================

/// Drive one upgraded WebSocket until logout, disconnect or shutdown.
pub async fn serve(socket: WebSocket, state: AppState, guard: ConnectionGuard) {
    let id = guard.id();
    info!(connection = id, "WebSocket connected");

    let (sink, mut incoming) = socket.split();
    let (tx, rx) = mpsc::channel(state.config.queue_capacity);
    let writer = tokio::spawn(write_frames(sink, rx, id));
    let mut shutdown = state.subscribe_shutdown();

    let mut connection = Connection::new(state, id, tx);
    connection.greet().await;

    let mut close = None;
    loop {
        tokio::select! {
            message = incoming.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    if connection.handle(&text).await == Flow::Close {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    debug!(connection = id, "Client closed the socket");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(connection = id, "WebSocket read failed: {}", e);
                    break;
                }
            },
            _ = shutdown.recv() => {
                info!(connection = id, "Closing connection for shutdown");
                close = Some(NORMAL_CLOSURE);
                break;
            }
        }
    }

    connection.finish(close).await;
    drop(connection);
    if writer.await.is_err() {
        warn!(connection = id, "Writer task panicked");
    }
    drop(guard);
    info!(connection = id, "WebSocket disconnected");
}

/// Drain the frame queue into the socket. Ends after a close frame, when
/// every sender is gone, or when the socket rejects a write.
async fn write_frames(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Outbound>,
    id: u64,
) {
    while let Some(frame) = rx.recv().await {
        let (message, closing) = match frame {
            Outbound::Text(text) => (Message::Text(text), false),
            Outbound::Close(code) => (
                Message::Close(Some(CloseFrame {
                    code,
                    reason: Cow::Borrowed("bye"),
                })),
                true,
            ),
        };
        if let Err(e) = sink.send(message).await {
            debug!(connection = id, "WebSocket write failed: {}", e);
            break;
        }
        if closing {
            break;
        }
    }
}

// =============================================================================
// Connection
// =============================================================================

/// Socket-independent state of one client connection.
pub struct Connection {
    id: u64,
    state: AppState,
    tx: mpsc::Sender<Outbound>,
    phase: Arc<Mutex<Phase>>,
    session: SharedSession,
    stop: watch::Sender<bool>,
    stream: Option<JoinHandle<()>>,
}

impl Connection {
    pub fn new(state: AppState, id: u64, tx: mpsc::Sender<Outbound>) -> Self {
        let (stop, _) = watch::channel(false);
        Self {
            id,
            state,
            tx,
            phase: Arc::new(Mutex::new(Phase::Idle)),
            session: Arc::new(tokio::sync::Mutex::new(None)),
            stop,
            stream: None,
        }
    }

    pub fn phase(&self) -> Phase {
        *self.phase.lock()
    }

    /// Send the grammar frame every connection starts with.
    pub async fn greet(&self) {
        self.send(Outbound::Text(GRAMMAR.to_string())).await;
    }

    /// Handle one text frame from the client.
    pub async fn handle(&mut self, frame: &str) -> Flow {
        let (command, warnings) = match parse_command(frame) {
            Ok(parsed) => parsed,
            Err(e) if e.is_silent() => {
                debug!(connection = self.id, "Ignoring frame: {}", e);
                return Flow::Continue;
            }
            Err(e) => {
                warn!(connection = self.id, "Rejected command: {}", e);
                return Flow::Continue;
            }
        };
        for warning in &warnings {
            warn!(connection = self.id, "{}", warning);
        }

        let phase = self.phase();
        match (phase, command) {
            (Phase::Idle, Command::Login(name)) => self.login(&name).await,
            (Phase::Authenticated, Command::Logout) => {
                self.logout().await;
                return Flow::Close;
            }
            (Phase::Streaming, Command::Stop) => {
                debug!(connection = self.id, "Stop requested");
                self.stop.send_replace(true);
            }
            (Phase::Authenticated, command) if command.is_query() => {
                self.start_stream(command).await
            }
            (phase, command) => {
                warn!(
                    connection = self.id,
                    "Dropping '{}' while {:?}",
                    command.verb(),
                    phase
                );
            }
        }
        Flow::Continue
    }

    async fn login(&mut self, name: &str) {
        let timeout = self.state.config.client.timeout.connect;
        let mut session = self.state.sessions.create();

        match with_deadline(timeout, session.open(timeout)).await {
            Ok(()) => {
                *self.session.lock().await = Some(session);
                *self.phase.lock() = Phase::Authenticated;
                info!(connection = self.id, "Logged in as {}", name);
                self.send(Outbound::Text("login: ok".to_string())).await;
            }
            Err(e) => {
                warn!(connection = self.id, "Login for {} failed: {}", name, e);
                self.send(Outbound::Text(format!("login: {}", e))).await;
            }
        }
    }

    async fn logout(&mut self) {
        self.close_session().await;
        *self.phase.lock() = Phase::Closed;
        info!(connection = self.id, "Logged out");
        self.send(Outbound::Close(NORMAL_CLOSURE)).await;
    }

    async fn start_stream(&mut self, command: Command) {
        let Some(sql) = compile(&command, &self.state.config.identifier_root) else {
            return;
        };
        debug!(connection = self.id, "Compiled '{}' to {}", command.verb(), sql);

        // The previous task may still be queueing its terminal frame.
        if let Some(previous) = self.stream.take() {
            if previous.await.is_err() {
                warn!(connection = self.id, "Stream task panicked");
            }
        }

        *self.phase.lock() = Phase::Streaming;
        self.stop.send_replace(false);

        let task = StreamTask {
            id: self.id,
            command,
            sql,
            root: self.state.config.identifier_root.clone(),
            query_timeout: self.state.config.client.timeout.query,
            session: Arc::clone(&self.session),
            phase: Arc::clone(&self.phase),
            tx: self.tx.clone(),
            stop: self.stop.subscribe(),
        };
        self.stream = Some(tokio::spawn(task.run()));
    }

    /// Stop any running stream, optionally send a close frame, and release
    /// the session.
    pub async fn finish(&mut self, close: Option<u16>) {
        self.stop.send_replace(true);
        if let Some(stream) = self.stream.take() {
            if stream.await.is_err() {
                warn!(connection = self.id, "Stream task panicked");
            }
        }
        if let Some(code) = close {
            self.send(Outbound::Close(code)).await;
        }
        self.close_session().await;
        *self.phase.lock() = Phase::Closed;
    }

    async fn close_session(&self) {
        let Some(mut session) = self.session.lock().await.take() else {
            return;
        };
        if let Err(e) = session.close().await {
            warn!(connection = self.id, "Failed to close TSDB session: {}", e);
        }
    }

    async fn send(&self, frame: Outbound) {
        if self.tx.send(frame).await.is_err() {
            debug!(connection = self.id, "Dropping frame for closed socket");
        }
    }
}

// =============================================================================
// Stream Task
// =============================================================================

/// One query: execute, materialize, emit, then return to `Authenticated`.
struct StreamTask {
    id: u64,
    command: Command,
    sql: String,
    root: String,
    query_timeout: Duration,
    session: SharedSession,
    phase: Arc<Mutex<Phase>>,
    tx: mpsc::Sender<Outbound>,
    stop: watch::Receiver<bool>,
}

impl StreamTask {
    async fn run(mut self) {
        let verb = self.command.verb();
        match self.query().await {
            Ok(result) => {
                let table = materialize(&self.command, result, &self.root);
                let outcome = emit(&table, self.pacing(), &self.tx, &mut self.stop).await;
                self.release();
                match outcome {
                    EmitOutcome::Completed { rows } => {
                        info!(connection = self.id, "{} streamed {} rows", verb, rows)
                    }
                    EmitOutcome::Stopped { rows } => {
                        info!(connection = self.id, "{} stopped after {} rows", verb, rows)
                    }
                    EmitOutcome::Disconnected { rows } => {
                        debug!(connection = self.id, "Socket gone after {} rows", rows);
                        return;
                    }
                }
                if !end_of_data(&self.tx).await {
                    debug!(connection = self.id, "Socket gone before end of data");
                }
            }
            Err(e) => {
                warn!(connection = self.id, "{} failed: {}", verb, e);
                self.release();
                let frame = format!("{}: {}", verb, e);
                if self.tx.send(Outbound::Text(frame)).await.is_err() {
                    debug!(connection = self.id, "Dropping diagnostic for closed socket");
                }
            }
        }
    }

    /// Return to `Authenticated` before the terminal frame goes out, so a
    /// command sent in reply to it is accepted.
    fn release(&self) {
        let mut phase = self.phase.lock();
        if *phase == Phase::Streaming {
            *phase = Phase::Authenticated;
        }
    }

    async fn query(&self) -> Result<etsi_client::ResultSet, SessionError> {
        let mut session = self.session.lock().await;
        let session = session.as_mut().ok_or(SessionError::NotConnected)?;
        with_deadline(
            self.query_timeout,
            session.execute_query(&self.sql, self.query_timeout),
        )
        .await
    }

    fn pacing(&self) -> Pacing {
        match &self.command {
            Command::Data(_, params) => Pacing {
                interval: params.interval,
                loop_count: params.loop_count,
                format: params.format,
            },
            _ => Pacing::default(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StreamConfig;
    use crate::materialize::END_OF_DATA;
    use etsi_client::{MemoryBackend, ResultSet};

    fn connection(backend: &MemoryBackend) -> (Connection, mpsc::Receiver<Outbound>) {
        let state = AppState::new(StreamConfig::default(), Arc::new(backend.clone()));
        let (tx, rx) = mpsc::channel(256);
        (Connection::new(state, 1, tx), rx)
    }

    /// Text frames up to and including the next end-of-data sentinel.
    async fn until_end(rx: &mut mpsc::Receiver<Outbound>) -> Vec<String> {
        let mut frames = Vec::new();
        while let Some(frame) = rx.recv().await {
            if let Outbound::Text(text) = frame {
                let done = text == END_OF_DATA;
                frames.push(text);
                if done {
                    break;
                }
            }
        }
        frames
    }

    async fn next_text(rx: &mut mpsc::Receiver<Outbound>) -> String {
        match rx.recv().await {
            Some(Outbound::Text(text)) => text,
            other => panic!("expected text frame, got {:?}", other),
        }
    }

    fn texts(rx: &mut mpsc::Receiver<Outbound>) -> Vec<String> {
        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            if let Outbound::Text(text) = frame {
                frames.push(text);
            }
        }
        frames
    }

    #[tokio::test]
    async fn test_queries_before_login_are_dropped() {
        let backend = MemoryBackend::new();
        let (mut conn, mut rx) = connection(&backend);

        assert_eq!(conn.handle("groups").await, Flow::Continue);
        assert_eq!(conn.handle("frobnicate now").await, Flow::Continue);
        assert_eq!(conn.phase(), Phase::Idle);
        assert!(texts(&mut rx).is_empty());
        assert!(backend.queries().is_empty());
    }

    #[tokio::test]
    async fn test_login_query_logout() {
        let backend = MemoryBackend::new();
        backend.on_query(
            "SELECT COUNT(*)",
            ResultSet::new(
                vec!["count(root.etsidata.g.d.Power)".to_string()],
                vec![vec![Some("3".into())]],
            ),
        );
        let (mut conn, mut rx) = connection(&backend);

        conn.handle("LOGIN alice").await;
        assert_eq!(conn.phase(), Phase::Authenticated);
        assert_eq!(backend.opened(), 1);

        assert_eq!(next_text(&mut rx).await, "login: ok");

        conn.handle("count g.d").await;
        assert_eq!(
            until_end(&mut rx).await,
            vec!["measurement,count", "Power,3", END_OF_DATA]
        );
        assert_eq!(conn.phase(), Phase::Authenticated);

        assert_eq!(conn.handle("logout").await, Flow::Close);
        assert_eq!(conn.phase(), Phase::Closed);
        assert_eq!(backend.closed(), 1);
        assert_eq!(rx.recv().await, Some(Outbound::Close(NORMAL_CLOSURE)));
    }

    #[tokio::test]
    async fn test_failed_login_stays_idle() {
        let backend = MemoryBackend::new();
        backend.refuse_open();
        let (mut conn, mut rx) = connection(&backend);

        conn.handle("login bob").await;

        assert_eq!(conn.phase(), Phase::Idle);
        let frames = texts(&mut rx);
        assert_eq!(frames.len(), 1);
        assert!(frames[0].starts_with("login: "));
        assert_ne!(frames[0], "login: ok");
    }

    #[tokio::test]
    async fn test_query_failure_sends_diagnostic() {
        let backend = MemoryBackend::new();
        backend.fail_on("SHOW", SessionError::QueryFailed("boom".into()));
        let (mut conn, mut rx) = connection(&backend);

        conn.handle("login alice").await;
        conn.handle("groups").await;

        assert_eq!(next_text(&mut rx).await, "login: ok");
        assert_eq!(next_text(&mut rx).await, "groups: query failed: boom");
        assert_eq!(conn.phase(), Phase::Authenticated);
    }

    #[tokio::test]
    async fn test_back_to_back_queries_keep_frame_order() {
        let backend = MemoryBackend::new();
        let (mut conn, mut rx) = connection(&backend);

        conn.handle("login alice").await;
        assert_eq!(next_text(&mut rx).await, "login: ok");

        for _ in 0..20 {
            conn.handle("groups").await;
            while conn.phase() == Phase::Streaming {
                tokio::task::yield_now().await;
            }
        }
        conn.finish(None).await;

        let frames = texts(&mut rx);
        assert_eq!(frames.len(), 40);
        for pair in frames.chunks(2) {
            assert_eq!(pair, ["group", END_OF_DATA]);
        }
    }

    #[tokio::test]
    async fn test_finish_closes_session() {
        let backend = MemoryBackend::new();
        let (mut conn, mut rx) = connection(&backend);

        conn.handle("login alice").await;
        conn.finish(Some(NORMAL_CLOSURE)).await;

        assert_eq!(conn.phase(), Phase::Closed);
        assert_eq!(backend.closed(), 1);
        assert_eq!(texts(&mut rx), vec!["login: ok"]);
    }
}
