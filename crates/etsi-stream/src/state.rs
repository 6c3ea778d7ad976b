//! ETSI Stream State
//!
//! Application state shared by every connection: configuration, the TSDB
//! session factory, the live connection registry and the shutdown signal.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use crate::config::StreamConfig;
use etsi_client::SessionFactory;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::warn;

// =============================================================================
// Application State
// =============================================================================

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<StreamConfig>,
    pub sessions: Arc<dyn SessionFactory>,
    pub connections: Arc<ConnectionRegistry>,
    shutdown: broadcast::Sender<()>,
}

impl AppState {
    pub fn new(config: StreamConfig, sessions: Arc<dyn SessionFactory>) -> Self {
        let (shutdown, _) = broadcast::channel(1);
        Self {
            connections: Arc::new(ConnectionRegistry::new(config.max_connections)),
            config: Arc::new(config),
            sessions,
            shutdown,
        }
    }

    /// Receiver that fires once when the server shuts down.
    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown.subscribe()
    }

    /// Admit a new connection, or `None` when full or shutting down.
    pub fn admit(&self) -> Option<ConnectionGuard> {
        let id = self.connections.register()?;
        Some(ConnectionGuard {
            id,
            registry: Arc::clone(&self.connections),
        })
    }

    /// Refuse new connections and tell every open connection to close.
    pub fn shutdown(&self) {
        self.connections.begin_shutdown();
        // No receivers just means no open connections.
        let _ = self.shutdown.send(());
    }
}

// =============================================================================
// Connection Registry
// =============================================================================

/// Counts live connections and hands out connection ids.
#[derive(Debug)]
pub struct ConnectionRegistry {
    active: AtomicUsize,
    next_id: AtomicU64,
    max_connections: usize,
    shutting_down: AtomicBool,
}

impl ConnectionRegistry {
    pub fn new(max_connections: usize) -> Self {
        Self {
            active: AtomicUsize::new(0),
            next_id: AtomicU64::new(1),
            max_connections,
            shutting_down: AtomicBool::new(false),
        }
    }

    /// Admit a connection, returning its id, or `None` when the server is
    /// full or shutting down.
    pub fn register(&self) -> Option<u64> {
        if self.shutting_down.load(Ordering::Acquire) {
            warn!("Rejecting connection during shutdown");
            return None;
        }
        let admitted = self
            .active
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.max_connections).then_some(n + 1)
            })
            .is_ok();
        if !admitted {
            warn!("Rejecting connection: max connections ({}) reached", self.max_connections);
            return None;
        }
        Some(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn unregister(&self) {
        self.active.fetch_sub(1, Ordering::AcqRel);
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }

    fn begin_shutdown(&self) {
        self.shutting_down.store(true, Ordering::Release);
    }
}

/// Registration of one connection, released on drop.
#[derive(Debug)]
pub struct ConnectionGuard {
    id: u64,
    registry: Arc<ConnectionRegistry>,
}

impl ConnectionGuard {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.registry.unregister();
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use etsi_client::MemoryBackend;

    #[test]
    fn test_registry_limits() {
        let registry = ConnectionRegistry::new(2);
        assert_eq!(registry.register(), Some(1));
        assert_eq!(registry.register(), Some(2));
        assert_eq!(registry.register(), None);
        registry.unregister();
        assert_eq!(registry.active(), 1);
        assert_eq!(registry.register(), Some(3));
    }

    #[test]
    fn test_guard_releases_slot() {
        let state = AppState::new(StreamConfig::default(), Arc::new(MemoryBackend::new()));
        let guard = state.admit().unwrap();
        assert_eq!(guard.id(), 1);
        assert_eq!(state.connections.active(), 1);
        drop(guard);
        assert_eq!(state.connections.active(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_reaches_subscribers() {
        let state = AppState::new(StreamConfig::default(), Arc::new(MemoryBackend::new()));
        let mut rx = state.subscribe_shutdown();

        state.shutdown();

        assert!(rx.recv().await.is_ok());
        assert!(state.connections.is_shutting_down());
        assert!(state.admit().is_none());
    }
}
