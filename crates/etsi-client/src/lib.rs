//! ETSI Client - TSDB Session SDK
//!
//! Session abstraction over the time-series database used by the bulk
//! loader and the stream router, with an IoTDB REST implementation and a
//! scripted in-memory implementation.
//!
//! Key Features:
//! - Async session trait with open/close, statements, batches and queries
//! - Deadline-bounded calls mapped onto a single timeout error
//! - Cursor-style result sets built from REST payloads or text tables
//! - Environment-driven endpoint configuration
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

pub mod config;
pub mod error;
pub mod memory;
pub mod rest;
pub mod result;
pub mod session;

pub use config::{ClientConfig, ConnectionConfig, TimeoutConfig};
pub use error::SessionError;
pub use memory::{MemoryBackend, MemorySession};
pub use rest::{RestSession, RestSessionFactory};
pub use result::{ResultSet, TIME_COLUMN};
pub use session::{with_deadline, Session, SessionFactory};
