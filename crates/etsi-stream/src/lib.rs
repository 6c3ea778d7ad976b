//! ETSI Stream - WebSocket Stream Router
//!
//! Serves stored ETSI time series over WebSocket. Clients log in, browse
//! groups, devices and series, and request data streams that are replayed
//! row by row at a chosen pace, optionally looping.
//!
//! Key Features:
//! - Small text command grammar with forgiving parameter parsing
//! - Queries compiled to TSDB SQL under a configurable identifier root
//! - CSV or JSON row frames terminated by `<end of data>`
//! - Paced emission that `stop` interrupts at the next row boundary
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

pub mod command;
pub mod compile;
pub mod config;
pub mod connection;
pub mod emitter;
pub mod error;
pub mod handlers;
pub mod materialize;
pub mod router;
pub mod state;

pub use command::{parse_command, Command, DataParams, Format, Target, GRAMMAR};
pub use compile::compile;
pub use config::StreamConfig;
pub use connection::{Connection, Flow, Phase};
pub use emitter::{emit, end_of_data, EmitOutcome, Outbound, Pacing, NORMAL_CLOSURE};
pub use error::ProtocolError;
pub use materialize::{materialize, Table, TimeseriesProfile, END_OF_DATA};
pub use router::create_router;
pub use state::{AppState, ConnectionGuard, ConnectionRegistry};
