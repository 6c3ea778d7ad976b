//! ETSI Common - Shared Types and Utilities
//!
//! Foundational types used by every stage of the ETSI data pipeline: the
//! logical type vocabulary and its TSDB storage mapping, the measurement
//! name normalizer, the shared error type and environment-backed
//! configuration helpers.
//!
//! Key Features:
//! - XSD-flavoured logical types with fixed IoTDB storage tuples
//! - Deterministic name normalization and reserved-name aliasing
//! - Unified error type with configuration/IO classification
//! - Environment and TOML configuration loading with safe fallbacks
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

pub mod config;
pub mod error;
pub mod naming;
pub mod types;

pub use config::{env_or, env_parse_or, identifier_root_from_env, DEFAULT_IDENTIFIER_ROOT};
pub use error::{EtsiError, Result};
pub use naming::{normalize, NormalizedName, RESERVED_TIME_ALIAS};
pub use types::{Compression, Encoding, LogicalType, Storage, WireType};
