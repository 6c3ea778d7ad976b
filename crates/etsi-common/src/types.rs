//! ETSI Types - Logical and Storage Types
//!
//! The XSD-flavoured logical type vocabulary used by the schema synthesizer
//! and the bulk loader, and its fixed mapping onto IoTDB storage tuples
//! (wire type, encoding, compressor).
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Logical Type
// =============================================================================

/// Internal, language-neutral column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogicalType {
    Double,
    Float,
    Int32,
    Int64,
    #[default]
    String,
    Boolean,
    Datetime,
}

impl LogicalType {
    /// All logical types, in declaration order.
    pub const ALL: [LogicalType; 7] = [
        LogicalType::Double,
        LogicalType::Float,
        LogicalType::Int32,
        LogicalType::Int64,
        LogicalType::String,
        LogicalType::Boolean,
        LogicalType::Datetime,
    ];

    /// Map a source-declared type name (summary `type` cell) onto a logical
    /// type. Lookup is case-insensitive; unknown names yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "string" | "unicode" | "str" => Some(Self::String),
            "float" => Some(Self::Float),
            "integer" | "int" => Some(Self::Int32),
            "longint" | "int64" | "long" => Some(Self::Int64),
            "double" => Some(Self::Double),
            "datetime" => Some(Self::Datetime),
            "boolean" | "bool" => Some(Self::Boolean),
            _ => None,
        }
    }

    /// Map a NetCDF CDL declaration type onto a logical type.
    pub fn from_netcdf(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "float" => Some(Self::Float),
            "double" => Some(Self::Double),
            "int" | "short" | "byte" | "ubyte" | "ushort" => Some(Self::Int32),
            "int64" | "uint" | "uint64" => Some(Self::Int64),
            "char" | "string" => Some(Self::String),
            _ => None,
        }
    }

    /// Canonical lowercase name, as stored in ALTER attributes.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Double => "double",
            Self::Float => "float",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Datetime => "datetime",
        }
    }

    /// Returns true for the IEEE floating point types.
    pub fn is_floating(&self) -> bool {
        matches!(self, Self::Double | Self::Float)
    }

    /// Returns true for the integer types.
    pub fn is_integer(&self) -> bool {
        matches!(self, Self::Int32 | Self::Int64)
    }

    /// Returns true for values emitted as quoted text literals.
    pub fn is_textual(&self) -> bool {
        matches!(self, Self::String | Self::Datetime)
    }

    /// Fixed storage tuple for this logical type.
    pub fn storage(&self) -> Storage {
        match self {
            Self::Double => Storage::new(WireType::Double, Encoding::Gorilla),
            Self::Float => Storage::new(WireType::Float, Encoding::Gorilla),
            Self::Int32 => Storage::new(WireType::Int32, Encoding::Gorilla),
            Self::Int64 => Storage::new(WireType::Int64, Encoding::Gorilla),
            Self::String | Self::Datetime => Storage::new(WireType::Text, Encoding::Plain),
            Self::Boolean => Storage::new(WireType::Boolean, Encoding::Rle),
        }
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Storage Types
// =============================================================================

/// IoTDB column data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WireType {
    Double,
    Float,
    Int32,
    Int64,
    Text,
    Boolean,
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Double => "DOUBLE",
            Self::Float => "FLOAT",
            Self::Int32 => "INT32",
            Self::Int64 => "INT64",
            Self::Text => "TEXT",
            Self::Boolean => "BOOLEAN",
        })
    }
}

/// IoTDB column encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Encoding {
    Gorilla,
    Plain,
    Rle,
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Gorilla => "GORILLA",
            Self::Plain => "PLAIN",
            Self::Rle => "RLE",
        })
    }
}

/// IoTDB compressor. Every series in the pipeline uses SNAPPY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Compression {
    #[default]
    Snappy,
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Snappy => "SNAPPY",
        })
    }
}

/// Storage declaration for one aligned series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Storage {
    pub wire: WireType,
    pub encoding: Encoding,
    pub compression: Compression,
}

impl Storage {
    pub fn new(wire: WireType, encoding: Encoding) -> Self {
        Self {
            wire,
            encoding,
            compression: Compression::Snappy,
        }
    }

    /// Storage used when the logical type is not known.
    pub fn fallback() -> Self {
        LogicalType::String.storage()
    }

    /// Render the column declaration used inside `CREATE ALIGNED TIMESERIES`.
    pub fn declaration(&self, measurement: &str) -> String {
        format!(
            "{} {} encoding={} compressor={}",
            measurement, self.wire, self.encoding, self.compression
        )
    }
}

// =============================================================================
// Tests
// =============================================================================
