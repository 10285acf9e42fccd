use std::{fmt, io};

use super::service::ServiceError;

/// Crate-wide `Result` type using [`TableSnapError`] as the error.
///
/// This alias is re-exported by the parent `error` module and is intended
/// to be used throughout the crate for fallible operations.
pub type Result<T> = std::result::Result<T, TableSnapError>;

/// Top-level error type for export operations.
///
/// Every failure that can end a run is one of these variants. The export
/// core never downgrades or swallows them; the first fatal error reaches
/// the caller of `retrieve()` as-is.
#[derive(Debug)]
pub enum TableSnapError {
    /// Fetching the key schema failed; the run aborts before any segment starts.
    SchemaDiscovery(ServiceError),

    /// Percentage-based page limiting was requested but cannot be computed.
    CapacityConfiguration(String),

    /// A page read failed for one segment.
    PageFetch { segment: u32, source: ServiceError },

    /// Any other table service call failed.
    Service(ServiceError),

    /// A backup submission failed.
    Sink(SinkError),

    /// Configuration errors.
    Config(ConfigError),

    /// I/O errors.
    Io(io::Error),

    /// JSON encoding or decoding errors.
    Json(serde_json::Error),

    /// Generic error with a free-form message.
    Generic(String),
}

/// Errors raised by backup sinks.
#[derive(Debug)]
pub enum SinkError {
    /// The sink could not write to its destination.
    Io(io::Error),

    /// A record could not be encoded.
    Encode(String),

    /// The sink refused the batch.
    Rejected(String),

    /// The sink was used after `finish()`.
    Closed,
}

/// Configuration-specific errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file not found.
    FileNotFound(String),

    /// Invalid config format.
    InvalidFormat(String),

    /// Missing required field.
    MissingField(String),

    /// Invalid field value.
    InvalidValue { field: String, value: String },

    /// Generic configuration error.
    Generic(String),
}

impl TableSnapError {
    /// Underlying service error, if this failure came from the table service.
    pub fn service_error(&self) -> Option<&ServiceError> {
        match self {
            TableSnapError::SchemaDiscovery(e)
            | TableSnapError::PageFetch { source: e, .. }
            | TableSnapError::Service(e) => Some(e),
            _ => None,
        }
    }
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for TableSnapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableSnapError::SchemaDiscovery(e) => write!(f, "Schema discovery failed: {e}"),
            TableSnapError::CapacityConfiguration(msg) => {
                write!(f, "Capacity configuration error: {msg}")
            }
            TableSnapError::PageFetch { segment, source } => {
                write!(f, "Page fetch failed for segment {segment}: {source}")
            }
            TableSnapError::Service(e) => write!(f, "Table service error: {e}"),
            TableSnapError::Sink(e) => write!(f, "Sink error: {e}"),
            TableSnapError::Config(e) => write!(f, "Configuration error: {e}"),
            TableSnapError::Io(e) => write!(f, "I/O error: {e}"),
            TableSnapError::Json(e) => write!(f, "JSON error: {e}"),
            TableSnapError::Generic(msg) => write!(f, "{msg}"),
        }
    }
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkError::Io(e) => write!(f, "write failed: {e}"),
            SinkError::Encode(msg) => write!(f, "failed to encode record: {msg}"),
            SinkError::Rejected(msg) => write!(f, "batch rejected: {msg}"),
            SinkError::Closed => write!(f, "sink already finished"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {path}"),
            ConfigError::InvalidFormat(msg) => write!(f, "Invalid config format: {msg}"),
            ConfigError::MissingField(field) => write!(f, "Missing required field: {field}"),
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for field '{field}'")
            }
            ConfigError::Generic(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for TableSnapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TableSnapError::SchemaDiscovery(e)
            | TableSnapError::PageFetch { source: e, .. }
            | TableSnapError::Service(e) => Some(e),
            TableSnapError::Sink(e) => Some(e),
            TableSnapError::Config(e) => Some(e),
            TableSnapError::Io(e) => Some(e),
            TableSnapError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for SinkError {}
impl std::error::Error for ConfigError {}

/* ========================= Conversions to TableSnapError ========================= */

impl From<io::Error> for TableSnapError {
    fn from(err: io::Error) -> Self {
        TableSnapError::Io(err)
    }
}

impl From<serde_json::Error> for TableSnapError {
    fn from(err: serde_json::Error) -> Self {
        TableSnapError::Json(err)
    }
}

impl From<SinkError> for TableSnapError {
    fn from(err: SinkError) -> Self {
        TableSnapError::Sink(err)
    }
}

impl From<ConfigError> for TableSnapError {
    fn from(err: ConfigError) -> Self {
        TableSnapError::Config(err)
    }
}

impl From<ServiceError> for TableSnapError {
    fn from(err: ServiceError) -> Self {
        TableSnapError::Service(err)
    }
}

impl From<String> for TableSnapError {
    fn from(msg: String) -> Self {
        TableSnapError::Generic(msg)
    }
}

impl From<&str> for TableSnapError {
    fn from(msg: &str) -> Self {
        TableSnapError::Generic(msg.to_owned())
    }
}

impl From<io::Error> for SinkError {
    fn from(err: io::Error) -> Self {
        SinkError::Io(err)
    }
}
