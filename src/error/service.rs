use std::fmt;

use serde::{Deserialize, Serialize};

/// Result type returned by [`crate::table::TableService`] calls.
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Classification of failures reported by the remote table service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceErrorKind {
    /// The table (or requested resource) does not exist.
    ResourceNotFound,
    /// The caller is not allowed to access the table.
    AccessDenied,
    /// The request exceeded the provisioned throughput.
    Throttled,
    /// The request itself was malformed.
    Validation,
    /// Network or transport-level failure.
    Transport,
    /// Any other server-side failure.
    Internal,
}

/// Structured error returned by the remote table service.
///
/// The export core never inspects or retries these; they are carried
/// unchanged to the caller inside the matching [`super::TableSnapError`]
/// variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceError {
    pub kind: ServiceErrorKind,
    pub message: String,
}

impl ServiceError {
    pub fn new(kind: ServiceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::ResourceNotFound, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Validation, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Transport, message)
    }

    /// Convert error to compact JSON string (single line).
    pub fn to_json_compact(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for ServiceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServiceErrorKind::ResourceNotFound => "ResourceNotFound",
            ServiceErrorKind::AccessDenied => "AccessDenied",
            ServiceErrorKind::Throttled => "Throttled",
            ServiceErrorKind::Validation => "Validation",
            ServiceErrorKind::Transport => "Transport",
            ServiceErrorKind::Internal => "Internal",
        };
        f.write_str(name)
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ServiceError {}
