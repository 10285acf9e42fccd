//! Error handling for table export operations.
//!
//! This module provides the error taxonomy used across the crate:
//! - Errors raised by the remote table service (`ServiceError`)
//! - Errors raised by backup sinks (`SinkError`)
//! - Configuration errors
//! - The top-level `TableSnapError` that every fallible operation returns
//!
//! # Example
//!
//! ```rust,no_run
//! use tablesnap::error::{Result, TableSnapError};
//!
//! fn example_operation() -> Result<()> {
//!     Err(TableSnapError::CapacityConfiguration(
//!         "table has no provisioned read capacity".to_string(),
//!     ))
//! }
//! ```

pub mod kinds;
pub mod service;

// Re-export commonly used types
pub use kinds::{ConfigError, Result, SinkError, TableSnapError};
pub use service::{ServiceError, ServiceErrorKind, ServiceResult};
