//! tablesnap library
//!
//! Exports the full contents of a key-value table into a backup sink using
//! parallel segmented scans with resumable pagination.
//!
//! # Modules
//!
//! - `cli`: Command-line interface and argument parsing
//! - `config`: Configuration management
//! - `error`: Error types and handling
//! - `export`: Segmented scan coordinator, walkers, sinks and progress
//! - `table`: Table data model and the table service interface
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tablesnap::export::{ExportOptions, MemorySink, ScanCoordinator};
//! use tablesnap::table::MemoryTable;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let table = Arc::new(MemoryTable::from_dump_file("users.json")?);
//!     let sink = Arc::new(MemorySink::new());
//!
//!     let coordinator = ScanCoordinator::new(table, sink.clone(), ExportOptions::new("users"));
//!     let summary = coordinator.retrieve().await?;
//!
//!     println!("Exported {} records", summary.records);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod table;

// Re-export commonly used types
pub use config::Config;
pub use error::{Result, TableSnapError};
pub use export::{ExportOptions, ExportSummary, ScanCoordinator};
pub use table::TableService;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string
pub fn version() -> &'static str {
    VERSION
}
