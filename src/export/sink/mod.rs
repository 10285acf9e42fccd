//! Backup sinks for exported records
//!
//! A [`Sink`] receives exported records from every segment concurrently,
//! so implementations take `&self` and synchronize internally.

use async_trait::async_trait;
use std::path::Path;
use tokio::fs::File;
use tokio::io::BufWriter;

use crate::error::SinkError;

use super::record::ExportedRecord;

pub mod jsonl;
pub mod memory;

pub use jsonl::JsonLSink;
pub use memory::MemorySink;

/// Destination that durably persists exported records.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Persist a batch of records
    ///
    /// # Arguments
    /// * `records` - Records to back up
    ///
    /// # Returns
    /// * `Result<(), SinkError>` - Success or the storage failure
    async fn backup(&self, records: &[ExportedRecord]) -> Result<(), SinkError>;

    /// Make every record accepted so far durable
    ///
    /// Called after each page and on failed or cancelled runs, so records
    /// that were acknowledged survive an aborted export.
    async fn flush(&self) -> Result<(), SinkError> {
        Ok(())
    }

    /// Flush and close the sink after a successful run
    async fn finish(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Helper function to create a buffered file writer
///
/// # Arguments
/// * `path` - File path to create
///
/// # Returns
/// * `Result<BufWriter<File>, SinkError>` - Buffered writer or error
pub(crate) async fn create_writer(path: &Path) -> Result<BufWriter<File>, SinkError> {
    let file = File::create(path).await?;
    Ok(BufWriter::with_capacity(8 * 1024 * 1024, file)) // 8MB buffer
}

/// Helper function to validate file path and directory
///
/// # Arguments
/// * `path` - File path to validate
///
/// # Returns
/// * `Result<(), SinkError>` - Success or error
pub(crate) fn validate_path(path: &Path) -> Result<(), SinkError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(SinkError::Rejected(format!(
                "Directory does not exist: {}",
                parent.display()
            )));
        }
    }

    Ok(())
}
