//! JSON Lines sink
//!
//! Appends one exported record per line, in the order submissions reach
//! the sink.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::SinkError;
use crate::export::record::ExportedRecord;

use super::{Sink, create_writer, validate_path};

/// Sink writing JSON Lines to a file
pub struct JsonLSink {
    /// Buffered file writer, `None` once finished
    writer: Mutex<Option<BufWriter<File>>>,
    /// Path to the output file
    path: PathBuf,
    /// Number of records written
    written: AtomicU64,
}

impl JsonLSink {
    /// Create a new JSON Lines sink
    ///
    /// # Arguments
    /// * `path` - Output file path
    ///
    /// # Returns
    /// * `Result<Self, SinkError>` - New sink instance or error
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, SinkError> {
        let path = path.as_ref();
        validate_path(path)?;
        let writer = create_writer(path).await?;

        debug!("Created JSON Lines sink for: {}", path.display());

        Ok(Self {
            writer: Mutex::new(Some(writer)),
            path: path.to_path_buf(),
            written: AtomicU64::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records written so far
    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    /// Get the current file size in bytes
    pub async fn file_size(&self) -> Result<u64, SinkError> {
        let metadata = tokio::fs::metadata(&self.path).await?;
        Ok(metadata.len())
    }
}

#[async_trait]
impl Sink for JsonLSink {
    async fn backup(&self, records: &[ExportedRecord]) -> Result<(), SinkError> {
        // Encode before taking the lock.
        let mut buffer = Vec::with_capacity(records.len() * 128);
        for record in records {
            serde_json::to_writer(&mut buffer, record)
                .map_err(|e| SinkError::Encode(e.to_string()))?;
            buffer.push(b'\n');
        }

        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(SinkError::Closed)?;
        writer.write_all(&buffer).await?;

        self.written
            .fetch_add(records.len() as u64, Ordering::Relaxed);
        Ok(())
    }

    async fn flush(&self) -> Result<(), SinkError> {
        let mut guard = self.writer.lock().await;
        if let Some(writer) = guard.as_mut() {
            writer.flush().await?;
        }
        Ok(())
    }

    async fn finish(&self) -> Result<(), SinkError> {
        let mut guard = self.writer.lock().await;
        if let Some(mut writer) = guard.take() {
            writer.flush().await?;
            writer.into_inner().sync_all().await?;
            debug!(
                "Finalized JSON Lines file: {} ({} records)",
                self.path.display(),
                self.written()
            );
        }
        Ok(())
    }
}
