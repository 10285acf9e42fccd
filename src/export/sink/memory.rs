//! In-memory sink

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::SinkError;
use crate::export::record::ExportedRecord;

use super::Sink;

/// Sink that keeps every record in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<ExportedRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the records received so far.
    pub fn records(&self) -> Vec<ExportedRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Sink for MemorySink {
    async fn backup(&self, records: &[ExportedRecord]) -> Result<(), SinkError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|_| SinkError::Rejected("memory sink poisoned".to_string()))?;
        guard.extend_from_slice(records);
        Ok(())
    }
}
