//! Table service abstraction
//!
//! [`TableService`] is the one handle through which the exporter reaches the
//! remote table. It is created once per process and shared by every
//! component as `Arc<dyn TableService>`.

use async_trait::async_trait;

use crate::error::ServiceResult;

use super::types::{ContinuationToken, Item, KeySchema, ProvisionedThroughput};

/// One bounded scan request against one segment of a table.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanRequest {
    /// Table name
    pub table: String,
    /// Segment to read, in `0..total_segments`
    pub segment: u32,
    /// Number of logical partitions the table is split into
    pub total_segments: u32,
    /// Maximum number of items to examine
    pub limit: u32,
    /// Resume position; `None` starts at the beginning of the segment
    pub exclusive_start_key: Option<ContinuationToken>,
    /// Request a strongly consistent read
    pub consistent_read: bool,
}

/// Result of one scan call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanPage {
    pub items: Vec<Item>,
    /// Present when the segment may hold more items
    pub last_evaluated_key: Option<ContinuationToken>,
    /// Number of items examined before filtering
    pub scanned_count: u64,
}

/// Client interface to the remote key-value table.
#[async_trait]
pub trait TableService: Send + Sync {
    /// Fetch the ordered primary key schema of a table.
    async fn describe_key_schema(&self, table: &str) -> ServiceResult<KeySchema>;

    /// Fetch provisioned throughput, `None` when the table is on-demand.
    async fn describe_provisioned_capacity(
        &self,
        table: &str,
    ) -> ServiceResult<Option<ProvisionedThroughput>>;

    /// Read one page of one segment.
    async fn scan(&self, request: &ScanRequest) -> ServiceResult<ScanPage>;

    /// Strongly consistent point read by primary key.
    async fn get_item(&self, table: &str, key: &Item) -> ServiceResult<Option<Item>>;
}
