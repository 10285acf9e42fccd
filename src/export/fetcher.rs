//! Page fetching for segmented scans
//!
//! This module owns the per-segment scan cursor, the single bounded scan
//! call made for each page, and the once-per-run page limit resolution.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{Result, TableSnapError};
use crate::table::{ContinuationToken, ScanPage, ScanRequest, TableService};

/// Page limit used when neither a fixed limit nor a throughput percentage is set.
pub const DEFAULT_PAGE_LIMIT: u32 = 100;

/// Scan position of one segment.
///
/// Each segment owns its cursor; only the continuation token changes
/// between pages.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentCursor {
    pub segment: u32,
    pub total_segments: u32,
    pub continuation_token: Option<ContinuationToken>,
    pub page_limit: u32,
}

impl SegmentCursor {
    /// Cursor positioned at the start of `segment`.
    pub fn new(segment: u32, total_segments: u32, page_limit: u32) -> Self {
        Self {
            segment,
            total_segments,
            continuation_token: None,
            page_limit,
        }
    }

    /// Move to the position returned by the last page.
    ///
    /// # Returns
    /// * `bool` - `true` if the segment has more pages
    pub fn advance(&mut self, next: Option<ContinuationToken>) -> bool {
        self.continuation_token = next;
        self.continuation_token.is_some()
    }
}

/// Performs one bounded scan call per page.
#[derive(Clone)]
pub struct PageFetcher {
    service: Arc<dyn TableService>,
    table: String,
}

impl PageFetcher {
    pub fn new(service: Arc<dyn TableService>, table: impl Into<String>) -> Self {
        Self {
            service,
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Read the page at `cursor`.
    ///
    /// The read is strongly consistent and examines at most
    /// `cursor.page_limit` items. Service failures are returned unchanged,
    /// tagged with the segment index.
    pub async fn fetch_page(&self, cursor: &SegmentCursor) -> Result<ScanPage> {
        let request = ScanRequest {
            table: self.table.clone(),
            segment: cursor.segment,
            total_segments: cursor.total_segments,
            limit: cursor.page_limit,
            exclusive_start_key: cursor.continuation_token.clone(),
            consistent_read: true,
        };

        debug!(
            segment = cursor.segment,
            resumed = cursor.continuation_token.is_some(),
            "Scanning page"
        );

        self.service
            .scan(&request)
            .await
            .map_err(|source| TableSnapError::PageFetch {
                segment: cursor.segment,
                source,
            })
    }
}

/// Page limit derived from a share of the provisioned read capacity.
///
/// `percent` is a fraction (`0.25` means a quarter of the capacity); the
/// product is rounded down.
pub fn calculate_limit_from_throughput(percent: f64, read_capacity_units: u64) -> u64 {
    (percent * read_capacity_units as f64).floor() as u64
}

/// Decide the page limit for a run.
///
/// Without a throughput percentage this is the fixed limit (or
/// [`DEFAULT_PAGE_LIMIT`]). With one, the table's read capacity is fetched
/// once and scaled. If the table reports no capacity the fixed limit is used
/// when one was configured, otherwise the run fails before scanning.
pub async fn resolve_page_limit(
    service: &dyn TableService,
    table: &str,
    fixed_limit: Option<u32>,
    throughput_percent: Option<f64>,
) -> Result<u32> {
    let Some(percent) = throughput_percent else {
        return Ok(fixed_limit.unwrap_or(DEFAULT_PAGE_LIMIT));
    };

    let throughput = service.describe_provisioned_capacity(table).await?;
    let read_capacity = throughput.map(|t| t.read_capacity_units).unwrap_or(0);

    if read_capacity == 0 {
        return match fixed_limit {
            Some(limit) => {
                warn!(
                    "Table '{}' has no provisioned read capacity; using fixed limit {}",
                    table, limit
                );
                Ok(limit)
            }
            None => Err(TableSnapError::CapacityConfiguration(format!(
                "table '{table}' is not configured with provisioned throughput; specify a fixed page limit"
            ))),
        };
    }

    info!("Got provisioned read capacity: {} units", read_capacity);

    let limit = calculate_limit_from_throughput(percent, read_capacity);
    if limit == 0 {
        return Err(TableSnapError::CapacityConfiguration(format!(
            "{percent} of {read_capacity} read capacity units rounds down to a page limit of 0"
        )));
    }

    Ok(u32::try_from(limit).unwrap_or(u32::MAX))
}
