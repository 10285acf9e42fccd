//! Segmented scan coordinator
//!
//! This module provides the entry point of an export run. It fetches the
//! key schema once, settles the page limit once, then runs one
//! [`SegmentWalker`] per segment concurrently and waits for all of them.

use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::config::ExportConfig;
use crate::error::{ConfigError, Result, TableSnapError};
use crate::table::{Item, KeySchema, TableService};

use super::fetcher::{PageFetcher, SegmentCursor, resolve_page_limit};
use super::progress::ProgressTracker;
use super::projector::KeyProjector;
use super::sink::Sink;
use super::walker::{SegmentReport, SegmentWalker};

/// Parameters of one export run
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    /// Table to export
    pub table: String,
    /// Fixed page limit; `None` means the default unless throughput limiting applies
    pub page_limit: Option<u32>,
    /// Share of provisioned read capacity to use per page, as a fraction
    pub throughput_percent: Option<f64>,
    /// Number of segments scanned in parallel
    pub total_segments: u32,
    /// Cancel sibling segments at their next page once one segment fails
    pub cancel_on_failure: bool,
    /// Render a spinner while exporting
    pub show_progress: bool,
}

impl ExportOptions {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            page_limit: None,
            throughput_percent: None,
            total_segments: 1,
            cancel_on_failure: false,
            show_progress: false,
        }
    }
}

impl From<&ExportConfig> for ExportOptions {
    fn from(config: &ExportConfig) -> Self {
        Self {
            table: config.table.clone(),
            page_limit: config.page_limit,
            throughput_percent: config.throughput_percent,
            total_segments: config.total_segments,
            cancel_on_failure: config.cancel_on_failure,
            show_progress: config.show_progress,
        }
    }
}

/// Result of an export run
#[derive(Debug, Clone)]
pub struct ExportSummary {
    /// Identifier attached to every log line of the run
    pub run_id: String,
    /// Rows forwarded to the sink
    pub records: u64,
    /// Rows examined by the service
    pub scanned: u64,
    pub pages: u64,
    /// Page limit used by every segment
    pub page_limit: u32,
    /// Per-segment outcomes, ordered by segment index
    pub segments: Vec<SegmentReport>,
    pub elapsed_ms: u64,
    /// Whether the run was cancelled before every segment was exhausted
    pub cancelled: bool,
}

/// Runs a full segmented export of one table into a sink
pub struct ScanCoordinator {
    service: Arc<dyn TableService>,
    sink: Arc<dyn Sink>,
    options: ExportOptions,
    cancel_token: Option<CancellationToken>,
}

impl ScanCoordinator {
    /// Create a new coordinator
    ///
    /// # Arguments
    /// * `service` - Shared table client
    /// * `sink` - Destination for exported records
    /// * `options` - Run parameters
    pub fn new(
        service: Arc<dyn TableService>,
        sink: Arc<dyn Sink>,
        options: ExportOptions,
    ) -> Self {
        Self {
            service,
            sink,
            options,
            cancel_token: None,
        }
    }

    /// Set an external cancellation token (e.g. wired to Ctrl+C)
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel_token = Some(token);
        self
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Export the whole table
    ///
    /// 1. Fetch the key schema
    /// 2. Resolve the page limit
    /// 3. Walk every segment concurrently
    /// 4. Finish the sink
    ///
    /// Resolves when every segment is exhausted; fails with the first
    /// segment error. Records already delivered to the sink stay there.
    pub async fn retrieve(&self) -> Result<ExportSummary> {
        let run_id = Uuid::new_v4().to_string();
        let span = info_span!("export", run_id = %run_id, table = %self.options.table);

        self.retrieve_inner(run_id).instrument(span).await
    }

    async fn retrieve_inner(&self, run_id: String) -> Result<ExportSummary> {
        let start_time = Instant::now();

        if self.options.total_segments == 0 {
            return Err(ConfigError::InvalidValue {
                field: "total_segments".to_string(),
                value: "0".to_string(),
            }
            .into());
        }

        let schema = self.get_table_keys().await?;
        let page_limit = resolve_page_limit(
            self.service.as_ref(),
            &self.options.table,
            self.options.page_limit,
            self.options.throughput_percent,
        )
        .await?;

        info!(
            "Starting export: {} segments, page limit {}",
            self.options.total_segments, page_limit
        );

        let progress = Arc::new(ProgressTracker::new(self.options.show_progress));
        let outcome = self
            .scan_segments(Arc::new(KeyProjector::new(schema)), page_limit, &progress)
            .await;
        progress.finish();
        let mut segments = match outcome {
            Ok(segments) => segments,
            Err(err) => {
                self.flush_partial().await;
                return Err(err);
            }
        };

        let cancelled = segments.iter().any(|s| s.cancelled);
        if cancelled {
            self.sink.flush().await?;
        } else {
            self.sink.finish().await?;
        }

        segments.sort_by_key(|s| s.segment);
        let elapsed_ms = start_time.elapsed().as_millis() as u64;
        let summary = ExportSummary {
            run_id,
            records: segments.iter().map(|s| s.records).sum(),
            scanned: segments.iter().map(|s| s.scanned).sum(),
            pages: segments.iter().map(|s| s.pages).sum(),
            page_limit,
            segments,
            elapsed_ms,
            cancelled,
        };

        info!(
            "Export {}: {} records, {} scanned, {} pages, {} ms",
            if cancelled { "cancelled" } else { "completed" },
            summary.records,
            summary.scanned,
            summary.pages,
            summary.elapsed_ms
        );

        Ok(summary)
    }

    /// Flush what the sink already accepted before reporting a failed run.
    async fn flush_partial(&self) {
        if let Err(err) = self.sink.flush().await {
            warn!("Failed to flush sink after aborted export: {}", err);
        }
    }

    /// Fetch the table's key schema
    pub async fn get_table_keys(&self) -> Result<KeySchema> {
        let schema = self
            .service
            .describe_key_schema(&self.options.table)
            .await
            .map_err(TableSnapError::SchemaDiscovery)?;

        info!("Got key schema {}", schema);
        Ok(schema)
    }

    /// Strongly consistent read of a single item
    ///
    /// # Returns
    /// * `Result<Item>` - The item, or an empty item when no row has this key
    pub async fn get_item(&self, key: &Item) -> Result<Item> {
        get_item(self.service.as_ref(), &self.options.table, key).await
    }

    /// Run one walker task per segment.
    ///
    /// Returns as soon as any walker fails. Walkers still running at that
    /// point are detached; with `cancel_on_failure` they are also told to
    /// stop before their next page.
    async fn scan_segments(
        &self,
        projector: Arc<KeyProjector>,
        page_limit: u32,
        progress: &Arc<ProgressTracker>,
    ) -> Result<Vec<SegmentReport>> {
        let total_segments = self.options.total_segments;
        let run_token = match &self.cancel_token {
            Some(parent) => parent.child_token(),
            None => CancellationToken::new(),
        };
        let fetcher = PageFetcher::new(self.service.clone(), self.options.table.clone());

        let mut pending: FuturesUnordered<_> = (0..total_segments)
            .map(|segment| {
                let walker = SegmentWalker::new(
                    fetcher.clone(),
                    projector.clone(),
                    self.sink.clone(),
                    progress.clone(),
                    SegmentCursor::new(segment, total_segments, page_limit),
                )
                .with_cancellation(run_token.clone());

                tokio::spawn(walker.run().instrument(info_span!("segment", segment)))
            })
            .collect();

        let mut reports = Vec::with_capacity(total_segments as usize);
        while let Some(joined) = pending.next().await {
            let failure = match joined {
                Ok(Ok(report)) => {
                    debug!(segment = report.segment, "Segment finished");
                    reports.push(report);
                    continue;
                }
                Ok(Err(err)) => err,
                Err(join_err) => {
                    error!("Segment task failed: {}", join_err);
                    TableSnapError::Generic(format!("segment task failed: {join_err}"))
                }
            };

            error!("Export aborted: {}", failure);
            if self.options.cancel_on_failure {
                run_token.cancel();
            }
            return Err(failure);
        }

        Ok(reports)
    }
}

/// Strongly consistent point read; an absent item comes back empty.
pub async fn get_item(service: &dyn TableService, table: &str, key: &Item) -> Result<Item> {
    let found = service.get_item(table, key).await?;
    Ok(found.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::error::{ServiceError, ServiceResult};
    use crate::export::sink::MemorySink;
    use crate::table::{
        KeyAttribute, MemoryTable, ProvisionedThroughput, ScanPage, ScanRequest, item,
    };

    /// Service whose schema and capacity calls can be made to fail.
    struct MetadataService {
        schema: ServiceResult<KeySchema>,
        capacity: Option<ProvisionedThroughput>,
        scans: AtomicUsize,
        last_limit: Mutex<Option<u32>>,
    }

    impl MetadataService {
        fn new(schema: ServiceResult<KeySchema>, capacity: Option<ProvisionedThroughput>) -> Self {
            Self {
                schema,
                capacity,
                scans: AtomicUsize::new(0),
                last_limit: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl TableService for MetadataService {
        async fn describe_key_schema(&self, _table: &str) -> ServiceResult<KeySchema> {
            self.schema.clone()
        }

        async fn describe_provisioned_capacity(
            &self,
            _table: &str,
        ) -> ServiceResult<Option<ProvisionedThroughput>> {
            Ok(self.capacity)
        }

        async fn scan(&self, request: &ScanRequest) -> ServiceResult<ScanPage> {
            self.scans.fetch_add(1, Ordering::SeqCst);
            *self.last_limit.lock().unwrap() = Some(request.limit);
            Ok(ScanPage {
                items: vec![item([("id", format!("{}", request.segment))])],
                last_evaluated_key: None,
                scanned_count: 1,
            })
        }

        async fn get_item(&self, _table: &str, _key: &Item) -> ServiceResult<Option<Item>> {
            Ok(None)
        }
    }

    fn schema() -> KeySchema {
        KeySchema::new(vec![KeyAttribute::hash("id")])
    }

    fn users(n: usize) -> MemoryTable {
        let mut table = MemoryTable::new("users", schema());
        for i in 0..n {
            table
                .put_item(item([("id", format!("user-{i:04}")), ("name", format!("n{i}"))]))
                .unwrap();
        }
        table
    }

    fn options(total_segments: u32, page_limit: u32) -> ExportOptions {
        ExportOptions {
            page_limit: Some(page_limit),
            total_segments,
            ..ExportOptions::new("users")
        }
    }

    #[tokio::test]
    async fn test_single_segment_export() {
        let table = Arc::new(users(12));
        let sink = Arc::new(MemorySink::new());
        let coordinator = ScanCoordinator::new(table.clone(), sink.clone(), options(1, 5));

        let summary = coordinator.retrieve().await.unwrap();
        assert_eq!(summary.records, 12);
        assert_eq!(summary.pages, 3);
        assert_eq!(summary.page_limit, 5);
        assert_eq!(summary.segments.len(), 1);
        assert!(!summary.cancelled);
        assert_eq!(sink.len(), 12);
    }

    #[tokio::test]
    async fn test_segments_cover_table_exactly_once() {
        let table = Arc::new(users(97));
        let sink = Arc::new(MemorySink::new());
        let coordinator = ScanCoordinator::new(table, sink.clone(), options(4, 6));

        let summary = coordinator.retrieve().await.unwrap();
        assert_eq!(summary.records, 97);
        assert_eq!(
            summary.segments.iter().map(|s| s.segment).collect::<Vec<_>>(),
            vec![0, 1, 2, 3]
        );
        assert_eq!(
            summary.segments.iter().map(|s| s.records).sum::<u64>(),
            97
        );

        let mut keys: Vec<String> = sink
            .records()
            .iter()
            .map(|r| serde_json::to_string(&r.keys).unwrap())
            .collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), 97);
    }

    #[tokio::test]
    async fn test_schema_failure_aborts_before_scanning() {
        let service = Arc::new(MetadataService::new(
            Err(ServiceError::not_found("Table: users not found")),
            None,
        ));
        let sink = Arc::new(MemorySink::new());
        let coordinator = ScanCoordinator::new(service.clone(), sink.clone(), options(3, 10));

        let err = coordinator.retrieve().await.unwrap_err();
        assert!(matches!(err, TableSnapError::SchemaDiscovery(_)));
        assert_eq!(service.scans.load(Ordering::SeqCst), 0);
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_missing_capacity_aborts_before_scanning() {
        let service = Arc::new(MetadataService::new(Ok(schema()), None));
        let coordinator = ScanCoordinator::new(
            service.clone(),
            Arc::new(MemorySink::new()),
            ExportOptions {
                throughput_percent: Some(0.5),
                total_segments: 2,
                ..ExportOptions::new("users")
            },
        );

        let err = coordinator.retrieve().await.unwrap_err();
        assert!(matches!(err, TableSnapError::CapacityConfiguration(_)));
        assert_eq!(service.scans.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_limit_from_throughput_percent() {
        let service = Arc::new(MetadataService::new(
            Ok(schema()),
            Some(ProvisionedThroughput {
                read_capacity_units: 40,
                write_capacity_units: 10,
            }),
        ));
        let coordinator = ScanCoordinator::new(
            service.clone(),
            Arc::new(MemorySink::new()),
            ExportOptions {
                throughput_percent: Some(0.25),
                ..ExportOptions::new("users")
            },
        );

        let summary = coordinator.retrieve().await.unwrap();
        assert_eq!(summary.page_limit, 10);
        assert_eq!(*service.last_limit.lock().unwrap(), Some(10));
    }

    #[tokio::test]
    async fn test_zero_segments_rejected() {
        let coordinator = ScanCoordinator::new(
            Arc::new(users(1)),
            Arc::new(MemorySink::new()),
            options(0, 10),
        );
        let err = coordinator.retrieve().await.unwrap_err();
        assert!(matches!(err, TableSnapError::Config(_)));
    }

    #[tokio::test]
    async fn test_external_cancellation_stops_segments() {
        let token = CancellationToken::new();
        token.cancel();
        let sink = Arc::new(MemorySink::new());
        let coordinator = ScanCoordinator::new(Arc::new(users(10)), sink.clone(), options(2, 3))
            .with_cancellation(token);

        let summary = coordinator.retrieve().await.unwrap();
        assert!(summary.cancelled);
        assert_eq!(summary.records, 0);
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_get_item() {
        let coordinator = ScanCoordinator::new(
            Arc::new(users(3)),
            Arc::new(MemorySink::new()),
            options(1, 10),
        );

        let found = coordinator
            .get_item(&item([("id", "user-0002")]))
            .await
            .unwrap();
        assert_eq!(found, item([("id", "user-0002"), ("name", "n2")]));

        let missing = coordinator.get_item(&item([("id", "nobody")])).await.unwrap();
        assert!(missing.is_empty());
    }
}
