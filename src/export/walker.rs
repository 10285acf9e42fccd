//! Single-segment scan loop
//!
//! A [`SegmentWalker`] exhausts one segment: it fetches a page, turns every
//! row into an [`ExportedRecord`], submits each record to the sink as its
//! own unit of work and waits for all of them before asking for the next
//! page. At most one page per segment is ever in flight.

use std::sync::Arc;

use futures::future::try_join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{Result, TableSnapError};
use crate::table::ScanPage;

use super::fetcher::{PageFetcher, SegmentCursor};
use super::progress::{PageProgress, ProgressTracker};
use super::projector::KeyProjector;
use super::record::ExportedRecord;
use super::sink::Sink;

/// Outcome of one segment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentReport {
    pub segment: u32,
    /// Rows forwarded to the sink
    pub records: u64,
    /// Rows examined by the service
    pub scanned: u64,
    pub pages: u64,
    /// Stopped early because the run was cancelled
    pub cancelled: bool,
}

/// Drives one segment from its first page to exhaustion.
pub struct SegmentWalker {
    fetcher: PageFetcher,
    projector: Arc<KeyProjector>,
    sink: Arc<dyn Sink>,
    progress: Arc<ProgressTracker>,
    cursor: SegmentCursor,
    cancel_token: Option<CancellationToken>,
}

impl SegmentWalker {
    pub fn new(
        fetcher: PageFetcher,
        projector: Arc<KeyProjector>,
        sink: Arc<dyn Sink>,
        progress: Arc<ProgressTracker>,
        cursor: SegmentCursor,
    ) -> Self {
        Self {
            fetcher,
            projector,
            sink,
            progress,
            cursor,
            cancel_token: None,
        }
    }

    /// Stop before the next page once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel_token = Some(token);
        self
    }

    /// Walk the segment until it is exhausted.
    ///
    /// The first fetch or sink failure ends the walk; no page is retried
    /// and nothing already sent to the sink is undone.
    pub async fn run(mut self) -> Result<SegmentReport> {
        let mut report = SegmentReport {
            segment: self.cursor.segment,
            ..Default::default()
        };

        loop {
            if self.is_cancelled() {
                info!(
                    segment = report.segment,
                    "Segment stopped after {} records: run cancelled", report.records
                );
                report.cancelled = true;
                return Ok(report);
            }

            let ScanPage {
                items,
                last_evaluated_key,
                scanned_count,
            } = self.fetcher.fetch_page(&self.cursor).await?;

            let records: Vec<ExportedRecord> = items
                .into_iter()
                .map(|row| ExportedRecord::insert(self.projector.project(&row), row))
                .collect();

            self.forward(&records).await?;

            let page_rows = records.len() as u64;
            report.records += page_rows;
            report.scanned += scanned_count;
            report.pages += 1;

            self.progress.record_page(&PageProgress {
                segment: report.segment,
                page_rows,
                scanned: scanned_count,
                segment_total: report.records,
            });

            if !self.cursor.advance(last_evaluated_key) {
                break;
            }
        }

        debug!(
            segment = report.segment,
            pages = report.pages,
            "Segment exhausted after {} records", report.records
        );
        Ok(report)
    }

    /// Submit every record on its own, wait for all submissions, then flush.
    async fn forward(&self, records: &[ExportedRecord]) -> Result<()> {
        let submissions = records
            .iter()
            .map(|record| self.sink.backup(std::slice::from_ref(record)));

        try_join_all(submissions)
            .await
            .map_err(TableSnapError::Sink)?;
        self.sink.flush().await?;
        Ok(())
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_token
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::error::{ServiceError, ServiceResult, SinkError};
    use crate::export::sink::MemorySink;
    use crate::table::{
        ContinuationToken, Item, KeyAttribute, KeySchema, ProvisionedThroughput, ScanRequest,
        TableService, item,
    };

    /// Serves a scripted sequence of pages and records every request.
    struct ScriptedService {
        pages: Mutex<VecDeque<ServiceResult<ScanPage>>>,
        requests: Mutex<Vec<ScanRequest>>,
    }

    impl ScriptedService {
        fn new(pages: Vec<ServiceResult<ScanPage>>) -> Self {
            Self {
                pages: Mutex::new(pages.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl TableService for ScriptedService {
        async fn describe_key_schema(&self, _table: &str) -> ServiceResult<KeySchema> {
            Ok(schema())
        }

        async fn describe_provisioned_capacity(
            &self,
            _table: &str,
        ) -> ServiceResult<Option<ProvisionedThroughput>> {
            Ok(None)
        }

        async fn scan(&self, request: &ScanRequest) -> ServiceResult<ScanPage> {
            self.requests.lock().unwrap().push(request.clone());
            self.pages
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ServiceError::validation("no more scripted pages")))
        }

        async fn get_item(&self, _table: &str, _key: &Item) -> ServiceResult<Option<Item>> {
            Ok(None)
        }
    }

    /// Fails the n-th submission (0-based).
    struct FailingSink {
        fail_at: usize,
        calls: AtomicUsize,
        inner: MemorySink,
    }

    #[async_trait]
    impl Sink for FailingSink {
        async fn backup(&self, records: &[ExportedRecord]) -> std::result::Result<(), SinkError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == self.fail_at {
                return Err(SinkError::Rejected("disk full".to_string()));
            }
            self.inner.backup(records).await
        }
    }

    /// Counts flushes on top of a memory sink.
    #[derive(Default)]
    struct FlushCountingSink {
        flushes: AtomicUsize,
        inner: MemorySink,
    }

    #[async_trait]
    impl Sink for FlushCountingSink {
        async fn backup(&self, records: &[ExportedRecord]) -> std::result::Result<(), SinkError> {
            self.inner.backup(records).await
        }

        async fn flush(&self) -> std::result::Result<(), SinkError> {
            self.flushes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn schema() -> KeySchema {
        KeySchema::new(vec![KeyAttribute::hash("id")])
    }

    fn rows(ids: &[&str]) -> Vec<Item> {
        ids.iter()
            .map(|id| item([("id", *id), ("name", "x")]))
            .collect()
    }

    fn page(ids: &[&str], more: bool) -> ServiceResult<ScanPage> {
        let items = rows(ids);
        let last_evaluated_key = more
            .then(|| items.last())
            .flatten()
            .map(|last| ContinuationToken::new(item([("id", last["id"].clone())])));
        Ok(ScanPage {
            scanned_count: items.len() as u64 + 1,
            items,
            last_evaluated_key,
        })
    }

    fn walker(
        service: Arc<ScriptedService>,
        sink: Arc<dyn Sink>,
        progress: Arc<ProgressTracker>,
    ) -> SegmentWalker {
        SegmentWalker::new(
            PageFetcher::new(service, "users"),
            Arc::new(KeyProjector::new(schema())),
            sink,
            progress,
            SegmentCursor::new(0, 1, 3),
        )
    }

    #[tokio::test]
    async fn test_walks_pages_in_order_until_token_absent() {
        let service = Arc::new(ScriptedService::new(vec![
            page(&["a", "b", "c"], true),
            page(&["d", "e"], false),
        ]));
        let sink = Arc::new(MemorySink::new());
        let progress = Arc::new(ProgressTracker::new(false));

        let report = walker(service.clone(), sink.clone(), progress.clone())
            .run()
            .await
            .unwrap();

        assert_eq!(report.records, 5);
        assert_eq!(report.pages, 2);
        assert_eq!(report.scanned, 7);
        assert!(!report.cancelled);
        assert_eq!(progress.total(), 5);
        assert_eq!(service.calls(), 2);

        let records = sink.records();
        assert_eq!(records.len(), 5);
        assert_eq!(records[0].keys, item([("id", "a")]));
        assert_eq!(records[4].data, item([("id", "e"), ("name", "x")]));
        assert!(records
            .iter()
            .all(|r| r.event == crate::export::record::EventKind::Insert));

        // second request resumes from the first page's token
        let requests = service.requests.lock().unwrap();
        assert!(requests[0].exclusive_start_key.is_none());
        assert_eq!(
            requests[1].exclusive_start_key,
            Some(ContinuationToken::new(item([("id", "c")])))
        );
    }

    #[tokio::test]
    async fn test_sink_flushed_after_every_page() {
        let service = Arc::new(ScriptedService::new(vec![
            page(&["a", "b", "c"], true),
            page(&["d"], true),
            Err(ServiceError::transport("connection reset")),
        ]));
        let sink = Arc::new(FlushCountingSink::default());

        let err = walker(service, sink.clone(), Arc::new(ProgressTracker::new(false)))
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, TableSnapError::PageFetch { segment: 0, .. }));
        assert_eq!(sink.inner.len(), 4);
        assert_eq!(sink.flushes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_final_page() {
        let service = Arc::new(ScriptedService::new(vec![
            page(&["a", "b", "c"], true),
            page(&[], false),
        ]));
        let sink = Arc::new(MemorySink::new());

        let report = walker(service, sink.clone(), Arc::new(ProgressTracker::new(false)))
            .run()
            .await
            .unwrap();
        assert_eq!(report.records, 3);
        assert_eq!(report.pages, 2);
        assert_eq!(sink.len(), 3);
    }

    #[tokio::test]
    async fn test_fetch_failure_stops_segment() {
        let service = Arc::new(ScriptedService::new(vec![
            page(&["a", "b", "c"], true),
            Err(ServiceError::transport("connection reset")),
            page(&["d"], false),
        ]));
        let sink = Arc::new(MemorySink::new());
        let progress = Arc::new(ProgressTracker::new(false));

        let err = walker(service.clone(), sink.clone(), progress.clone())
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, TableSnapError::PageFetch { segment: 0, .. }));
        assert_eq!(service.calls(), 2);
        assert_eq!(sink.len(), 3);
        assert_eq!(progress.total(), 3);
    }

    #[tokio::test]
    async fn test_sink_failure_stops_before_next_page() {
        let service = Arc::new(ScriptedService::new(vec![
            page(&["a", "b", "c"], true),
            page(&["d"], false),
        ]));
        let sink = Arc::new(FailingSink {
            fail_at: 1,
            calls: AtomicUsize::new(0),
            inner: MemorySink::new(),
        });
        let progress = Arc::new(ProgressTracker::new(false));

        let err = walker(service.clone(), sink.clone(), progress.clone())
            .run()
            .await
            .unwrap_err();

        assert!(matches!(err, TableSnapError::Sink(SinkError::Rejected(_))));
        assert_eq!(service.calls(), 1);
        assert_eq!(progress.total(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_walker_fetches_nothing() {
        let service = Arc::new(ScriptedService::new(vec![page(&["a"], false)]));
        let token = CancellationToken::new();
        token.cancel();

        let report = walker(
            service.clone(),
            Arc::new(MemorySink::new()),
            Arc::new(ProgressTracker::new(false)),
        )
        .with_cancellation(token)
        .run()
        .await
        .unwrap();

        assert!(report.cancelled);
        assert_eq!(report.records, 0);
        assert_eq!(service.calls(), 0);
    }
}
