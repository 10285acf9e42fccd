//! Shared fixtures for export integration tests

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use tablesnap::error::{ServiceError, ServiceResult, SinkError};
use tablesnap::export::{ExportedRecord, MemorySink, Sink};
use tablesnap::table::{
    ContinuationToken, Item, KeyAttribute, KeySchema, ProvisionedThroughput, ScanPage,
    ScanRequest, TableService, item,
};

/// One scripted response of one segment.
pub struct Step {
    /// Notified when the scan call starts
    pub signal: Option<Arc<Notify>>,
    /// Awaited before the call returns
    pub wait: Option<Arc<Notify>>,
    pub result: ServiceResult<ScanPage>,
}

impl Step {
    /// Page of rows `prefix-0..prefix-n`; `more` attaches a continuation token.
    pub fn page(prefix: &str, rows: usize, more: bool) -> Self {
        let items: Vec<Item> = (0..rows)
            .map(|i| item([("id", format!("{prefix}-{i}")), ("body", format!("row {i}"))]))
            .collect();
        let last_evaluated_key = if more {
            items
                .last()
                .map(|last| ContinuationToken::new(item([("id", last["id"].clone())])))
        } else {
            None
        };
        Self {
            signal: None,
            wait: None,
            result: Ok(ScanPage {
                scanned_count: items.len() as u64,
                items,
                last_evaluated_key,
            }),
        }
    }

    pub fn fail(message: &str) -> Self {
        Self {
            signal: None,
            wait: None,
            result: Err(ServiceError::transport(message)),
        }
    }

    pub fn signalling(mut self, notify: &Arc<Notify>) -> Self {
        self.signal = Some(notify.clone());
        self
    }

    pub fn waiting_for(mut self, notify: &Arc<Notify>) -> Self {
        self.wait = Some(notify.clone());
        self
    }
}

/// Table service replaying scripted pages per segment.
pub struct ScriptedTable {
    scripts: Mutex<HashMap<u32, VecDeque<Step>>>,
    calls: Mutex<HashMap<u32, usize>>,
    throughput: Option<ProvisionedThroughput>,
}

impl ScriptedTable {
    pub fn new(scripts: Vec<(u32, Vec<Step>)>) -> Self {
        Self {
            scripts: Mutex::new(
                scripts
                    .into_iter()
                    .map(|(segment, steps)| (segment, steps.into()))
                    .collect(),
            ),
            calls: Mutex::new(HashMap::new()),
            throughput: None,
        }
    }

    /// Scan calls made for `segment` so far.
    pub fn calls(&self, segment: u32) -> usize {
        self.calls.lock().unwrap().get(&segment).copied().unwrap_or(0)
    }
}

pub fn id_schema() -> KeySchema {
    KeySchema::new(vec![KeyAttribute::hash("id")])
}

#[async_trait]
impl TableService for ScriptedTable {
    async fn describe_key_schema(&self, _table: &str) -> ServiceResult<KeySchema> {
        Ok(id_schema())
    }

    async fn describe_provisioned_capacity(
        &self,
        _table: &str,
    ) -> ServiceResult<Option<ProvisionedThroughput>> {
        Ok(self.throughput)
    }

    async fn scan(&self, request: &ScanRequest) -> ServiceResult<ScanPage> {
        *self.calls.lock().unwrap().entry(request.segment).or_default() += 1;
        let step = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&request.segment)
            .and_then(VecDeque::pop_front);

        let Some(step) = step else {
            return Err(ServiceError::validation(format!(
                "segment {} has no more scripted pages",
                request.segment
            )));
        };

        if let Some(signal) = step.signal {
            signal.notify_one();
        }
        if let Some(wait) = step.wait {
            wait.notified().await;
        }
        step.result
    }

    async fn get_item(&self, _table: &str, _key: &Item) -> ServiceResult<Option<Item>> {
        Ok(None)
    }
}

/// Memory sink that notifies once it holds `threshold` records.
pub struct ThresholdSink {
    pub inner: MemorySink,
    threshold: usize,
    reached: Arc<Notify>,
}

impl ThresholdSink {
    pub fn new(threshold: usize, reached: &Arc<Notify>) -> Self {
        Self {
            inner: MemorySink::new(),
            threshold,
            reached: reached.clone(),
        }
    }
}

#[async_trait]
impl Sink for ThresholdSink {
    async fn backup(&self, records: &[ExportedRecord]) -> Result<(), SinkError> {
        self.inner.backup(records).await?;
        if self.inner.len() >= self.threshold {
            self.reached.notify_one();
        }
        Ok(())
    }
}

/// Forwards to another sink and cancels `token` once `after` records went through.
pub struct CancellingSink<S> {
    inner: Arc<S>,
    after: u64,
    seen: AtomicU64,
    token: CancellationToken,
}

impl<S: Sink> CancellingSink<S> {
    pub fn new(inner: Arc<S>, after: u64, token: &CancellationToken) -> Self {
        Self {
            inner,
            after,
            seen: AtomicU64::new(0),
            token: token.clone(),
        }
    }
}

#[async_trait]
impl<S: Sink> Sink for CancellingSink<S> {
    async fn backup(&self, records: &[ExportedRecord]) -> Result<(), SinkError> {
        self.inner.backup(records).await?;
        self.seen.fetch_add(records.len() as u64, Ordering::SeqCst);
        Ok(())
    }

    async fn flush(&self) -> Result<(), SinkError> {
        self.inner.flush().await?;
        if self.seen.load(Ordering::SeqCst) >= self.after {
            self.token.cancel();
        }
        Ok(())
    }

    async fn finish(&self) -> Result<(), SinkError> {
        self.inner.finish().await
    }
}

/// Wait until `condition` holds, failing the test after two seconds.
pub async fn eventually<F: Fn() -> bool>(condition: F) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
