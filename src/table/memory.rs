//! In-process table backend
//!
//! [`MemoryTable`] serves a single table from memory with the same paging
//! and segmenting semantics as the remote service: items are returned in
//! primary key order, a page stops after `limit` examined items, and a full
//! page always carries a continuation token (even when it happens to be the
//! last one, which then yields an empty final page).
//!
//! Segments are assigned by hashing the encoded primary key, so every item
//! belongs to exactly one segment for a given `total_segments`.

use std::collections::BTreeMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::ops::Bound;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, Result, ServiceError, ServiceResult};

use super::service::{ScanPage, ScanRequest, TableService};
use super::types::{ContinuationToken, Item, KeySchema, ProvisionedThroughput};

/// On-disk table dump understood by [`MemoryTable::from_dump_file`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TableDump {
    pub table_name: String,
    pub key_schema: KeySchema,
    #[serde(default)]
    pub provisioned_throughput: Option<ProvisionedThroughput>,
    #[serde(default)]
    pub items: Vec<Item>,
}

/// Single-table, in-memory implementation of [`TableService`].
pub struct MemoryTable {
    name: String,
    key_schema: KeySchema,
    throughput: Option<ProvisionedThroughput>,
    /// Items keyed by their encoded primary key
    items: BTreeMap<String, Item>,
    scan_calls: AtomicU64,
}

impl MemoryTable {
    pub fn new(name: impl Into<String>, key_schema: KeySchema) -> Self {
        Self {
            name: name.into(),
            key_schema,
            throughput: None,
            items: BTreeMap::new(),
            scan_calls: AtomicU64::new(0),
        }
    }

    /// Set the provisioned throughput reported by `describe_provisioned_capacity`.
    pub fn with_throughput(mut self, throughput: ProvisionedThroughput) -> Self {
        self.throughput = Some(throughput);
        self
    }

    /// Load a table from a JSON dump file.
    pub fn from_dump_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::FileNotFound(format!("{}: {}", path.display(), e))
        })?;
        let dump: TableDump = serde_json::from_str(&content)?;
        let table = Self::from_dump(dump)?;

        debug!(
            "Loaded table '{}' with {} items from {}",
            table.name,
            table.len(),
            path.display()
        );
        Ok(table)
    }

    /// Build a table from an already parsed dump.
    pub fn from_dump(dump: TableDump) -> Result<Self> {
        let mut table = Self::new(dump.table_name, dump.key_schema);
        table.throughput = dump.provisioned_throughput;
        for item in dump.items {
            table.put_item(item)?;
        }
        Ok(table)
    }

    /// Insert or replace an item.
    pub fn put_item(&mut self, item: Item) -> ServiceResult<()> {
        let key = self.encode_key(&item)?;
        self.items.insert(key, item);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of scan calls served so far.
    pub fn scan_calls(&self) -> u64 {
        self.scan_calls.load(Ordering::Relaxed)
    }

    fn check_table(&self, table: &str) -> ServiceResult<()> {
        if table == self.name {
            Ok(())
        } else {
            Err(ServiceError::not_found(format!(
                "Requested resource not found: Table: {table} not found"
            )))
        }
    }

    /// Encode the primary key of `item` into an order-preserving string.
    fn encode_key(&self, item: &Item) -> ServiceResult<String> {
        let mut parts = Vec::with_capacity(self.key_schema.len());
        for name in self.key_schema.attribute_names() {
            let value = item.get(name).ok_or_else(|| {
                ServiceError::validation(format!(
                    "One of the required keys was not given a value: {name}"
                ))
            })?;
            if !value.is_scalar_key() {
                return Err(ServiceError::validation(format!(
                    "Key attribute '{name}' must be a string, number or binary"
                )));
            }
            parts.push(serde_json::to_string(value).map_err(|e| {
                ServiceError::validation(format!("Unencodable key attribute '{name}': {e}"))
            })?);
        }
        Ok(parts.join("\u{1f}"))
    }

    fn segment_of(encoded_key: &str, total_segments: u32) -> u32 {
        let mut hasher = DefaultHasher::new();
        encoded_key.hash(&mut hasher);
        (hasher.finish() % u64::from(total_segments)) as u32
    }

    fn key_projection(&self, item: &Item) -> Item {
        self.key_schema
            .attribute_names()
            .filter_map(|name| item.get(name).map(|v| (name.to_string(), v.clone())))
            .collect()
    }
}

#[async_trait]
impl TableService for MemoryTable {
    async fn describe_key_schema(&self, table: &str) -> ServiceResult<KeySchema> {
        self.check_table(table)?;
        Ok(self.key_schema.clone())
    }

    async fn describe_provisioned_capacity(
        &self,
        table: &str,
    ) -> ServiceResult<Option<ProvisionedThroughput>> {
        self.check_table(table)?;
        Ok(self.throughput)
    }

    async fn scan(&self, request: &ScanRequest) -> ServiceResult<ScanPage> {
        self.check_table(&request.table)?;
        self.scan_calls.fetch_add(1, Ordering::Relaxed);

        if request.total_segments == 0 || request.segment >= request.total_segments {
            return Err(ServiceError::validation(format!(
                "Segment {} out of range for {} total segments",
                request.segment, request.total_segments
            )));
        }
        if request.limit == 0 {
            return Err(ServiceError::validation(
                "Limit must be greater than or equal to 1",
            ));
        }

        let start = match &request.exclusive_start_key {
            Some(token) => Some(self.encode_key(token.last_evaluated_key())?),
            None => None,
        };
        let lower = match &start {
            Some(start) => Bound::Excluded(start.as_str()),
            None => Bound::Unbounded,
        };

        let candidates = self.items.range::<str, _>((lower, Bound::Unbounded));

        let mut items = Vec::new();
        for (key, item) in candidates {
            if Self::segment_of(key, request.total_segments) != request.segment {
                continue;
            }
            items.push(item.clone());
            if items.len() == request.limit as usize {
                break;
            }
        }

        let last_evaluated_key = if items.len() == request.limit as usize {
            items
                .last()
                .map(|last| ContinuationToken::new(self.key_projection(last)))
        } else {
            None
        };

        Ok(ScanPage {
            scanned_count: items.len() as u64,
            items,
            last_evaluated_key,
        })
    }

    async fn get_item(&self, table: &str, key: &Item) -> ServiceResult<Option<Item>> {
        self.check_table(table)?;
        let encoded = self.encode_key(key)?;
        Ok(self.items.get(&encoded).cloned())
    }
}
