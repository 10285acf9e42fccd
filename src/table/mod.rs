//! Remote table access
//!
//! - `types`: items, attribute values, key schema, continuation tokens
//! - `service`: the [`TableService`] client trait
//! - `memory`: an in-process [`TableService`] backed by a JSON table dump

pub mod memory;
pub mod service;
pub mod types;

pub use memory::{MemoryTable, TableDump};
pub use service::{ScanPage, ScanRequest, TableService};
pub use types::{
    AttributeValue, ContinuationToken, Item, KeyAttribute, KeySchema, KeyType,
    ProvisionedThroughput, item,
};
