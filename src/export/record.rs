//! Exported record shape handed to backup sinks

use serde::{Deserialize, Serialize};

use crate::table::Item;

/// Change-event tag attached to every exported record.
///
/// A full-table export only ever produces inserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventKind {
    Insert,
}

/// One row of the table as delivered to a sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedRecord {
    /// Key-only projection of `data`
    pub keys: Item,
    /// The full row
    pub data: Item,
    pub event: EventKind,
}

impl ExportedRecord {
    pub fn insert(keys: Item, data: Item) -> Self {
        Self {
            keys,
            data,
            event: EventKind::Insert,
        }
    }
}
