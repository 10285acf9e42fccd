//! Segmented full-table export
//!
//! This module exports every row of a table into a backup sink:
//! - The table is split into disjoint segments that are scanned in parallel
//! - Each segment is paged with continuation tokens, one page in flight at a time
//! - Every row is sent to the sink together with its primary key projection
//! - Progress is tracked per page and aggregated across segments
//!
//! # Architecture
//!
//! 1. **KeyProjector**: derives the key-only projection of a row
//! 2. **PageFetcher**: performs one bounded scan call for one segment
//! 3. **SegmentWalker**: pages through one segment and forwards records to the sink
//! 4. **ScanCoordinator**: runs all walkers concurrently and fails on the first error
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tablesnap::export::{ExportOptions, JsonLSink, ScanCoordinator};
//! use tablesnap::table::MemoryTable;
//!
//! # async fn run() -> tablesnap::Result<()> {
//! let table = Arc::new(MemoryTable::from_dump_file("users.json")?);
//! let sink = Arc::new(JsonLSink::new("users.jsonl").await?);
//!
//! let options = ExportOptions {
//!     total_segments: 4,
//!     ..ExportOptions::new("users")
//! };
//! let summary = ScanCoordinator::new(table, sink, options).retrieve().await?;
//! println!("exported {} records", summary.records);
//! # Ok(())
//! # }
//! ```

pub mod coordinator;
pub mod fetcher;
pub mod progress;
pub mod projector;
pub mod record;
pub mod sink;
pub mod walker;

pub use coordinator::{ExportOptions, ExportSummary, ScanCoordinator, get_item};
pub use fetcher::{DEFAULT_PAGE_LIMIT, PageFetcher, SegmentCursor};
pub use progress::{PageProgress, ProgressTracker};
pub use projector::KeyProjector;
pub use record::{EventKind, ExportedRecord};
pub use sink::{JsonLSink, MemorySink, Sink};
pub use walker::{SegmentReport, SegmentWalker};
