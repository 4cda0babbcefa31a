//! Bundled discovery sources.

pub mod snapshot;

pub use snapshot::{Snapshot, SnapshotBatch, SnapshotEntry, SnapshotSource};
