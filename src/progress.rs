//! Progress-callback trait for board synchronization events.
//!
//! Inject an [`Arc<dyn SyncProgressCallback>`] via
//! [`crate::config::SyncConfigBuilder::progress_callback`] to observe a run
//! as the synchronizer moves through its phases and creates groups and items.
//!
//! # Example
//!
//! ```rust
//! use prd2board::{SyncConfig, SyncProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct ItemCounter(AtomicUsize);
//!
//! impl SyncProgressCallback for ItemCounter {
//!     fn on_item_created(&self, _group: &str, _task: &str) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = SyncConfig::builder("Roadmap")
//!     .progress_callback(Arc::new(ItemCounter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use crate::error::SyncIssue;
use crate::output::SyncStats;
use crate::sync::SyncPhase;
use std::sync::Arc;

/// Called by the synchronizer as it drives the remote board.
///
/// All methods default to no-ops. Calls arrive sequentially from the task
/// running the synchronization, but the trait is `Send + Sync` so one
/// callback can be shared by concurrent runs on different boards.
pub trait SyncProgressCallback: Send + Sync {
    /// Called once, after the precondition check and before any remote call.
    fn on_sync_start(&self, total_groups: usize, total_items: usize) {
        let _ = (total_groups, total_items);
    }

    /// Called each time the state machine enters a new phase.
    fn on_phase(&self, phase: SyncPhase) {
        let _ = phase;
    }

    /// Called when a remote group has been created.
    fn on_group_created(&self, group: &str, item_count: usize) {
        let _ = (group, item_count);
    }

    /// Called when a remote item has been created.
    fn on_item_created(&self, group: &str, task: &str) {
        let _ = (group, task);
    }

    /// Called for every non-fatal failure recorded in the report.
    fn on_issue(&self, issue: &SyncIssue) {
        let _ = issue;
    }

    /// Called once when the run reaches `Done`.
    fn on_sync_complete(&self, stats: &SyncStats) {
        let _ = stats;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl SyncProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::SyncConfig`].
pub type ProgressCallback = Arc<dyn SyncProgressCallback>;
