//! Result types returned by planning and synchronization.
//!
//! Everything here is `Serialize + Deserialize` so the CLI's `--json` mode
//! can print a whole run and callers can persist reports for later resumes.

use crate::error::{ChunkError, SyncIssue};
use crate::model::{ColumnRegistry, TaskHierarchy};
use crate::sync::SyncPhase;
use serde::{Deserialize, Serialize};

// ── Planning ─────────────────────────────────────────────────────────────

/// The outcome of turning a PRD into a task hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanOutput {
    /// Groups merged across all successful chunks, in first-seen order.
    pub hierarchy: TaskHierarchy,
    /// One report per chunk, ordered by chunk index.
    pub chunks: Vec<ChunkReport>,
    pub stats: PlanStats,
}

/// What one chunk of PRD text produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkReport {
    /// 1-indexed chunk number.
    pub chunk: usize,
    /// Characters of PRD text in this chunk.
    pub chars: usize,
    pub groups: usize,
    pub items: usize,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,
    pub retries: u32,
    /// Set when the chunk produced nothing usable.
    pub error: Option<ChunkError>,
}

/// Aggregate statistics of a planning run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanStats {
    /// Characters of text extracted from the document.
    pub extracted_chars: usize,
    pub total_chunks: usize,
    pub parsed_chunks: usize,
    pub failed_chunks: usize,
    pub total_groups: usize,
    pub total_items: usize,
    /// Sum of all estimates, in days.
    pub total_estimate_days: f64,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub extract_duration_ms: u64,
    pub llm_duration_ms: u64,
    pub total_duration_ms: u64,
}

// ── Synchronization ──────────────────────────────────────────────────────

/// The outcome of a synchronization run that reached `Done`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    pub board_id: String,
    /// Public URL: board URL base followed by the board id.
    pub board_url: String,
    pub board_name: String,
    /// True when an existing board id was supplied and reused.
    pub reused_board: bool,
    /// Always [`SyncPhase::Done`] for a returned report.
    pub final_phase: SyncPhase,
    /// Columns that exist on the board after the run, by title.
    pub columns: ColumnRegistry,
    /// Remote groups created, in hierarchy order.
    pub groups: Vec<SyncedGroup>,
    /// Hierarchy groups with no items; no remote group was created for them.
    pub skipped_groups: Vec<String>,
    /// Every non-fatal failure, in the order it happened.
    pub issues: Vec<SyncIssue>,
    pub stats: SyncStats,
}

impl SyncReport {
    /// True when nothing was skipped or failed apart from empty groups.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// One remote group created by the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncedGroup {
    pub name: String,
    pub id: String,
    pub items_created: usize,
    pub items_failed: usize,
}

/// Counters of a synchronization run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncStats {
    pub columns_deleted: usize,
    pub columns_created: usize,
    pub groups_deleted: usize,
    pub groups_created: usize,
    pub items_created: usize,
    pub items_failed: usize,
    pub remote_calls: usize,
    pub duration_ms: u64,
}

// ── End to end ───────────────────────────────────────────────────────────

/// Planning followed by synchronization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateOutput {
    pub plan: PlanOutput,
    pub sync: SyncReport,
}
