//! End to end: plan a PRD, then materialise the plan as a board.

use crate::config::{PlanConfig, RemoteConfig, SyncConfig};
use crate::error::Prd2BoardError;
use crate::output::{GenerateOutput, PlanOutput};
use crate::plan::{plan_from_bytes, plan_from_pdf};
use crate::sync::sync_board;
use tracing::info;

/// Plan the PRD at `input_str` (path or URL) and build the board.
///
/// # Example
/// ```rust,no_run
/// use prd2board::{generate_board, default_extra_columns, PlanConfig, RemoteConfig, SyncConfig};
///
/// # async fn run() -> Result<(), prd2board::Prd2BoardError> {
/// let plan = PlanConfig::default();
/// let sync = SyncConfig::builder("Checkout revamp")
///     .columns(default_extra_columns())
///     .build()?;
/// let remote = RemoteConfig::builder(std::env::var("MONDAY_API_KEY").unwrap_or_default()).build()?;
///
/// let out = generate_board("prd.pdf", &plan, &sync, &remote).await?;
/// println!("{}", out.sync.board_url);
/// # Ok(())
/// # }
/// ```
pub async fn generate_board(
    input_str: impl AsRef<str>,
    plan: &PlanConfig,
    sync: &SyncConfig,
    remote: &RemoteConfig,
) -> Result<GenerateOutput, Prd2BoardError> {
    let planned = plan_from_pdf(input_str, plan).await?;
    finish(planned, sync, remote).await
}

/// Same as [`generate_board`] for a PRD held in memory.
pub async fn generate_board_from_bytes(
    bytes: &[u8],
    plan: &PlanConfig,
    sync: &SyncConfig,
    remote: &RemoteConfig,
) -> Result<GenerateOutput, Prd2BoardError> {
    let planned = plan_from_bytes(bytes, plan).await?;
    finish(planned, sync, remote).await
}

async fn finish(
    plan: PlanOutput,
    sync: &SyncConfig,
    remote: &RemoteConfig,
) -> Result<GenerateOutput, Prd2BoardError> {
    info!(
        "Synchronizing {} groups / {} tasks to board '{}'",
        plan.hierarchy.groups.len(),
        plan.hierarchy.item_count(),
        sync.board_name
    );
    let report = sync_board(&plan.hierarchy, sync, remote).await?;
    Ok(GenerateOutput { plan, sync: report })
}
