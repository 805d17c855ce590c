//! Board synchronization: replay a [`TaskHierarchy`] onto a remote board.
//!
//! The run is a strictly sequential state machine. Each step needs an id
//! produced by the one before it (board id before columns, column ids
//! before items, group id before its items), so nothing is parallelised.
//!
//! ```text
//! Idle ─▶ BoardAcquired ─▶ ColumnsReset ─▶ EstimateColumnReady
//!      ─▶ ExtraColumnsAttempted ─▶ FirstGroupSeeded ─▶ DefaultsPruned
//!      ─▶ Populating ─▶ Done
//! ```
//!
//! Groups are created in hierarchy order, each placed directly below the
//! previous one, so the board reads top to bottom like the hierarchy.
//!
//! Only three things abort a run: an empty first group (checked before any
//! remote call), board creation, and creation of the estimate column. The
//! first group's creation is also fatal because default groups may only be
//! pruned once a real, populated group exists. If none of the first group's
//! items could be created, pruning is skipped and reported instead.
//! Every later failure touches one column, group or item; it is recorded
//! as a [`SyncIssue`] and the run moves on to the next sibling.
//!
//! Column and group listings are fetched fresh inside the run and never
//! cached across runs. Concurrent runs against the *same* board are not
//! supported; runs against different boards share no local state.

use crate::config::{RemoteConfig, SyncConfig};
use crate::error::{Prd2BoardError, SetupError, SyncIssue};
use crate::model::{ColumnKind, ColumnRegistry, ColumnSpec, Group, Item, TaskHierarchy};
use crate::output::{SyncReport, SyncStats, SyncedGroup};
use crate::progress::{NoopProgressCallback, SyncProgressCallback};
use crate::remote::{BoardApi, ColumnValues, MondayClient};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// States of a synchronization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    Idle,
    BoardAcquired,
    ColumnsReset,
    EstimateColumnReady,
    ExtraColumnsAttempted,
    FirstGroupSeeded,
    DefaultsPruned,
    Populating,
    Done,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncPhase::Idle => "idle",
            SyncPhase::BoardAcquired => "board acquired",
            SyncPhase::ColumnsReset => "columns reset",
            SyncPhase::EstimateColumnReady => "estimate column ready",
            SyncPhase::ExtraColumnsAttempted => "extra columns attempted",
            SyncPhase::FirstGroupSeeded => "first group seeded",
            SyncPhase::DefaultsPruned => "defaults pruned",
            SyncPhase::Populating => "populating",
            SyncPhase::Done => "done",
        };
        f.write_str(s)
    }
}

/// Drives a [`BoardApi`] through the steps that materialise a hierarchy.
///
/// The synchronizer owns no remote state; it can be reused for any number
/// of sequential runs, and separate instances can run concurrently on
/// different boards.
pub struct BoardSynchronizer {
    api: Arc<dyn BoardApi>,
    config: SyncConfig,
    board_url_base: String,
}

impl BoardSynchronizer {
    pub fn new(api: Arc<dyn BoardApi>, config: SyncConfig) -> Self {
        Self {
            api,
            config,
            board_url_base: crate::config::DEFAULT_BOARD_URL_BASE.to_string(),
        }
    }

    /// Override the prefix used to build the board URL in the report.
    pub fn with_board_url_base(mut self, base: impl Into<String>) -> Self {
        self.board_url_base = base.into();
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Materialise `hierarchy` as a populated board.
    ///
    /// # Errors
    /// Returns [`SetupError`] only for the fatal steps. Everything else is
    /// reported in [`SyncReport::issues`].
    pub async fn run(&self, hierarchy: &TaskHierarchy) -> Result<SyncReport, SetupError> {
        let first = check_first_group(hierarchy)?;

        let noop = NoopProgressCallback;
        let progress: &dyn SyncProgressCallback = match self.config.progress_callback {
            Some(ref cb) => cb.as_ref(),
            None => &noop,
        };

        let mut run = Run {
            api: self.api.as_ref(),
            config: &self.config,
            progress,
            board_id: String::new(),
            phase: SyncPhase::Idle,
            registry: ColumnRegistry::new(),
            groups: Vec::new(),
            last_group_id: None,
            skipped_groups: Vec::new(),
            issues: Vec::new(),
            stats: SyncStats::default(),
        };

        let start = Instant::now();
        progress.on_sync_start(hierarchy.populated_group_count(), hierarchy.item_count());

        let reused = run.acquire_board().await?;
        info!("Board URL: {}{}", self.board_url_base, run.board_id);
        run.reset_columns().await;
        run.create_estimate_column().await?;
        run.create_extra_columns().await;
        let (first_group_id, seeded_items) = run.seed_first_group(first).await?;
        run.prune_default_groups(first, &first_group_id, seeded_items).await;
        run.populate_remaining(&hierarchy.groups[1..]).await;

        run.stats.duration_ms = start.elapsed().as_millis() as u64;
        run.enter(SyncPhase::Done);
        progress.on_sync_complete(&run.stats);

        info!(
            "Board '{}' populated: {} groups, {} items, {} issues in {}ms",
            self.config.board_name,
            run.stats.groups_created,
            run.stats.items_created,
            run.issues.len(),
            run.stats.duration_ms
        );

        Ok(SyncReport {
            board_url: format!("{}{}", self.board_url_base, run.board_id),
            board_id: run.board_id,
            board_name: self.config.board_name.clone(),
            reused_board: reused,
            final_phase: run.phase,
            columns: run.registry,
            groups: run.groups,
            skipped_groups: run.skipped_groups,
            issues: run.issues,
            stats: run.stats,
        })
    }
}

/// Precondition: a first group with at least one item. Checked before any
/// remote call so a bad hierarchy never leaves a half-built board.
fn check_first_group(hierarchy: &TaskHierarchy) -> Result<&Group, SetupError> {
    let first = hierarchy.groups.first().ok_or(SetupError::EmptyHierarchy)?;
    if first.items.is_empty() {
        return Err(SetupError::EmptyFirstGroup {
            group: first.name.clone(),
        });
    }
    Ok(first)
}

/// Mutable state of one run. Dropped when the run ends.
struct Run<'a> {
    api: &'a dyn BoardApi,
    config: &'a SyncConfig,
    progress: &'a dyn SyncProgressCallback,
    board_id: String,
    phase: SyncPhase,
    registry: ColumnRegistry,
    groups: Vec<SyncedGroup>,
    /// Most recently created group; the next one is placed below it.
    last_group_id: Option<String>,
    skipped_groups: Vec<String>,
    issues: Vec<SyncIssue>,
    stats: SyncStats,
}

impl Run<'_> {
    fn enter(&mut self, phase: SyncPhase) {
        debug!("sync phase: {} → {}", self.phase, phase);
        self.phase = phase;
        self.progress.on_phase(phase);
    }

    fn record(&mut self, issue: SyncIssue) {
        warn!("{}", issue);
        self.progress.on_issue(&issue);
        self.issues.push(issue);
    }

    fn call(&mut self) {
        self.stats.remote_calls += 1;
    }

    // ── Step 1 ───────────────────────────────────────────────────────────

    /// Rename the supplied board, or create a new one. Returns whether an
    /// existing board was reused.
    async fn acquire_board(&mut self) -> Result<bool, SetupError> {
        let config = self.config;
        let name = config.board_name.as_str();
        let reused = match config.existing_board_id {
            Some(ref id) => {
                info!("Using existing board {}", id);
                self.board_id = id.clone();
                self.call();
                let renamed = self.api.rename_board(id, name).await;
                if let Err(source) = renamed {
                    self.record(SyncIssue::BoardRename {
                        board_id: id.clone(),
                        source,
                    });
                } else {
                    debug!("Board {} renamed to '{}'", id, name);
                }
                true
            }
            None => {
                info!("Creating board '{}'", name);
                self.call();
                self.board_id = self
                    .api
                    .create_board(name)
                    .await
                    .map_err(SetupError::BoardCreation)?;
                info!("Board created: {} (id {})", name, self.board_id);
                false
            }
        };
        self.enter(SyncPhase::BoardAcquired);
        Ok(reused)
    }

    // ── Step 2 ───────────────────────────────────────────────────────────

    /// Delete every column currently on the board.
    async fn reset_columns(&mut self) {
        self.call();
        let listed = self.api.list_columns(&self.board_id).await;
        match listed {
            Ok(columns) => {
                for col in columns {
                    self.call();
                    let deleted = self.api.delete_column(&self.board_id, &col.id).await;
                    match deleted {
                        Ok(()) => {
                            debug!("Deleted column '{}' ({})", col.title, col.id);
                            self.stats.columns_deleted += 1;
                        }
                        Err(source) => self.record(SyncIssue::ColumnDelete {
                            column_id: col.id,
                            title: col.title,
                            source,
                        }),
                    }
                }
            }
            Err(source) => self.record(SyncIssue::ColumnList { source }),
        }
        self.enter(SyncPhase::ColumnsReset);
    }

    // ── Step 3 ───────────────────────────────────────────────────────────

    async fn create_estimate_column(&mut self) -> Result<(), SetupError> {
        let title = self.config.estimate_column_title.clone();
        self.call();
        let id = self
            .api
            .create_column(&self.board_id, &title, ColumnKind::Numbers, None, None)
            .await
            .map_err(|source| SetupError::MandatoryColumn {
                board_id: self.board_id.clone(),
                title: title.clone(),
                source,
            })?;
        info!("Created estimate column '{}' ({})", title, id);
        self.registry.insert(title, id);
        self.stats.columns_created += 1;
        self.enter(SyncPhase::EstimateColumnReady);
        Ok(())
    }

    // ── Step 4 ───────────────────────────────────────────────────────────

    /// Create each declared extra column in order. Failures are skipped.
    async fn create_extra_columns(&mut self) {
        let config = self.config;
        let specs: &[ColumnSpec] = &config.columns;
        let mut seen: HashSet<&str> = HashSet::new();
        for spec in specs {
            if spec.title == config.estimate_column_title {
                self.record(SyncIssue::ColumnSkipped {
                    title: spec.title.clone(),
                    reason: "title is reserved for the estimate column".into(),
                });
                continue;
            }
            if !seen.insert(spec.title.as_str()) {
                self.record(SyncIssue::ColumnSkipped {
                    title: spec.title.clone(),
                    reason: "duplicate column title".into(),
                });
                continue;
            }

            let defaults = spec.defaults();
            self.call();
            let created = self
                .api
                .create_column(
                    &self.board_id,
                    &spec.title,
                    spec.kind,
                    spec.description.as_deref(),
                    defaults.as_ref(),
                )
                .await;
            match created {
                Ok(id) => {
                    debug!("Created column '{}' ({})", spec.title, id);
                    self.registry.insert(spec.title.clone(), id);
                    self.stats.columns_created += 1;
                }
                Err(source) => self.record(SyncIssue::ColumnCreate {
                    title: spec.title.clone(),
                    source,
                }),
            }
        }
        self.enter(SyncPhase::ExtraColumnsAttempted);
    }

    // ── Step 5 ───────────────────────────────────────────────────────────

    /// Create the first group and its items before any default state is
    /// removed. Returns the new group's id and how many items were created.
    async fn seed_first_group(&mut self, group: &Group) -> Result<(String, usize), SetupError> {
        self.call();
        let group_id = self
            .api
            .create_group(&self.board_id, &group.name, None)
            .await
            .map_err(|source| SetupError::FirstGroupCreation {
                board_id: self.board_id.clone(),
                group: group.name.clone(),
                source,
            })?;
        let created = self.populate_group(group, group_id.clone()).await;
        self.enter(SyncPhase::FirstGroupSeeded);
        Ok((group_id, created))
    }

    // ── Step 6 ───────────────────────────────────────────────────────────

    /// Delete every group except the one just seeded. Skipped when the seeded
    /// group holds no item, so the board never ends up with only an empty
    /// group.
    async fn prune_default_groups(&mut self, first: &Group, keep: &str, seeded_items: usize) {
        if seeded_items == 0 {
            self.record(SyncIssue::PruneSkipped {
                group: first.name.clone(),
                reason: "no item of the first group was created".into(),
            });
            self.enter(SyncPhase::DefaultsPruned);
            return;
        }
        self.call();
        let listed = self.api.list_groups(&self.board_id).await;
        match listed {
            Ok(groups) => {
                for g in groups.into_iter().filter(|g| g.id != keep) {
                    info!("Removing initial group '{}' ({})", g.title, g.id);
                    self.call();
                    let deleted = self.api.delete_group(&self.board_id, &g.id).await;
                    match deleted {
                        Ok(()) => self.stats.groups_deleted += 1,
                        Err(source) => self.record(SyncIssue::GroupDelete {
                            group_id: g.id,
                            title: g.title,
                            source,
                        }),
                    }
                }
            }
            Err(source) => self.record(SyncIssue::GroupList { source }),
        }
        self.enter(SyncPhase::DefaultsPruned);
    }

    // ── Steps 7 & 8 ──────────────────────────────────────────────────────

    async fn populate_remaining(&mut self, groups: &[Group]) {
        self.enter(SyncPhase::Populating);
        for group in groups {
            if group.items.is_empty() {
                debug!("Skipping empty group '{}'", group.name);
                self.skipped_groups.push(group.name.clone());
                continue;
            }
            self.call();
            let created = self
                .api
                .create_group(&self.board_id, &group.name, self.last_group_id.as_deref())
                .await;
            match created {
                Ok(group_id) => {
                    self.populate_group(group, group_id).await;
                }
                Err(source) => self.record(SyncIssue::GroupCreate {
                    group: group.name.clone(),
                    items: group.items.len(),
                    source,
                }),
            }
        }
    }

    /// Create every item of `group` inside the remote group `group_id`.
    /// Returns the number of items created.
    async fn populate_group(&mut self, group: &Group, group_id: String) -> usize {
        info!("Created group '{}' ({})", group.name, group_id);
        self.last_group_id = Some(group_id.clone());
        self.stats.groups_created += 1;
        self.progress.on_group_created(&group.name, group.items.len());

        let mut synced = SyncedGroup {
            name: group.name.clone(),
            id: group_id,
            items_created: 0,
            items_failed: 0,
        };

        for item in &group.items {
            let values = self.column_values(item);
            self.call();
            let created = self
                .api
                .create_item(&self.board_id, &synced.id, &item.task, &values)
                .await;
            match created {
                Ok(id) => {
                    debug!("Created item '{}' ⏱ {} ({})", item.task, item.estimate, id);
                    synced.items_created += 1;
                    self.stats.items_created += 1;
                    self.progress.on_item_created(&group.name, &item.task);
                }
                Err(source) => {
                    synced.items_failed += 1;
                    self.stats.items_failed += 1;
                    self.record(SyncIssue::ItemCreate {
                        group: group.name.clone(),
                        task: item.task.clone(),
                        source,
                    });
                }
            }
        }

        let created = synced.items_created;
        self.groups.push(synced);
        created
    }

    /// Estimate plus any caller-supplied extra values, keyed by column id.
    /// Titles without a column on this board are left out.
    fn column_values(&self, item: &Item) -> ColumnValues {
        let mut values = ColumnValues::new();
        for (title, value) in &item.column_values {
            match self.registry.get(title) {
                Some(id) if title != &self.config.estimate_column_title => {
                    values.insert(id.to_string(), value.clone());
                }
                Some(_) => {}
                None => debug!("Omitting value for missing column '{}' on '{}'", title, item.task),
            }
        }
        if let Some(id) = self.registry.get(&self.config.estimate_column_title) {
            values.insert(id.to_string(), serde_json::json!(item.estimate));
        }
        values
    }
}

/// Build a [`MondayClient`] from `remote` and synchronize `hierarchy`.
pub async fn sync_board(
    hierarchy: &TaskHierarchy,
    config: &SyncConfig,
    remote: &RemoteConfig,
) -> Result<SyncReport, Prd2BoardError> {
    let client = MondayClient::new(remote.clone())?;
    let sync = BoardSynchronizer::new(Arc::new(client), config.clone())
        .with_board_url_base(remote.board_url_base.clone());
    Ok(sync.run(hierarchy).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteApiError;
    use crate::model::{ColumnDefaults, ColumnKind};
    use crate::remote::RemoteEntity;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts calls and accepts everything.
    #[derive(Default)]
    struct CountingApi {
        calls: AtomicUsize,
    }

    impl CountingApi {
        fn bump(&self) -> String {
            (self.calls.fetch_add(1, Ordering::SeqCst) + 1).to_string()
        }
    }

    #[async_trait]
    impl BoardApi for CountingApi {
        async fn create_board(&self, _: &str) -> Result<String, RemoteApiError> {
            Ok(self.bump())
        }
        async fn rename_board(&self, _: &str, _: &str) -> Result<(), RemoteApiError> {
            self.bump();
            Ok(())
        }
        async fn list_columns(&self, _: &str) -> Result<Vec<RemoteEntity>, RemoteApiError> {
            self.bump();
            Ok(vec![])
        }
        async fn create_column(
            &self,
            _: &str,
            _: &str,
            _: ColumnKind,
            _: Option<&str>,
            _: Option<&ColumnDefaults>,
        ) -> Result<String, RemoteApiError> {
            Ok(self.bump())
        }
        async fn delete_column(&self, _: &str, _: &str) -> Result<(), RemoteApiError> {
            self.bump();
            Ok(())
        }
        async fn create_group(
            &self,
            _: &str,
            _: &str,
            _: Option<&str>,
        ) -> Result<String, RemoteApiError> {
            Ok(self.bump())
        }
        async fn list_groups(&self, _: &str) -> Result<Vec<RemoteEntity>, RemoteApiError> {
            self.bump();
            Ok(vec![])
        }
        async fn delete_group(&self, _: &str, _: &str) -> Result<(), RemoteApiError> {
            self.bump();
            Ok(())
        }
        async fn create_item(
            &self,
            _: &str,
            _: &str,
            _: &str,
            _: &ColumnValues,
        ) -> Result<String, RemoteApiError> {
            Ok(self.bump())
        }
    }

    fn config() -> SyncConfig {
        SyncConfig::builder("Roadmap").build().unwrap()
    }

    #[test]
    fn empty_first_group_makes_no_calls() {
        let api = Arc::new(CountingApi::default());
        let sync = BoardSynchronizer::new(api.clone(), config());
        let h = TaskHierarchy::new(vec![
            Group::new("Empty", vec![]),
            Group::new("Full", vec![Item::new("x", 1.0)]),
        ]);
        let err = tokio_test::block_on(sync.run(&h)).unwrap_err();
        assert_eq!(err.step(), "empty first group");
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn empty_hierarchy_is_rejected() {
        let api = Arc::new(CountingApi::default());
        let sync = BoardSynchronizer::new(api.clone(), config());
        let err = tokio_test::block_on(sync.run(&TaskHierarchy::default())).unwrap_err();
        assert!(matches!(err, SetupError::EmptyHierarchy));
        assert_eq!(api.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn remote_call_count_matches_plan() {
        let api = Arc::new(CountingApi::default());
        let sync = BoardSynchronizer::new(api.clone(), config());
        let h = TaskHierarchy::new(vec![Group::new(
            "Auth",
            vec![Item::new("Login", 0.5), Item::new("Logout", 0.25)],
        )]);
        let report = tokio_test::block_on(sync.run(&h)).unwrap();
        // create board, list columns, estimate column, group, 2 items, list groups
        assert_eq!(report.stats.remote_calls, 7);
        assert_eq!(api.calls.load(Ordering::SeqCst), 7);
        assert_eq!(report.final_phase, SyncPhase::Done);
        assert_eq!(report.board_url, format!("https://app.monday.com/boards/{}", report.board_id));
    }

    #[test]
    fn phase_display() {
        assert_eq!(SyncPhase::EstimateColumnReady.to_string(), "estimate column ready");
    }
}
