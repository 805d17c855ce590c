//! # prd2board
//!
//! Turn a product-requirements document (PRD) into a populated monday.com
//! board: groups of short tasks, each with an effort estimate in days.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PRD (PDF)
//!  │
//!  ├─ 1. Input    resolve local file, URL or bytes
//!  ├─ 2. Extract  pull the text layer via pdfium (spawn_blocking)
//!  ├─ 3. Chunk    split on paragraph boundaries to fit the model
//!  ├─ 4. LLM      concurrent chat completions with retry/backoff
//!  ├─ 5. Parse    recover JSON groups, clamp estimates, merge chunks
//!  └─ 6. Sync     BoardSynchronizer drives the board API step by step
//! ```
//!
//! Steps 1–5 produce a [`TaskHierarchy`] ([`plan_from_pdf`]); step 6
//! materialises it ([`BoardSynchronizer`], [`sync_board`]). Either half can be
//! used alone: a hierarchy loaded from JSON can be synchronized without an
//! LLM, and a plan can be written to disk without touching a board.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use prd2board::{generate_board, default_extra_columns, PlanConfig, RemoteConfig, SyncConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let plan = PlanConfig::default();
//!     let sync = SyncConfig::builder("Event platform")
//!         .columns(default_extra_columns())
//!         .build()?;
//!     let remote = RemoteConfig::builder(std::env::var("MONDAY_API_KEY")?).build()?;
//!
//!     let out = generate_board("prd.pdf", &plan, &sync, &remote).await?;
//!     println!("{}", out.sync.board_url);
//!     eprintln!("{} issues", out.sync.issues.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Failure Model
//!
//! Only a handful of steps abort a board run ([`SetupError`]): an empty
//! first group, board creation, the estimate column, and the first group.
//! Everything else (one column, one group, one item) is recorded as a
//! [`SyncIssue`] and the run continues. Fatal errors raised after the board
//! exists carry its id so a rerun can reuse it via
//! [`SyncConfigBuilder::existing_board_id`].
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `prd2board` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! prd2board = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod generate;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod plan;
pub mod progress;
pub mod prompts;
pub mod remote;
pub mod sync;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    PlanConfig, PlanConfigBuilder, RemoteConfig, RemoteConfigBuilder, SyncConfig, SyncConfigBuilder,
};
pub use error::{
    ChunkError, Prd2BoardError, RemoteApiError, RemoteErrorKind, RemoteOperation, SetupError,
    SyncIssue,
};
pub use generate::{generate_board, generate_board_from_bytes};
pub use model::{
    default_extra_columns, ColumnDefaults, ColumnKind, ColumnRegistry, ColumnSpec, Group, Item,
    TaskHierarchy,
};
pub use output::{ChunkReport, GenerateOutput, PlanOutput, PlanStats, SyncReport, SyncStats, SyncedGroup};
pub use plan::{plan_from_bytes, plan_from_pdf, plan_from_text, plan_to_file, write_hierarchy};
pub use progress::{NoopProgressCallback, ProgressCallback, SyncProgressCallback};
pub use remote::{BoardApi, ColumnValues, MondayClient, RemoteEntity};
pub use sync::{sync_board, BoardSynchronizer, SyncPhase};
