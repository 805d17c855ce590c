//! CLI binary for prd2board.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PlanConfig` / `SyncConfig` / `RemoteConfig` and prints results.

use anyhow::{bail, Context, Result};
use clap::Parser;
use prd2board::{
    default_extra_columns, plan_from_pdf, sync_board, write_hierarchy, ColumnSpec, PlanConfig,
    PlanOutput, Prd2BoardError, ProgressCallback, RemoteConfig, SyncConfig, SyncIssue, SyncPhase,
    SyncProgressCallback, SyncReport, SyncStats, TaskHierarchy,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

fn spinner(prefix: &'static str, msg: &'static str) -> ProgressBar {
    let bar = ProgressBar::new(0);
    let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(TICKS);
    bar.set_style(style);
    bar.set_prefix(prefix);
    bar.set_message(msg);
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Renders board synchronization as a spinner while the board is being set
/// up, then as an item counter while groups are populated.
struct CliSyncProgress {
    bar: ProgressBar,
    issues: AtomicUsize,
}

impl CliSyncProgress {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            bar: spinner("Board", "connecting…"),
            issues: AtomicUsize::new(0),
        })
    }
}

impl SyncProgressCallback for CliSyncProgress {
    fn on_sync_start(&self, total_groups: usize, total_items: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} items  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);
        self.bar.set_length(total_items as u64);
        self.bar.set_style(style);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Building board: {total_groups} groups, {total_items} items…"))
        ));
    }

    fn on_phase(&self, phase: SyncPhase) {
        self.bar.set_message(phase.to_string());
    }

    fn on_group_created(&self, group: &str, item_count: usize) {
        self.bar.println(format!(
            "  {} {:<40} {}",
            green("✓"),
            group,
            dim(&format!("{item_count} items"))
        ));
    }

    fn on_item_created(&self, _group: &str, _task: &str) {
        self.bar.inc(1);
    }

    fn on_issue(&self, issue: &SyncIssue) {
        self.issues.fetch_add(1, Ordering::SeqCst);
        let msg = issue.to_string();
        let msg = if msg.chars().count() > 100 {
            format!("{}\u{2026}", msg.chars().take(99).collect::<String>())
        } else {
            msg
        };
        if let SyncIssue::ItemCreate { .. } = issue {
            self.bar.inc(1);
        }
        self.bar.println(format!("  {} {}", red("✗"), red(&msg)));
    }

    fn on_sync_complete(&self, stats: &SyncStats) {
        self.bar.finish_and_clear();
        let issues = self.issues.load(Ordering::SeqCst);
        eprintln!(
            "{} {} groups, {} items created{}",
            if issues == 0 { green("✔") } else { cyan("⚠") },
            bold(&stats.groups_created.to_string()),
            bold(&stats.items_created.to_string()),
            if issues == 0 {
                String::new()
            } else {
                format!("  ({} issues)", red(&issues.to_string()))
            },
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Plan a PRD and build a new board
  prd2board prd.pdf --board-name "Event platform"

  # Only plan; write the hierarchy for review
  prd2board prd.pdf --plan-only -o plan.json

  # Build a board from a reviewed plan, reusing an existing board
  prd2board plan.json --from-json --board-name "Event platform" --board-id 1234567890

  # Custom extra columns instead of the default set
  prd2board prd.pdf --board-name Roadmap --columns columns.json

  # Plan from a URL with a specific model
  prd2board https://example.com/prd.pdf --board-name Roadmap --provider openai --model gpt-4.1

COLUMNS FILE:
  A JSON array of column declarations, created in order after the
  "Time Estimation AI" column:

  [
    { "title": "Status",   "type": "status" },
    { "title": "Priority", "type": "status",
      "description": "This column indicates the urgency level",
      "labels": { "0": "Critical", "1": "High", "2": "Medium", "3": "Low" } },
    { "title": "Sprint",   "type": "text" }
  ]

  Types: numbers, status, text, long_text, people, timeline, date,
  dropdown, checkbox.

PLAN FORMAT (--from-json, -o):
  [ { "group": "Authentication",
      "items": [ { "task": "Add login form", "time_estimation_AI": 0.5 } ] } ]

ENVIRONMENT VARIABLES:
  MONDAY_API_KEY          monday.com API token
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  PRD2BOARD_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  PRD2BOARD_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium when it is not installed system-wide
  RUST_LOG                Log filter (overrides -v / -q)
"#;

/// Turn a PRD into a populated monday.com board.
#[derive(Parser, Debug)]
#[command(
    name = "prd2board",
    version,
    about = "Turn a product-requirements PDF into a populated monday.com board",
    long_about = "Extract the text of a PRD, ask an LLM to organise it into groups of short, \
estimated tasks, and create a monday.com board with one group per topic and one item per task. \
Each item carries its estimate in the \"Time Estimation AI\" column.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PRD PDF path or HTTP/HTTPS URL (a plan JSON file with --from-json).
    input: String,

    /// Name of the board to create, or the new name of a reused board.
    #[arg(short, long, env = "PRD2BOARD_BOARD_NAME")]
    board_name: Option<String>,

    /// monday.com API token.
    #[arg(long, env = "MONDAY_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Reuse this board instead of creating one.
    #[arg(long, env = "PRD2BOARD_BOARD_ID")]
    board_id: Option<String>,

    /// JSON file with extra column declarations (replaces the default set).
    #[arg(long, env = "PRD2BOARD_COLUMNS")]
    columns: Option<PathBuf>,

    /// Create no extra columns besides the estimate column.
    #[arg(long, conflicts_with = "columns")]
    no_default_columns: bool,

    /// Treat INPUT as an already planned hierarchy (JSON).
    #[arg(long)]
    from_json: bool,

    /// Stop after planning; print or write the hierarchy.
    #[arg(long, conflicts_with = "from_json")]
    plan_only: bool,

    /// Write the planned hierarchy JSON to this file.
    #[arg(short, long, env = "PRD2BOARD_OUTPUT")]
    output: Option<PathBuf>,

    /// Print structured JSON results on stdout.
    #[arg(long, env = "PRD2BOARD_JSON")]
    json: bool,

    /// LLM model ID (e.g. gpt-4.1-mini, claude-sonnet-4-20250514).
    #[arg(long, env = "PRD2BOARD_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "PRD2BOARD_PROVIDER")]
    provider: Option<String>,

    /// Maximum characters of PRD text per LLM call (min 500).
    #[arg(long, env = "PRD2BOARD_CHUNK_CHARS", default_value_t = 4000)]
    chunk_chars: usize,

    /// Plan only the first N chunks.
    #[arg(long, env = "PRD2BOARD_MAX_CHUNKS")]
    max_chunks: Option<usize>,

    /// Number of concurrent LLM calls.
    #[arg(short, long, env = "PRD2BOARD_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "PRD2BOARD_TEMPERATURE", default_value_t = 0.2)]
    temperature: f32,

    /// Max LLM output tokens per chunk.
    #[arg(long, env = "PRD2BOARD_MAX_TOKENS", default_value_t = 2048)]
    max_tokens: usize,

    /// Retries per chunk on LLM failure.
    #[arg(long, env = "PRD2BOARD_MAX_RETRIES", default_value_t = 2)]
    max_retries: u32,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "PRD2BOARD_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Board API endpoint.
    #[arg(long, env = "PRD2BOARD_API_URL", default_value = prd2board::config::DEFAULT_API_URL)]
    api_url: String,

    /// Board API request timeout in seconds.
    #[arg(long, env = "PRD2BOARD_API_TIMEOUT", default_value_t = 30)]
    api_timeout: u64,

    /// Per-chunk LLM call timeout in seconds.
    #[arg(long, env = "PRD2BOARD_LLM_TIMEOUT", default_value_t = 90)]
    llm_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PRD2BOARD_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PRD2BOARD_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Disable progress display.
    #[arg(long, env = "PRD2BOARD_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PRD2BOARD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PRD2BOARD_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress display replaces INFO logs unless -v is given.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Obtain the hierarchy ─────────────────────────────────────────────
    let (hierarchy, plan) = if cli.from_json {
        (load_hierarchy(Path::new(&cli.input)).await?, None)
    } else {
        let plan = run_plan(&cli, show_progress).await?;
        (plan.hierarchy.clone(), Some(plan))
    };

    if let Some(ref path) = cli.output {
        write_hierarchy(&hierarchy, path)
            .await
            .context("Failed to write plan")?;
    }

    if cli.plan_only {
        if cli.json {
            print_json(&plan)?;
        } else if cli.output.is_none() {
            print_json(&hierarchy)?;
        }
        if !cli.quiet {
            print_plan_summary(&hierarchy, plan.as_ref(), cli.output.as_deref());
        }
        return Ok(());
    }

    // ── Build the board ──────────────────────────────────────────────────
    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliSyncProgress::new() as Arc<dyn SyncProgressCallback>)
    } else {
        None
    };
    let (sync, remote) = build_sync_configs(&cli, progress).await?;

    let report = match sync_board(&hierarchy, &sync, &remote).await {
        Ok(report) => report,
        Err(Prd2BoardError::Setup(e)) => {
            let resume = e
                .board_id()
                .map(|id| format!("\nRerun with --board-id {id} to reuse the board."))
                .unwrap_or_default();
            bail!("Board setup failed at step '{}': {e}{resume}", e.step());
        }
        Err(e) => return Err(e).context("Board synchronization failed"),
    };

    if cli.json {
        print_json(&json!({ "plan": plan, "sync": report }))?;
    }
    if !cli.quiet {
        print_sync_summary(&report, show_progress);
    }

    Ok(())
}

/// Map CLI args to `PlanConfig` and run planning.
async fn run_plan(cli: &Cli, show_progress: bool) -> Result<PlanOutput> {
    let mut builder = PlanConfig::builder()
        .chunk_chars(cli.chunk_chars)
        .concurrency(cli.concurrency)
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.llm_timeout)
        .download_timeout_secs(cli.download_timeout);

    if let Some(n) = cli.max_chunks {
        builder = builder.max_chunks(n);
    }
    if let Some(ref m) = cli.model {
        builder = builder.model(m);
    }
    if let Some(ref p) = cli.provider {
        builder = builder.provider_name(p);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {path:?}"))?;
        builder = builder.system_prompt(prompt);
    }
    let config = builder.build().context("Invalid configuration")?;

    let bar = show_progress.then(|| spinner("Planning", "extracting PRD text and asking the model…"));
    let result = plan_from_pdf(&cli.input, &config).await;
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
    let plan = result.context("Planning failed")?;

    if !cli.quiet {
        for chunk in plan.chunks.iter().filter(|c| c.error.is_some()) {
            if let Some(ref e) = chunk.error {
                eprintln!("  {} {}", red("✗"), red(&e.to_string()));
            }
        }
    }
    Ok(plan)
}

async fn load_hierarchy(path: &Path) -> Result<TaskHierarchy> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read plan {}", path.display()))?;
    let hierarchy = TaskHierarchy::from_json(&text)
        .with_context(|| format!("Invalid plan JSON in {}", path.display()))?;
    hierarchy
        .validate()
        .map_err(Prd2BoardError::InvalidHierarchy)
        .with_context(|| format!("Plan {} cannot be synchronized", path.display()))?;
    Ok(hierarchy)
}

async fn load_columns(cli: &Cli) -> Result<Vec<ColumnSpec>> {
    if let Some(ref path) = cli.columns {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read columns file {}", path.display()))?;
        return serde_json::from_str(&text)
            .with_context(|| format!("Invalid columns JSON in {}", path.display()));
    }
    if cli.no_default_columns {
        Ok(Vec::new())
    } else {
        Ok(default_extra_columns())
    }
}

/// Map CLI args to `SyncConfig` + `RemoteConfig`.
async fn build_sync_configs(
    cli: &Cli,
    progress: Option<ProgressCallback>,
) -> Result<(SyncConfig, RemoteConfig)> {
    let Some(ref board_name) = cli.board_name else {
        bail!("--board-name is required unless --plan-only is given");
    };
    let Some(ref api_key) = cli.api_key else {
        bail!("--api-key (or MONDAY_API_KEY) is required unless --plan-only is given");
    };

    let mut builder = SyncConfig::builder(board_name).columns(load_columns(cli).await?);
    if let Some(ref id) = cli.board_id {
        builder = builder.existing_board_id(id);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    let sync = builder.build().context("Invalid configuration")?;

    let remote = RemoteConfig::builder(api_key)
        .api_url(&cli.api_url)
        .timeout_secs(cli.api_timeout)
        .build()
        .context("Invalid configuration")?;

    Ok((sync, remote))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialise output")?;
    println!("{json}");
    Ok(())
}

fn print_plan_summary(hierarchy: &TaskHierarchy, plan: Option<&PlanOutput>, written: Option<&Path>) {
    eprintln!(
        "{}  {} groups, {} tasks, {:.2} days{}",
        green("✔"),
        hierarchy.groups.len(),
        hierarchy.item_count(),
        hierarchy.total_estimate(),
        written
            .map(|p| format!("  →  {}", bold(&p.display().to_string())))
            .unwrap_or_default(),
    );
    if let Some(plan) = plan {
        eprintln!(
            "   {} tokens in  /  {} tokens out  —  {}/{} chunks  {}ms",
            dim(&plan.stats.total_input_tokens.to_string()),
            dim(&plan.stats.total_output_tokens.to_string()),
            plan.stats.parsed_chunks,
            plan.stats.total_chunks,
            plan.stats.total_duration_ms,
        );
    }
}

fn print_sync_summary(report: &SyncReport, progress_shown: bool) {
    if !progress_shown {
        eprintln!(
            "Created {} groups, {} items in {}ms ({} remote calls)",
            report.stats.groups_created,
            report.stats.items_created,
            report.stats.duration_ms,
            report.stats.remote_calls,
        );
        for issue in &report.issues {
            eprintln!("  issue: {issue}");
        }
    }
    if !report.skipped_groups.is_empty() {
        eprintln!(
            "   {} empty groups skipped: {}",
            report.skipped_groups.len(),
            dim(&report.skipped_groups.join(", "))
        );
    }
    eprintln!("   Board: {}", bold(&report.board_url));
}
