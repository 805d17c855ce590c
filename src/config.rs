//! Configuration types for planning and board synchronization.
//!
//! Three independent configs cover the three collaborators of a run:
//!
//! * [`PlanConfig`] — how PRD text is chunked and sent to the LLM.
//! * [`SyncConfig`] — what board to build (name, reuse id, extra columns).
//! * [`RemoteConfig`] — where and with which credential the board API is
//!   reached.
//!
//! Each is built through a builder that validates on `build()`. Nothing is
//! read from process-wide state during a run, so independent runs with
//! different credentials can proceed side by side.

use crate::error::Prd2BoardError;
use crate::model::{ColumnSpec, DEFAULT_ESTIMATE_COLUMN};
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;

/// Default GraphQL endpoint of the board service.
pub const DEFAULT_API_URL: &str = "https://api.monday.com/v2";

/// Public board URLs are this base followed by the board id.
pub const DEFAULT_BOARD_URL_BASE: &str = "https://app.monday.com/boards/";

// ── Planning ─────────────────────────────────────────────────────────────

/// Configuration for turning a PRD into a [`crate::model::TaskHierarchy`].
///
/// # Example
/// ```rust
/// use prd2board::PlanConfig;
///
/// let config = PlanConfig::builder()
///     .model("gpt-4.1-mini")
///     .chunk_chars(6000)
///     .build()
///     .unwrap();
/// assert_eq!(config.chunk_chars, 6000);
/// ```
#[derive(Clone)]
pub struct PlanConfig {
    /// LLM model identifier. If None, uses the provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.2.
    pub temperature: f32,

    /// Maximum tokens per completion. Default: 2048.
    ///
    /// A chunk of 4 000 characters rarely yields more than 40 tasks, which
    /// fits comfortably; truncated JSON is recovered only partially.
    pub max_tokens: usize,

    /// Retry attempts per chunk on a failed completion. Default: 2.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-completion timeout in seconds. Default: 90.
    pub api_timeout_secs: u64,

    /// Maximum characters of PRD text per chunk. Default: 4000 (min 500).
    pub chunk_chars: usize,

    /// Only the first N chunks are planned. Default: all.
    pub max_chunks: Option<usize>,

    /// Chunks completed concurrently. Default: 4.
    pub concurrency: usize,

    /// Custom system prompt. If None, uses the built-in default.
    pub system_prompt: Option<String>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.2,
            max_tokens: 2048,
            max_retries: 2,
            retry_backoff_ms: 500,
            api_timeout_secs: 90,
            chunk_chars: 4000,
            max_chunks: None,
            concurrency: 4,
            system_prompt: None,
            password: None,
            download_timeout_secs: 120,
        }
    }
}

impl fmt::Debug for PlanConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlanConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("chunk_chars", &self.chunk_chars)
            .field("max_chunks", &self.max_chunks)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

impl PlanConfig {
    pub fn builder() -> PlanConfigBuilder {
        PlanConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PlanConfig`].
#[derive(Debug)]
pub struct PlanConfigBuilder {
    config: PlanConfig,
}

impl PlanConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn chunk_chars(mut self, n: usize) -> Self {
        self.config.chunk_chars = n.max(500);
        self
    }

    pub fn max_chunks(mut self, n: usize) -> Self {
        self.config.max_chunks = Some(n);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PlanConfig, Prd2BoardError> {
        let c = &self.config;
        if c.max_tokens == 0 {
            return Err(Prd2BoardError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        if c.max_chunks == Some(0) {
            return Err(Prd2BoardError::InvalidConfig(
                "max_chunks must be ≥ 1 when set".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(Prd2BoardError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Synchronization ──────────────────────────────────────────────────────

/// What board to materialise.
#[derive(Clone)]
pub struct SyncConfig {
    /// Name given to a new board, or to the reused board via rename.
    pub board_name: String,

    /// Reuse this board instead of creating one. Lets a caller resume a
    /// partially populated board.
    pub existing_board_id: Option<String>,

    /// Extra columns to create after the estimate column, in order.
    pub columns: Vec<ColumnSpec>,

    /// Title of the mandatory numeric estimate column.
    /// Default: [`DEFAULT_ESTIMATE_COLUMN`].
    pub estimate_column_title: String,

    /// Optional observer of synchronization progress.
    pub progress_callback: Option<ProgressCallback>,
}

impl fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncConfig")
            .field("board_name", &self.board_name)
            .field("existing_board_id", &self.existing_board_id)
            .field("columns", &self.columns)
            .field("estimate_column_title", &self.estimate_column_title)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn SyncProgressCallback>"),
            )
            .finish()
    }
}

impl SyncConfig {
    pub fn builder(board_name: impl Into<String>) -> SyncConfigBuilder {
        SyncConfigBuilder {
            config: SyncConfig {
                board_name: board_name.into(),
                existing_board_id: None,
                columns: Vec::new(),
                estimate_column_title: DEFAULT_ESTIMATE_COLUMN.to_string(),
                progress_callback: None,
            },
        }
    }
}

/// Builder for [`SyncConfig`].
#[derive(Debug)]
pub struct SyncConfigBuilder {
    config: SyncConfig,
}

impl SyncConfigBuilder {
    pub fn existing_board_id(mut self, id: impl Into<String>) -> Self {
        self.config.existing_board_id = Some(id.into());
        self
    }

    pub fn columns(mut self, columns: Vec<ColumnSpec>) -> Self {
        self.config.columns = columns;
        self
    }

    pub fn column(mut self, column: ColumnSpec) -> Self {
        self.config.columns.push(column);
        self
    }

    pub fn estimate_column_title(mut self, title: impl Into<String>) -> Self {
        self.config.estimate_column_title = title.into();
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn build(self) -> Result<SyncConfig, Prd2BoardError> {
        let c = &self.config;
        if c.board_name.trim().is_empty() {
            return Err(Prd2BoardError::InvalidConfig("board name must not be empty".into()));
        }
        if c.estimate_column_title.trim().is_empty() {
            return Err(Prd2BoardError::InvalidConfig(
                "estimate column title must not be empty".into(),
            ));
        }
        if matches!(c.existing_board_id.as_deref(), Some(id) if id.trim().is_empty()) {
            return Err(Prd2BoardError::InvalidConfig(
                "existing board id must not be blank".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Remote API ───────────────────────────────────────────────────────────

/// Endpoint and credential of the board API.
#[derive(Clone)]
pub struct RemoteConfig {
    /// Opaque API token sent as the `Authorization` header.
    pub api_key: String,

    /// GraphQL endpoint. Default: [`DEFAULT_API_URL`].
    pub api_url: String,

    /// Optional `api-version` header value (e.g. "2024-10").
    pub api_version: Option<String>,

    /// Transport timeout per request in seconds. Default: 30.
    pub timeout_secs: u64,

    /// Prefix of public board URLs. Default: [`DEFAULT_BOARD_URL_BASE`].
    pub board_url_base: String,
}

impl fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("api_key", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("api_version", &self.api_version)
            .field("timeout_secs", &self.timeout_secs)
            .field("board_url_base", &self.board_url_base)
            .finish()
    }
}

impl RemoteConfig {
    pub fn builder(api_key: impl Into<String>) -> RemoteConfigBuilder {
        RemoteConfigBuilder {
            config: RemoteConfig {
                api_key: api_key.into(),
                api_url: DEFAULT_API_URL.to_string(),
                api_version: None,
                timeout_secs: 30,
                board_url_base: DEFAULT_BOARD_URL_BASE.to_string(),
            },
        }
    }

    /// Public URL of a board.
    pub fn board_url(&self, board_id: &str) -> String {
        format!("{}{}", self.board_url_base, board_id)
    }
}

/// Builder for [`RemoteConfig`].
#[derive(Debug)]
pub struct RemoteConfigBuilder {
    config: RemoteConfig,
}

impl RemoteConfigBuilder {
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_url = url.into();
        self
    }

    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.config.api_version = Some(version.into());
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs.max(1);
        self
    }

    pub fn board_url_base(mut self, base: impl Into<String>) -> Self {
        self.config.board_url_base = base.into();
        self
    }

    pub fn build(self) -> Result<RemoteConfig, Prd2BoardError> {
        let c = &self.config;
        if c.api_key.trim().is_empty() {
            return Err(Prd2BoardError::InvalidConfig("API key must not be empty".into()));
        }
        if !(c.api_url.starts_with("http://") || c.api_url.starts_with("https://")) {
            return Err(Prd2BoardError::InvalidConfig(format!(
                "API URL must be http(s), got '{}'",
                c.api_url
            )));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_defaults() {
        let c = PlanConfig::default();
        assert_eq!(c.chunk_chars, 4000);
        assert_eq!(c.concurrency, 4);
        assert!(c.max_chunks.is_none());
    }

    #[test]
    fn plan_builder_clamps() {
        let c = PlanConfig::builder()
            .chunk_chars(10)
            .concurrency(0)
            .temperature(9.0)
            .build()
            .unwrap();
        assert_eq!(c.chunk_chars, 500);
        assert_eq!(c.concurrency, 1);
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn plan_builder_rejects_zero_chunks() {
        assert!(PlanConfig::builder().max_chunks(0).build().is_err());
    }

    #[test]
    fn sync_builder_requires_name() {
        assert!(SyncConfig::builder("  ").build().is_err());
        let c = SyncConfig::builder("Roadmap").build().unwrap();
        assert_eq!(c.estimate_column_title, DEFAULT_ESTIMATE_COLUMN);
        assert!(c.columns.is_empty());
    }

    #[test]
    fn sync_builder_rejects_blank_board_id() {
        assert!(SyncConfig::builder("Roadmap")
            .existing_board_id(" ")
            .build()
            .is_err());
    }

    #[test]
    fn remote_debug_redacts_key() {
        let c = RemoteConfig::builder("secret-token").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("secret-token"));
        assert_eq!(c.board_url("123"), "https://app.monday.com/boards/123");
    }

    #[test]
    fn remote_builder_validates() {
        assert!(RemoteConfig::builder("").build().is_err());
        assert!(RemoteConfig::builder("k").api_url("ftp://x").build().is_err());
    }
}
