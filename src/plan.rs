//! Planning entry points: PRD in, [`TaskHierarchy`] out.
//!
//! ```text
//! plan_from_pdf ─▶ resolve input ─▶ extract text ─┐
//! plan_from_bytes ─▶ temp file ───────────────────┤
//!                                                 ▼
//!                   plan_from_text ─▶ chunk ─▶ LLM × N (concurrent) ─▶ parse ─▶ merge
//! ```
//!
//! A chunk that fails or yields no groups is reported in
//! [`PlanOutput::chunks`] and skipped; planning only fails when every chunk
//! does.

use crate::config::PlanConfig;
use crate::error::Prd2BoardError;
use crate::model::{Group, TaskHierarchy};
use crate::output::{ChunkReport, PlanOutput, PlanStats};
use crate::pipeline::{chunk, extract, input, llm, parse};
use edgequake_llm::{LLMProvider, ProviderFactory};
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Model used when a provider is named without a model.
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";

/// Plan a PRD given as a local path or an `http(s)://` URL.
///
/// # Example
/// ```rust,no_run
/// use prd2board::{plan_from_pdf, PlanConfig};
///
/// # async fn run() -> Result<(), prd2board::Prd2BoardError> {
/// let plan = plan_from_pdf("prd.pdf", &PlanConfig::default()).await?;
/// for group in &plan.hierarchy.groups {
///     println!("{} ({} tasks)", group.name, group.items.len());
/// }
/// # Ok(())
/// # }
/// ```
pub async fn plan_from_pdf(
    input_str: impl AsRef<str>,
    config: &PlanConfig,
) -> Result<PlanOutput, Prd2BoardError> {
    let resolved = input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    plan_resolved(&resolved, config).await
}

/// Plan a PRD held in memory.
pub async fn plan_from_bytes(bytes: &[u8], config: &PlanConfig) -> Result<PlanOutput, Prd2BoardError> {
    let resolved = input::resolve_bytes(bytes)?;
    plan_resolved(&resolved, config).await
}

/// Plan already-extracted PRD text.
pub async fn plan_from_text(text: &str, config: &PlanConfig) -> Result<PlanOutput, Prd2BoardError> {
    let provider = resolve_provider(config)?;
    plan_text_with(&provider, text, 0, config).await
}

/// Plan a PRD and write the hierarchy JSON to `output_path`.
///
/// The file is written to a sibling temp path and renamed into place, so a
/// failed run never leaves a truncated plan behind.
pub async fn plan_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &PlanConfig,
) -> Result<PlanOutput, Prd2BoardError> {
    let output = plan_from_pdf(input_str, config).await?;
    write_hierarchy(&output.hierarchy, output_path.as_ref()).await?;
    Ok(output)
}

/// Write `hierarchy` as pretty JSON, atomically.
pub async fn write_hierarchy(hierarchy: &TaskHierarchy, path: &Path) -> Result<(), Prd2BoardError> {
    let write_err = |source: std::io::Error| Prd2BoardError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let json = serde_json::to_string_pretty(hierarchy)
        .map_err(|e| Prd2BoardError::Internal(format!("Failed to serialise hierarchy: {e}")))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = tmp_path_for(path);
    tokio::fs::write(&tmp_path, json).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;

    info!("Plan written to {}", path.display());
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

async fn plan_resolved(
    resolved: &input::ResolvedInput,
    config: &PlanConfig,
) -> Result<PlanOutput, Prd2BoardError> {
    // Fail on a missing provider before paying for extraction.
    let provider = resolve_provider(config)?;

    let extract_start = Instant::now();
    let extracted = extract::extract_text(resolved.path(), config.password.as_deref()).await?;
    let extract_ms = extract_start.elapsed().as_millis() as u64;
    let text = extracted.joined();
    info!(
        "Extracted {} chars from {} pages in {}ms",
        text.chars().count(),
        extracted.pages.len(),
        extract_ms
    );

    plan_text_with(&provider, &text, extract_ms, config).await
}

async fn plan_text_with(
    provider: &Arc<dyn LLMProvider>,
    text: &str,
    extract_ms: u64,
    config: &PlanConfig,
) -> Result<PlanOutput, Prd2BoardError> {
    let start = Instant::now();

    let mut chunks = chunk::chunk_text(text, config.chunk_chars);
    if chunks.is_empty() {
        return Err(Prd2BoardError::EmptyDocument {
            path: PathBuf::from("<text>"),
        });
    }
    if let Some(max) = config.max_chunks {
        if chunks.len() > max {
            info!("Planning only the first {} of {} chunks", max, chunks.len());
            chunks.truncate(max);
        }
    }
    let total = chunks.len();
    info!(
        "Planning {} chunk(s) with concurrency {}",
        total, config.concurrency
    );

    let llm_start = Instant::now();
    let mut results = process_concurrent(provider, &chunks, config).await;
    let llm_ms = llm_start.elapsed().as_millis() as u64;
    results.sort_by_key(|(report, _)| report.chunk);

    let first_error = results
        .iter()
        .find_map(|(report, _)| report.error.as_ref().map(|e| e.to_string()));
    let (reports, parsed): (Vec<ChunkReport>, Vec<Option<Vec<Group>>>) = results.into_iter().unzip();

    let hierarchy = TaskHierarchy::new(parse::merge_groups(parsed.into_iter().flatten()));
    if hierarchy.is_empty() {
        return Err(Prd2BoardError::AllChunksFailed {
            total,
            first_error: first_error.unwrap_or_else(|| "no groups produced".to_string()),
        });
    }

    let failed = reports.iter().filter(|r| r.error.is_some()).count();
    let stats = PlanStats {
        extracted_chars: text.chars().count(),
        total_chunks: total,
        parsed_chunks: total - failed,
        failed_chunks: failed,
        total_groups: hierarchy.groups.len(),
        total_items: hierarchy.item_count(),
        total_estimate_days: hierarchy.total_estimate(),
        total_input_tokens: reports.iter().map(|r| r.input_tokens as u64).sum(),
        total_output_tokens: reports.iter().map(|r| r.output_tokens as u64).sum(),
        extract_duration_ms: extract_ms,
        llm_duration_ms: llm_ms,
        total_duration_ms: extract_ms + start.elapsed().as_millis() as u64,
    };

    info!(
        "Planned {} groups, {} tasks ({:.2} days) from {}/{} chunks",
        stats.total_groups, stats.total_items, stats.total_estimate_days, stats.parsed_chunks, total
    );

    Ok(PlanOutput {
        hierarchy,
        chunks: reports,
        stats,
    })
}

/// Complete and parse every chunk, at most `config.concurrency` at a time.
/// Results arrive in completion order.
async fn process_concurrent(
    provider: &Arc<dyn LLMProvider>,
    chunks: &[String],
    config: &PlanConfig,
) -> Vec<(ChunkReport, Option<Vec<Group>>)> {
    let total = chunks.len();
    stream::iter(chunks.iter().enumerate().map(|(idx, text)| {
        let provider = Arc::clone(provider);
        let chunk_num = idx + 1;
        async move {
            let completion = llm::complete_chunk(&provider, chunk_num, total, text, config).await;
            let mut report = completion.report;
            let Some(content) = completion.content else {
                return (report, None);
            };
            match parse::parse_groups(chunk_num, &content) {
                Ok(groups) => {
                    report.groups = groups.len();
                    report.items = groups.iter().map(|g| g.items.len()).sum();
                    debug!(
                        "Chunk {}: {} groups, {} tasks",
                        chunk_num, report.groups, report.items
                    );
                    (report, Some(groups))
                }
                Err(e) => {
                    warn!("{}", e);
                    report.error = Some(e);
                    (report, None)
                }
            }
        }
    }))
    .buffer_unordered(config.concurrency)
    .collect()
    .await
}

// ── Provider resolution ──────────────────────────────────────────────────

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, Prd2BoardError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        Prd2BoardError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific:
///
/// 1. `config.provider`
/// 2. `config.provider_name` with `config.model`
/// 3. `PRD2BOARD_LLM_PROVIDER` + `PRD2BOARD_MODEL`, when both are set
/// 4. OpenAI, when `OPENAI_API_KEY` is set
/// 5. `ProviderFactory::from_env()` auto-detection
pub fn resolve_provider(config: &PlanConfig) -> Result<Arc<dyn LLMProvider>, Prd2BoardError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
    if let Some(ref name) = config.provider_name {
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("PRD2BOARD_LLM_PROVIDER"),
        std::env::var("PRD2BOARD_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            return create_provider(&prov, &env_model);
        }
    }

    if std::env::var("OPENAI_API_KEY").is_ok_and(|k| !k.is_empty()) {
        return create_provider("openai", model);
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| Prd2BoardError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or pass --provider.\n\
                Error: {e}"
            ),
        })?;

    Ok(llm_provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tmp_path_keeps_directory() {
        assert_eq!(
            tmp_path_for(Path::new("out/plan.json")),
            PathBuf::from("out/plan.json.tmp")
        );
    }

    #[tokio::test]
    async fn write_hierarchy_is_atomic_and_readable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("plan.json");
        let h = TaskHierarchy::new(vec![Group::new(
            "Auth",
            vec![crate::model::Item::new("Login", 0.5)],
        )]);

        write_hierarchy(&h, &path).await.unwrap();

        let back = TaskHierarchy::from_json(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back, h);
        assert!(!tmp_path_for(&path).exists());
    }
}
