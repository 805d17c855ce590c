//! LLM interaction: send one chunk of PRD text and collect the raw answer.
//!
//! Prompt wording lives in [`crate::prompts`]; this module only owns the
//! message layout, per-attempt timeout and retry policy. Parsing the answer
//! is [`super::parse`]'s job.
//!
//! ## Retry Strategy
//!
//! Rate-limit and overload errors are common under concurrent load, so a
//! failed or timed-out attempt is retried with exponential backoff
//! (`retry_backoff_ms * 2^(attempt-1)`): 500 ms → 1 s → 2 s with defaults.

use crate::config::PlanConfig;
use crate::error::ChunkError;
use crate::output::ChunkReport;
use crate::prompts::{user_prompt, DEFAULT_SYSTEM_PROMPT};
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// Raw model answer for one chunk plus its accounting.
///
/// `content` is `Some` exactly when `report.error` is `None`.
#[derive(Debug, Clone)]
pub struct ChunkCompletion {
    pub report: ChunkReport,
    pub content: Option<String>,
}

enum AttemptFailure {
    Provider(String),
    TimedOut,
}

/// Ask the model to plan one chunk.
///
/// Never returns an error: a chunk that exhausts its retries yields a
/// report with `error` set so the remaining chunks still count.
pub async fn complete_chunk(
    provider: &Arc<dyn LLMProvider>,
    chunk: usize,
    total: usize,
    text: &str,
    config: &PlanConfig,
) -> ChunkCompletion {
    let start = Instant::now();
    let system_prompt = config
        .system_prompt
        .as_deref()
        .unwrap_or(DEFAULT_SYSTEM_PROMPT);

    let messages = vec![
        ChatMessage::system(system_prompt),
        ChatMessage::user(user_prompt(text, chunk, total)),
    ];
    let options = build_options(config);

    let mut report = ChunkReport {
        chunk,
        chars: text.chars().count(),
        groups: 0,
        items: 0,
        input_tokens: 0,
        output_tokens: 0,
        duration_ms: 0,
        retries: 0,
        error: None,
    };
    let mut last_failure = AttemptFailure::Provider("no attempt made".to_string());

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = config.retry_backoff_ms * 2u64.pow(attempt - 1);
            warn!(
                "Chunk {}: retry {}/{} after {}ms",
                chunk, attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }
        report.retries = attempt;

        let call = provider.chat(&messages, Some(&options));
        match timeout(Duration::from_secs(config.api_timeout_secs), call).await {
            Ok(Ok(response)) => {
                report.input_tokens = response.prompt_tokens;
                report.output_tokens = response.completion_tokens;
                report.duration_ms = start.elapsed().as_millis() as u64;
                debug!(
                    "Chunk {}: {} input tokens, {} output tokens, {}ms",
                    chunk, report.input_tokens, report.output_tokens, report.duration_ms
                );
                return ChunkCompletion {
                    report,
                    content: Some(response.content),
                };
            }
            Ok(Err(e)) => {
                warn!("Chunk {}: attempt {} failed: {}", chunk, attempt + 1, e);
                last_failure = AttemptFailure::Provider(e.to_string());
            }
            Err(_) => {
                warn!(
                    "Chunk {}: attempt {} timed out after {}s",
                    chunk,
                    attempt + 1,
                    config.api_timeout_secs
                );
                last_failure = AttemptFailure::TimedOut;
            }
        }
    }

    report.duration_ms = start.elapsed().as_millis() as u64;
    report.error = Some(match last_failure {
        AttemptFailure::TimedOut => ChunkError::Timeout {
            chunk,
            secs: config.api_timeout_secs,
        },
        AttemptFailure::Provider(detail) => ChunkError::CompletionFailed {
            chunk,
            retries: config.max_retries,
            detail,
        },
    });
    ChunkCompletion {
        report,
        content: None,
    }
}

fn build_options(config: &PlanConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}
