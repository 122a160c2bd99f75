use crate::analysis::token_overlap;
use crate::config::OrchestratorConfig;
use crate::registry::EngineHandle;
use crate::types::{
    Description, EngineResult, ExtractorError, ProcessingResult, Result,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Everything one extraction call hands to its strategy: the text, an
/// availability-checked engine snapshot (in registration order), the loaded
/// configuration, and the caller's cancellation token.
pub struct StrategyContext<'a> {
    pub text: &'a str,
    pub chapter_id: &'a str,
    pub engines: Vec<EngineHandle>,
    pub config: &'a OrchestratorConfig,
    pub cancel: CancellationToken,
}

/// An execution strategy: how engines are invoked for one call and how their
/// outputs are merged into one result. Strategies hold no per-call state.
#[async_trait]
pub trait Strategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn process(&self, ctx: &StrategyContext<'_>) -> Result<ProcessingResult>;
}

/// Invoke one engine under its configured deadline.
///
/// Timeout and engine failure are recovered locally into a failed
/// `EngineResult`; dropping the timed-out future abandons the invocation
/// without blocking on it. Only caller cancellation escapes as an error.
pub(crate) async fn invoke_engine(
    handle: &EngineHandle,
    text: &str,
    chapter_id: &str,
    cancel: &CancellationToken,
) -> Result<EngineResult> {
    let name = handle.engine.name().to_string();
    let timeout = handle.config.timeout;
    let started = Instant::now();

    tokio::select! {
        _ = cancel.cancelled() => Err(ExtractorError::Cancelled),
        outcome = tokio::time::timeout(timeout, handle.engine.extract(text, chapter_id)) => {
            let elapsed = started.elapsed();
            match outcome {
                Ok(Ok(descriptions)) => Ok(EngineResult::success(name, descriptions, elapsed)),
                Ok(Err(e)) => {
                    warn!("engine '{}' failed after {:?}: {}", name, elapsed, e);
                    Ok(EngineResult::failure(name, e.to_string(), elapsed))
                }
                Err(_) => {
                    let timeout_err = ExtractorError::EngineTimeout {
                        name: name.clone(),
                        timeout,
                    };
                    warn!("{}", timeout_err);
                    Ok(EngineResult::failure(name, timeout_err.to_string(), elapsed))
                }
            }
        }
    }
}

/// Merge successful engine outputs by simple deduplication, no weighting.
///
/// Two descriptions are duplicates when they share a type, sit within the
/// position window, and their token overlap clears the similarity floor; the
/// higher-confidence copy survives. Idempotent: merging a merged set with the
/// same inputs again does not accumulate duplicates.
pub fn merge_descriptions(
    results: &[EngineResult],
    position_window: usize,
    similarity_floor: f64,
) -> Vec<Description> {
    let mut merged: Vec<Description> = Vec::new();

    for result in results.iter().filter(|r| r.succeeded()) {
        for description in &result.descriptions {
            let duplicate = merged.iter_mut().find(|kept| {
                kept.description_type == description.description_type
                    && kept
                        .position_in_chapter
                        .abs_diff(description.position_in_chapter)
                        <= position_window
                    && token_overlap(&kept.content, &description.content) >= similarity_floor
            });

            match duplicate {
                Some(kept) => {
                    if description.confidence_score > kept.confidence_score {
                        *kept = description.clone();
                    }
                }
                None => merged.push(description.clone()),
            }
        }
    }

    merged
}

/// Raw per-engine outputs for the diagnostics map, successful engines only.
pub(crate) fn per_engine_map(results: &[EngineResult]) -> HashMap<String, Vec<Description>> {
    results
        .iter()
        .filter(|r| r.succeeded())
        .map(|r| (r.engine_name.clone(), r.descriptions.clone()))
        .collect()
}

pub(crate) fn engines_used(results: &[EngineResult]) -> Vec<String> {
    results
        .iter()
        .filter(|r| r.succeeded())
        .map(|r| r.engine_name.clone())
        .collect()
}

/// Fail the call when not a single invoked engine produced output.
pub(crate) fn ensure_any_succeeded(results: &[EngineResult]) -> Result<()> {
    if results.iter().any(|r| r.succeeded()) {
        Ok(())
    } else {
        Err(ExtractorError::AllEnginesFailed {
            attempted: results.len(),
        })
    }
}

/// Shared result assembly for the non-voting strategies.
pub(crate) fn assemble_merged_result(
    results: Vec<EngineResult>,
    mut descriptions: Vec<Description>,
) -> ProcessingResult {
    crate::types::sort_descriptions(&mut descriptions);

    let mut result = ProcessingResult::new();
    result.engines_used = engines_used(&results);
    result.per_engine = per_engine_map(&results);

    let failed = results.len() - result.engines_used.len();
    if failed > 0 {
        result.recommendations.push(format!(
            "{} engine(s) failed or timed out - results cover {} of {} engines",
            failed,
            result.engines_used.len(),
            results.len()
        ));
    }

    let avg_confidence = if descriptions.is_empty() {
        0.0
    } else {
        descriptions.iter().map(|d| d.confidence_score).sum::<f64>() / descriptions.len() as f64
    };
    result
        .quality_metrics
        .insert("avg_confidence".to_string(), avg_confidence);
    result
        .quality_metrics
        .insert("engines_ran".to_string(), result.engines_used.len() as f64);
    result
        .quality_metrics
        .insert("engines_failed".to_string(), failed as f64);

    result.descriptions = descriptions;
    result
}
