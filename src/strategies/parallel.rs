use crate::strategy::{
    assemble_merged_result, ensure_any_succeeded, invoke_engine, merge_descriptions, Strategy,
    StrategyContext,
};
use crate::types::{EngineResult, ExtractorError, ProcessingResult, Result};
use async_trait::async_trait;
use futures::future::join_all;
use tracing::debug;

/// Fork-join over every available engine, one task per engine, each under its
/// own deadline. Successful outputs are merged by simple deduplication (no
/// weighting) - maximum recall, tolerant of individual engine failure.
pub struct ParallelStrategy;

impl ParallelStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ParallelStrategy {
    fn default() -> Self {
        Self::new()
    }
}

/// Invoke all engines in the context concurrently, preserving registration
/// order in the returned results. Shared with the ensemble strategy.
pub(crate) async fn fan_out(ctx: &StrategyContext<'_>) -> Result<Vec<EngineResult>> {
    if ctx.engines.is_empty() {
        return Err(ExtractorError::NoEnginesAvailable);
    }

    let invocations = ctx
        .engines
        .iter()
        .map(|handle| invoke_engine(handle, ctx.text, ctx.chapter_id, &ctx.cancel));

    let mut results = Vec::with_capacity(ctx.engines.len());
    for outcome in join_all(invocations).await {
        results.push(outcome?);
    }
    Ok(results)
}

#[async_trait]
impl Strategy for ParallelStrategy {
    fn name(&self) -> &'static str {
        "parallel"
    }

    async fn process(&self, ctx: &StrategyContext<'_>) -> Result<ProcessingResult> {
        debug!(
            "parallel strategy fanning out to {} engines",
            ctx.engines.len()
        );

        let results = fan_out(ctx).await?;
        ensure_any_succeeded(&results)?;

        let merged = merge_descriptions(
            &results,
            ctx.config.ensemble.position_window,
            ctx.config.ensemble.similarity_floor,
        );
        Ok(assemble_merged_result(results, merged))
    }
}
