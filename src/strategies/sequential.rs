use crate::strategy::{
    assemble_merged_result, ensure_any_succeeded, invoke_engine, merge_descriptions, Strategy,
    StrategyContext,
};
use crate::types::{ExtractorError, ProcessingResult, Result};
use async_trait::async_trait;
use tracing::debug;

/// Invoke available engines one at a time in registration order.
///
/// Same merge as parallel mode, without the concurrency - for deployments
/// where engines share memory-heavy models and must not run side by side.
pub struct SequentialStrategy;

impl SequentialStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SequentialStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Strategy for SequentialStrategy {
    fn name(&self) -> &'static str {
        "sequential"
    }

    async fn process(&self, ctx: &StrategyContext<'_>) -> Result<ProcessingResult> {
        if ctx.engines.is_empty() {
            return Err(ExtractorError::NoEnginesAvailable);
        }

        let mut results = Vec::with_capacity(ctx.engines.len());
        for handle in &ctx.engines {
            if ctx.cancel.is_cancelled() {
                return Err(ExtractorError::Cancelled);
            }
            debug!("sequential strategy invoking engine '{}'", handle.engine.name());
            results.push(invoke_engine(handle, ctx.text, ctx.chapter_id, &ctx.cancel).await?);
        }

        ensure_any_succeeded(&results)?;

        let merged = merge_descriptions(
            &results,
            ctx.config.ensemble.position_window,
            ctx.config.ensemble.similarity_floor,
        );
        Ok(assemble_merged_result(results, merged))
    }
}
