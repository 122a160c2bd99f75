use crate::strategies::parallel::fan_out;
use crate::strategy::{engines_used, ensure_any_succeeded, per_engine_map, Strategy, StrategyContext};
use crate::types::{ProcessingResult, Result};
use crate::voter::EnsembleVoter;
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::debug;

/// Same fan-out as parallel mode, but the merged raw outputs go through
/// weighted-consensus voting instead of simple deduplication. Highest quality,
/// lowest throughput.
pub struct EnsembleStrategy;

impl EnsembleStrategy {
    pub fn new() -> Self {
        Self
    }

    /// Voting weight per engine: an explicit ensemble override wins, otherwise
    /// the engine's own configured weight applies.
    fn resolve_weights(ctx: &StrategyContext<'_>) -> HashMap<String, f64> {
        ctx.engines
            .iter()
            .map(|handle| {
                let name = handle.engine.name().to_string();
                let weight = ctx
                    .config
                    .ensemble
                    .engine_weights
                    .get(&name)
                    .copied()
                    .unwrap_or(handle.config.weight);
                (name, weight)
            })
            .collect()
    }
}

impl Default for EnsembleStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Strategy for EnsembleStrategy {
    fn name(&self) -> &'static str {
        "ensemble"
    }

    async fn process(&self, ctx: &StrategyContext<'_>) -> Result<ProcessingResult> {
        debug!(
            "ensemble strategy fanning out to {} engines",
            ctx.engines.len()
        );

        let results = fan_out(ctx).await?;
        ensure_any_succeeded(&results)?;

        let voter = EnsembleVoter::new(ctx.config.ensemble.clone(), Self::resolve_weights(ctx));
        let outcome = voter.combine(&results);

        let mut result = ProcessingResult::new();
        result.engines_used = engines_used(&results);
        result.per_engine = per_engine_map(&results);
        result.descriptions = outcome.descriptions;
        result.quality_metrics = outcome.quality_metrics;
        result.recommendations = outcome.recommendations;
        Ok(result)
    }
}
