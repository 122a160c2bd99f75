use crate::registry::EngineHandle;
use crate::strategy::{assemble_merged_result, ensure_any_succeeded, invoke_engine, Strategy, StrategyContext};
use crate::types::{ExtractorError, ProcessingResult, Result};
use async_trait::async_trait;
use tracing::{debug, warn};

/// Invoke exactly one engine and return its raw output verbatim, no voting.
///
/// The configured default engine is preferred; when it is down the strategy
/// falls back to the first available engine if fallback is enabled, and fails
/// with `EngineUnavailable` otherwise.
pub struct SingleStrategy;

impl SingleStrategy {
    pub fn new() -> Self {
        Self
    }

    fn select_engine(&self, ctx: &StrategyContext<'_>) -> Result<EngineHandle> {
        let first = ctx
            .engines
            .first()
            .ok_or(ExtractorError::NoEnginesAvailable)?;

        match &ctx.config.default_engine {
            Some(name) => match ctx.engines.iter().find(|h| h.engine.name() == name.as_str()) {
                Some(handle) => Ok(handle.clone()),
                None if ctx.config.single_fallback => {
                    warn!(
                        "default engine '{}' is unavailable, falling back to '{}'",
                        name,
                        first.engine.name()
                    );
                    Ok(first.clone())
                }
                None => Err(ExtractorError::EngineUnavailable { name: name.clone() }),
            },
            None => Ok(first.clone()),
        }
    }
}

impl Default for SingleStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Strategy for SingleStrategy {
    fn name(&self) -> &'static str {
        "single"
    }

    async fn process(&self, ctx: &StrategyContext<'_>) -> Result<ProcessingResult> {
        let handle = self.select_engine(ctx)?;
        debug!("single strategy invoking engine '{}'", handle.engine.name());

        let result = invoke_engine(&handle, ctx.text, ctx.chapter_id, &ctx.cancel).await?;
        ensure_any_succeeded(std::slice::from_ref(&result))?;

        let descriptions = result.descriptions.clone();
        Ok(assemble_merged_result(vec![result], descriptions))
    }
}
