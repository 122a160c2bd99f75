use crate::analysis::profile_text;
use crate::strategy::{Strategy, StrategyContext};
use crate::types::{ProcessingResult, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Profiles the text, then delegates to one of the other four strategies.
///
/// Routing contract: short and simple favors speed (single engine, or
/// parallel when several are available), long or structurally complex favors
/// quality (ensemble), the mid-range runs sequentially. All thresholds come
/// from `AdaptiveConfig`.
pub struct AdaptiveStrategy {
    single: Arc<dyn Strategy>,
    parallel: Arc<dyn Strategy>,
    sequential: Arc<dyn Strategy>,
    ensemble: Arc<dyn Strategy>,
}

impl AdaptiveStrategy {
    pub fn new(
        single: Arc<dyn Strategy>,
        parallel: Arc<dyn Strategy>,
        sequential: Arc<dyn Strategy>,
        ensemble: Arc<dyn Strategy>,
    ) -> Self {
        Self {
            single,
            parallel,
            sequential,
            ensemble,
        }
    }
}

#[async_trait]
impl Strategy for AdaptiveStrategy {
    fn name(&self) -> &'static str {
        "adaptive"
    }

    async fn process(&self, ctx: &StrategyContext<'_>) -> Result<ProcessingResult> {
        let profile = profile_text(ctx.text);
        let thresholds = &ctx.config.adaptive;

        let delegate: &Arc<dyn Strategy> = if profile.char_count >= thresholds.long_text_chars
            || profile.complexity >= thresholds.complexity_threshold
        {
            &self.ensemble
        } else if profile.char_count <= thresholds.short_text_chars {
            if ctx.engines.len() <= 1 {
                &self.single
            } else {
                &self.parallel
            }
        } else {
            &self.sequential
        };

        debug!(
            "adaptive routing: {} chars, {} sentences, complexity {:.2} -> {}",
            profile.char_count,
            profile.sentence_count,
            profile.complexity,
            delegate.name()
        );

        let mut result = delegate.process(ctx).await?;
        result
            .quality_metrics
            .insert("text_complexity".to_string(), profile.complexity);
        Ok(result)
    }
}
