use crate::strategies::{
    AdaptiveStrategy, EnsembleStrategy, ParallelStrategy, SequentialStrategy, SingleStrategy,
};
use crate::strategy::Strategy;
use crate::types::ProcessingMode;
use std::sync::Arc;

/// Maps a processing mode to its strategy instance.
///
/// Strategies are stateless, so every mode gets one cached singleton, built
/// eagerly at construction - an unknown mode can only ever surface while
/// parsing configuration, never at call time.
pub struct StrategyFactory {
    single: Arc<dyn Strategy>,
    parallel: Arc<dyn Strategy>,
    sequential: Arc<dyn Strategy>,
    ensemble: Arc<dyn Strategy>,
    adaptive: Arc<dyn Strategy>,
}

impl StrategyFactory {
    pub fn new() -> Self {
        let single: Arc<dyn Strategy> = Arc::new(SingleStrategy::new());
        let parallel: Arc<dyn Strategy> = Arc::new(ParallelStrategy::new());
        let sequential: Arc<dyn Strategy> = Arc::new(SequentialStrategy::new());
        let ensemble: Arc<dyn Strategy> = Arc::new(EnsembleStrategy::new());
        let adaptive: Arc<dyn Strategy> = Arc::new(AdaptiveStrategy::new(
            single.clone(),
            parallel.clone(),
            sequential.clone(),
            ensemble.clone(),
        ));

        Self {
            single,
            parallel,
            sequential,
            ensemble,
            adaptive,
        }
    }

    pub fn get(&self, mode: ProcessingMode) -> Arc<dyn Strategy> {
        match mode {
            ProcessingMode::Single => self.single.clone(),
            ProcessingMode::Parallel => self.parallel.clone(),
            ProcessingMode::Sequential => self.sequential.clone(),
            ProcessingMode::Ensemble => self.ensemble.clone(),
            ProcessingMode::Adaptive => self.adaptive.clone(),
        }
    }
}

impl Default for StrategyFactory {
    fn default() -> Self {
        Self::new()
    }
}
