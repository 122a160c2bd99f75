use crate::config::{ConfigLoader, EngineConfig, InMemorySettings, OrchestratorConfig, SettingsProvider};
use crate::factory::StrategyFactory;
use crate::registry::EngineRegistry;
use crate::strategy::StrategyContext;
use crate::traits::{EngineStatus, ExtractionEngine};
use crate::types::{ExtractorError, ProcessingMode, ProcessingResult, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

/// Public entry point of the extraction subsystem.
///
/// Owns the engine registry and loaded configuration, selects a strategy per
/// call through the factory, enforces the overall wall-clock budget, and
/// attaches timing to the result. Constructed through `OrchestratorBuilder`
/// and owned by the surrounding service's lifecycle - there is no process-wide
/// instance.
pub struct Orchestrator {
    registry: Arc<EngineRegistry>,
    config: Arc<RwLock<OrchestratorConfig>>,
    factory: StrategyFactory,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator").finish_non_exhaustive()
    }
}

impl Orchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    /// Extract descriptions using the configured default mode.
    pub async fn extract_default(&self, text: &str, chapter_id: &str) -> Result<ProcessingResult> {
        let mode = self.config.read().await.default_mode;
        self.extract(text, chapter_id, mode).await
    }

    pub async fn extract(
        &self,
        text: &str,
        chapter_id: &str,
        mode: ProcessingMode,
    ) -> Result<ProcessingResult> {
        self.extract_with_cancellation(text, chapter_id, mode, CancellationToken::new())
            .await
    }

    /// Extract with a caller-supplied cancellation token. Cancellation
    /// propagates to all in-flight engine calls; the call returns promptly
    /// with `Cancelled` rather than waiting out slow engines.
    pub async fn extract_with_cancellation(
        &self,
        text: &str,
        chapter_id: &str,
        mode: ProcessingMode,
        cancel: CancellationToken,
    ) -> Result<ProcessingResult> {
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        let config = self.config.read().await.clone();

        let engines = self.registry.available();
        if engines.is_empty() {
            warn!("extraction {} rejected: no engines available", run_id);
            return Err(ExtractorError::NoEnginesAvailable);
        }

        info!(
            "extraction {} starting: mode={} chapter={} engines={} text_chars={}",
            run_id,
            mode,
            chapter_id,
            engines.len(),
            text.chars().count()
        );

        // Child token: caller cancellation propagates down, but the deadline
        // path below must not cancel the caller's own token.
        let call_cancel = cancel.child_token();
        let strategy = self.factory.get(mode);
        let ctx = StrategyContext {
            text,
            chapter_id,
            engines,
            config: &config,
            cancel: call_cancel.clone(),
        };

        let outcome = tokio::time::timeout(config.overall_timeout, strategy.process(&ctx)).await;
        let mut result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                warn!("extraction {} failed: {}", run_id, e);
                return Err(e);
            }
            Err(_) => {
                // Release any still-running engine invocations before returning.
                call_cancel.cancel();
                warn!(
                    "extraction {} exceeded the overall deadline of {:?}",
                    run_id, config.overall_timeout
                );
                return Err(ExtractorError::DeadlineExceeded(config.overall_timeout));
            }
        };

        result.processing_time = started.elapsed();
        info!(
            "extraction {} finished: {} descriptions from {} engines in {:?}",
            run_id,
            result.descriptions.len(),
            result.engines_used.len(),
            result.processing_time
        );
        Ok(result)
    }

    /// Health snapshot of every registered engine, for external monitoring.
    pub fn status(&self) -> HashMap<String, EngineStatus> {
        self.registry
            .statuses()
            .into_iter()
            .map(|status| (status.name.clone(), status))
            .collect()
    }

    /// Register an additional engine after construction.
    pub fn register_engine(&self, engine: Arc<dyn ExtractionEngine>) {
        self.registry.register(engine);
    }

    /// Change the default processing mode at runtime.
    pub async fn update_mode(&self, mode: ProcessingMode) {
        let mut config = self.config.write().await;
        info!("default processing mode changed: {} -> {}", config.default_mode, mode);
        config.default_mode = mode;
    }

    /// Reconfigure one engine at runtime, without re-initialization.
    pub async fn update_engine_config(&self, name: &str, engine_config: EngineConfig) -> Result<()> {
        if engine_config.weight <= 0.0 {
            return Err(ExtractorError::ConfigValidation(format!(
                "weight for engine '{}' must be positive, got {}",
                name, engine_config.weight
            )));
        }
        if engine_config.timeout.is_zero() {
            return Err(ExtractorError::ConfigValidation(format!(
                "timeout for engine '{}' must be positive",
                name
            )));
        }

        self.registry.update_config(name, engine_config.clone())?;
        let mut config = self.config.write().await;
        config.engines.insert(name.to_string(), engine_config);
        Ok(())
    }

    pub fn registry(&self) -> &EngineRegistry {
        &self.registry
    }
}

/// Builder wiring engines and a settings source into an orchestrator.
pub struct OrchestratorBuilder {
    engines: Vec<(Arc<dyn ExtractionEngine>, Option<EngineConfig>)>,
    provider: Option<Arc<dyn SettingsProvider>>,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            engines: Vec::new(),
            provider: None,
        }
    }

    pub fn with_engine(mut self, engine: Arc<dyn ExtractionEngine>) -> Self {
        self.engines.push((engine, None));
        self
    }

    pub fn with_engine_config(
        mut self,
        engine: Arc<dyn ExtractionEngine>,
        config: EngineConfig,
    ) -> Self {
        self.engines.push((engine, Some(config)));
        self
    }

    pub fn with_settings(mut self, provider: Arc<dyn SettingsProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Load configuration and assemble the orchestrator. Runs once per
    /// instance; later reconfiguration goes through the update methods.
    pub fn build(self) -> Result<Orchestrator> {
        let registry = Arc::new(EngineRegistry::new());
        for (engine, config) in &self.engines {
            match config {
                Some(config) => registry.register_with_config(engine.clone(), config.clone()),
                None => registry.register(engine.clone()),
            }
        }

        let provider = self
            .provider
            .unwrap_or_else(|| Arc::new(InMemorySettings::new()) as Arc<dyn SettingsProvider>);
        let loader = ConfigLoader::new(provider);
        let mut config = loader.load(&registry.engine_names())?;

        // Explicit per-engine configs passed to the builder win over the
        // settings source.
        for (engine, engine_config) in &self.engines {
            if let Some(engine_config) = engine_config {
                config
                    .engines
                    .insert(engine.name().to_string(), engine_config.clone());
            } else if let Some(loaded) = config.engines.get(engine.name()) {
                registry.update_config(engine.name(), loaded.clone())?;
            }
        }

        info!(
            "orchestrator initialized: {} engines, default mode {}",
            registry.len(),
            config.default_mode
        );

        Ok(Orchestrator {
            registry,
            config: Arc::new(RwLock::new(config)),
            factory: StrategyFactory::new(),
        })
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
