use crate::config::EngineConfig;
use crate::traits::{EngineStatus, ExtractionEngine};
use crate::types::{ExtractorError, Result};
use chrono::Utc;
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

/// A registered engine paired with its current configuration, handed to
/// strategies as an availability-checked snapshot.
#[derive(Clone)]
pub struct EngineHandle {
    pub engine: Arc<dyn ExtractionEngine>,
    pub config: EngineConfig,
}

struct RegistryEntry {
    engine: Arc<dyn ExtractionEngine>,
    config: EngineConfig,
}

/// Owns engine instances and their per-engine configuration.
///
/// Registration order is preserved: it drives sequential invocation order and
/// the deterministic tie-breaks in ensemble voting. Engine health is never
/// cached - `available()` re-checks every engine on each call, since a backing
/// model can be unloaded between calls.
pub struct EngineRegistry {
    entries: RwLock<Vec<RegistryEntry>>,
}

impl EngineRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Register an engine with default configuration.
    pub fn register(&self, engine: Arc<dyn ExtractionEngine>) {
        self.register_with_config(engine, EngineConfig::default());
    }

    /// Register an engine. Idempotent by name: a re-registration replaces the
    /// previous instance in place (keeping its position in the order).
    pub fn register_with_config(&self, engine: Arc<dyn ExtractionEngine>, config: EngineConfig) {
        let name = engine.name().to_string();
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());

        if let Some(entry) = entries.iter_mut().find(|e| e.engine.name() == name) {
            warn!("engine '{}' already registered, replacing previous instance", name);
            entry.engine = engine;
            entry.config = config;
        } else {
            info!("registering extraction engine '{}'", name);
            entries.push(RegistryEntry { engine, config });
        }
    }

    pub fn get(&self, name: &str) -> Option<EngineHandle> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .iter()
            .find(|e| e.engine.name() == name)
            .map(|e| EngineHandle {
                engine: e.engine.clone(),
                config: e.config.clone(),
            })
    }

    /// Engines currently enabled and passing their health check, in
    /// registration order. Computed fresh on every call.
    pub fn available(&self) -> Vec<EngineHandle> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .iter()
            .filter(|e| e.config.enabled && e.engine.is_available())
            .map(|e| EngineHandle {
                engine: e.engine.clone(),
                config: e.config.clone(),
            })
            .collect()
    }

    /// Replace an engine's configuration at runtime, without restart.
    pub fn update_config(&self, name: &str, config: EngineConfig) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        match entries.iter_mut().find(|e| e.engine.name() == name) {
            Some(entry) => {
                info!(
                    "updating config for engine '{}': weight={} enabled={} timeout={:?}",
                    name, config.weight, config.enabled, config.timeout
                );
                entry.config = config;
                Ok(())
            }
            None => Err(ExtractorError::General(format!(
                "cannot update config: engine '{}' is not registered",
                name
            ))),
        }
    }

    pub fn remove(&self, name: &str) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|e| e.engine.name() != name);
        before != entries.len()
    }

    /// Names of all registered engines, in registration order.
    pub fn engine_names(&self) -> Vec<String> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.iter().map(|e| e.engine.name().to_string()).collect()
    }

    /// Health snapshot of every registered engine.
    pub fn statuses(&self) -> Vec<EngineStatus> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let now = Utc::now();
        entries
            .iter()
            .map(|e| EngineStatus {
                name: e.engine.name().to_string(),
                available: e.engine.is_available(),
                enabled: e.config.enabled,
                weight: e.config.weight,
                last_checked: now,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EngineRegistry {
    fn default() -> Self {
        Self::new()
    }
}
