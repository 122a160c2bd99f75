use crate::types::{DescriptionType, ExtractorError, ProcessingMode, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::RwLock;
use std::time::Duration;
use tracing::{debug, warn};

/// Abstract settings source the loader reads from. The concrete backing store
/// (file, database, remote config service) is outside this crate's scope.
pub trait SettingsProvider: Send + Sync {
    fn get_str(&self, key: &str) -> Option<String>;
    fn get_f64(&self, key: &str) -> Option<f64>;
    fn get_u64(&self, key: &str) -> Option<u64>;
    fn get_bool(&self, key: &str) -> Option<bool>;
}

/// HashMap-backed settings provider, used by tests and the demo binary and as
/// the default when no external source is wired in.
pub struct InMemorySettings {
    values: RwLock<HashMap<String, Value>>,
}

impl InMemorySettings {
    pub fn new() -> Self {
        Self {
            values: RwLock::new(HashMap::new()),
        }
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        values.insert(key.into(), value.into());
    }

    fn get(&self, key: &str) -> Option<Value> {
        let values = self.values.read().unwrap_or_else(|e| e.into_inner());
        values.get(key).cloned()
    }
}

impl Default for InMemorySettings {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsProvider for InMemorySettings {
    fn get_str(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        }
    }

    fn get_f64(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    fn get_u64(&self, key: &str) -> Option<u64> {
        match self.get(key)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            Value::Bool(b) => Some(b),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

/// Per-engine tunables. Owned by the loader, read-only to strategies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub weight: f64,
    pub enabled: bool,
    pub timeout: Duration,
    /// Engine-specific parameters, opaque to the orchestrator.
    pub parameters: HashMap<String, String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            weight: defaults::ENGINE_WEIGHT,
            enabled: true,
            timeout: defaults::ENGINE_TIMEOUT,
            parameters: HashMap::new(),
        }
    }
}

/// Voting parameters for ensemble mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsembleConfig {
    /// Minimum fraction of available engine weight that must agree on a span.
    pub consensus_threshold: f64,
    /// Per-engine weight overrides; engines absent here use their `EngineConfig` weight.
    pub engine_weights: HashMap<String, f64>,
    /// Character-offset window within which spans can cluster together.
    pub position_window: usize,
    /// Token-overlap ratio two spans must exceed to cluster together.
    pub similarity_floor: f64,
    /// Priority multipliers per description type.
    pub type_priority_weights: HashMap<DescriptionType, f64>,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        let mut type_priority_weights = HashMap::new();
        // Locations and characters are the most useful downstream
        type_priority_weights.insert(DescriptionType::Location, 1.2);
        type_priority_weights.insert(DescriptionType::Character, 1.2);
        type_priority_weights.insert(DescriptionType::Atmosphere, 1.0);
        type_priority_weights.insert(DescriptionType::Object, 1.0);
        type_priority_weights.insert(DescriptionType::Action, 1.0);

        Self {
            consensus_threshold: defaults::CONSENSUS_THRESHOLD,
            engine_weights: HashMap::new(),
            position_window: defaults::POSITION_WINDOW,
            similarity_floor: defaults::SIMILARITY_FLOOR,
            type_priority_weights,
        }
    }
}

/// Thresholds the adaptive strategy routes on. Tunable, never hardcoded at
/// the call sites.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptiveConfig {
    /// Texts at or below this many characters count as short.
    pub short_text_chars: usize,
    /// Texts at or above this many characters count as long.
    pub long_text_chars: usize,
    /// Structural complexity in [0,1] at or above which ensemble is preferred.
    pub complexity_threshold: f64,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            short_text_chars: defaults::SHORT_TEXT_CHARS,
            long_text_chars: defaults::LONG_TEXT_CHARS,
            complexity_threshold: defaults::COMPLEXITY_THRESHOLD,
        }
    }
}

/// The full configuration bundle the loader resolves at orchestrator build time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    pub engines: HashMap<String, EngineConfig>,
    pub ensemble: EnsembleConfig,
    pub adaptive: AdaptiveConfig,
    /// Preferred engine for single mode; first available engine when unset.
    pub default_engine: Option<String>,
    /// Whether single mode may fall back to another available engine.
    pub single_fallback: bool,
    pub default_mode: ProcessingMode,
    /// Wall-clock budget for one whole extraction call.
    pub overall_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            engines: HashMap::new(),
            ensemble: EnsembleConfig::default(),
            adaptive: AdaptiveConfig::default(),
            default_engine: None,
            single_fallback: true,
            default_mode: ProcessingMode::Adaptive,
            overall_timeout: defaults::OVERALL_TIMEOUT,
        }
    }
}

pub mod defaults {
    use std::time::Duration;

    pub const ENGINE_WEIGHT: f64 = 1.0;
    pub const ENGINE_TIMEOUT: Duration = Duration::from_secs(5);
    pub const CONSENSUS_THRESHOLD: f64 = 0.6;
    pub const POSITION_WINDOW: usize = 40;
    pub const SIMILARITY_FLOOR: f64 = 0.5;
    pub const SHORT_TEXT_CHARS: usize = 1_000;
    pub const LONG_TEXT_CHARS: usize = 6_000;
    pub const COMPLEXITY_THRESHOLD: f64 = 0.5;
    pub const OVERALL_TIMEOUT: Duration = Duration::from_secs(30);
}

/// Resolves runtime configuration from a settings provider, substituting
/// validated defaults for anything missing or malformed. Loading runs at
/// every orchestrator initialization, so a bad value is logged and defaulted
/// rather than failing the whole load.
pub struct ConfigLoader {
    provider: Arc<dyn SettingsProvider>,
}

impl ConfigLoader {
    pub fn new(provider: Arc<dyn SettingsProvider>) -> Self {
        Self { provider }
    }

    /// Load configuration for the given registered engine names.
    pub fn load(&self, engine_names: &[String]) -> Result<OrchestratorConfig> {
        let mut config = OrchestratorConfig::default();

        config.ensemble.consensus_threshold = self.unit_interval(
            "ensemble.consensus_threshold",
            defaults::CONSENSUS_THRESHOLD,
        );
        if let Some(window) = self.provider.get_u64("ensemble.position_window") {
            config.ensemble.position_window = window as usize;
        }
        config.ensemble.similarity_floor =
            self.unit_interval("ensemble.similarity_floor", defaults::SIMILARITY_FLOOR);

        config.adaptive.short_text_chars = self
            .provider
            .get_u64("adaptive.short_text_chars")
            .map(|v| v as usize)
            .unwrap_or(defaults::SHORT_TEXT_CHARS);
        config.adaptive.long_text_chars = self
            .provider
            .get_u64("adaptive.long_text_chars")
            .map(|v| v as usize)
            .unwrap_or(defaults::LONG_TEXT_CHARS);
        if config.adaptive.long_text_chars <= config.adaptive.short_text_chars {
            warn!(
                "adaptive.long_text_chars ({}) must exceed adaptive.short_text_chars ({}), using defaults",
                config.adaptive.long_text_chars, config.adaptive.short_text_chars
            );
            config.adaptive.short_text_chars = defaults::SHORT_TEXT_CHARS;
            config.adaptive.long_text_chars = defaults::LONG_TEXT_CHARS;
        }
        config.adaptive.complexity_threshold = self.unit_interval(
            "adaptive.complexity_threshold",
            defaults::COMPLEXITY_THRESHOLD,
        );

        config.default_engine = self.provider.get_str("orchestrator.default_engine");
        if let Some(fallback) = self.provider.get_bool("orchestrator.single_fallback") {
            config.single_fallback = fallback;
        }
        if let Some(mode) = self.provider.get_str("orchestrator.default_mode") {
            match ProcessingMode::from_str(&mode) {
                Ok(mode) => config.default_mode = mode,
                Err(_) => warn!(
                    "unknown orchestrator.default_mode '{}', keeping {}",
                    mode, config.default_mode
                ),
            }
        }
        config.overall_timeout =
            self.timeout_ms("orchestrator.overall_timeout_ms", defaults::OVERALL_TIMEOUT);

        let mut explicit_weights = 0usize;
        let mut invalid_weights = 0usize;

        for name in engine_names {
            let mut engine = EngineConfig::default();

            let weight_key = format!("engines.{}.weight", name);
            if let Some(weight) = self.provider.get_f64(&weight_key) {
                explicit_weights += 1;
                if weight > 0.0 {
                    engine.weight = weight;
                } else {
                    invalid_weights += 1;
                    warn!("{} = {} is out of range, using {}", weight_key, weight, engine.weight);
                }
            }

            if let Some(enabled) = self.provider.get_bool(&format!("engines.{}.enabled", name)) {
                engine.enabled = enabled;
            }
            engine.timeout =
                self.timeout_ms(&format!("engines.{}.timeout_ms", name), defaults::ENGINE_TIMEOUT);

            let override_key = format!("ensemble.weights.{}", name);
            if let Some(weight) = self.provider.get_f64(&override_key) {
                if weight > 0.0 {
                    config.ensemble.engine_weights.insert(name.clone(), weight);
                } else {
                    warn!("{} = {} is out of range, ignoring override", override_key, weight);
                }
            }

            debug!(
                "loaded config for engine '{}': weight={} enabled={} timeout={:?}",
                name, engine.weight, engine.enabled, engine.timeout
            );
            config.engines.insert(name.clone(), engine);
        }

        // A bad value here and there is defaulted away, but a configuration
        // that zeroes out every engine has no safe fallback.
        if !engine_names.is_empty() && explicit_weights == engine_names.len() && invalid_weights == explicit_weights {
            return Err(ExtractorError::ConfigValidation(
                "every configured engine weight is zero or negative".to_string(),
            ));
        }

        Ok(config)
    }

    fn unit_interval(&self, key: &str, default: f64) -> f64 {
        match self.provider.get_f64(key) {
            Some(v) if v > 0.0 && v <= 1.0 => v,
            Some(v) => {
                warn!("{} = {} is outside (0, 1], using {}", key, v, default);
                default
            }
            None => default,
        }
    }

    fn timeout_ms(&self, key: &str, default: Duration) -> Duration {
        match self.provider.get_u64(key) {
            Some(0) => {
                warn!("{} must be positive, using {:?}", key, default);
                default
            }
            Some(ms) => Duration::from_millis(ms),
            None => default,
        }
    }
}
