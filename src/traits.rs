use crate::types::{Description, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Trait every pluggable extraction engine implements.
///
/// Engines are opaque to the orchestrator: how a span is found (tokenization,
/// POS tagging, NER, ...) is entirely the engine's business. An engine must be
/// safe to invoke concurrently on different texts.
#[async_trait]
pub trait ExtractionEngine: Send + Sync {
    /// Stable identifier used for weighting and diagnostics.
    fn name(&self) -> &str;

    /// Cheap health check. Callers must not invoke an engine that reports
    /// itself unavailable (e.g. a backing model unloaded under memory pressure).
    fn is_available(&self) -> bool;

    /// Extract descriptions from the given chapter text. The caller wraps this
    /// in a deadline; on internal failure the engine returns an error rather
    /// than partial or garbage data.
    async fn extract(&self, text: &str, chapter_id: &str) -> Result<Vec<Description>>;
}

/// Point-in-time health snapshot of one registered engine, surfaced through
/// `Orchestrator::status()` for external monitoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatus {
    pub name: String,
    pub available: bool,
    pub enabled: bool,
    pub weight: f64,
    pub last_checked: DateTime<Utc>,
}
