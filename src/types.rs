use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Category of an extracted description, used for routing and priority weighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptionType {
    Location,
    Character,
    Atmosphere,
    Object,
    Action,
}

impl DescriptionType {
    pub fn all() -> [DescriptionType; 5] {
        [
            DescriptionType::Location,
            DescriptionType::Character,
            DescriptionType::Atmosphere,
            DescriptionType::Object,
            DescriptionType::Action,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            DescriptionType::Location => "location",
            DescriptionType::Character => "character",
            DescriptionType::Atmosphere => "atmosphere",
            DescriptionType::Object => "object",
            DescriptionType::Action => "action",
        }
    }
}

impl fmt::Display for DescriptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One extracted narrative span.
///
/// Immutable once an engine (or the voter) has returned it; scores are clamped
/// into their bounds at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Description {
    pub description_type: DescriptionType,
    pub content: String,
    pub context: Option<String>,
    pub position_in_chapter: usize,
    pub confidence_score: f64,
    pub priority_score: f64,
    pub word_count: usize,
    pub is_suitable_for_generation: bool,
    pub entities_mentioned: Vec<String>,
    pub emotional_tone: Option<String>,
    pub complexity_level: Option<String>,
}

impl Description {
    pub fn new(
        description_type: DescriptionType,
        content: impl Into<String>,
        position_in_chapter: usize,
        confidence_score: f64,
    ) -> Self {
        let content = content.into();
        let word_count = content.split_whitespace().count();

        Self {
            description_type,
            content,
            context: None,
            position_in_chapter,
            confidence_score: confidence_score.clamp(0.0, 1.0),
            priority_score: 0.0,
            word_count,
            // Very short fragments rarely carry enough detail to render from
            is_suitable_for_generation: word_count >= 5,
            entities_mentioned: Vec::new(),
            emotional_tone: None,
            complexity_level: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_entities(mut self, entities: Vec<String>) -> Self {
        self.entities_mentioned = entities;
        self
    }

    pub fn with_priority(mut self, priority_score: f64) -> Self {
        self.priority_score = priority_score.clamp(0.0, 100.0);
        self
    }

    pub fn with_emotional_tone(mut self, tone: impl Into<String>) -> Self {
        self.emotional_tone = Some(tone.into());
        self
    }
}

/// Raw output of one engine invocation for one text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineResult {
    pub engine_name: String,
    pub descriptions: Vec<Description>,
    pub elapsed: Duration,
    pub error: Option<String>,
}

impl EngineResult {
    pub fn success(engine_name: impl Into<String>, descriptions: Vec<Description>, elapsed: Duration) -> Self {
        Self {
            engine_name: engine_name.into(),
            descriptions,
            elapsed,
            error: None,
        }
    }

    /// A failed invocation carries no descriptions.
    pub fn failure(engine_name: impl Into<String>, error: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            engine_name: engine_name.into(),
            descriptions: Vec::new(),
            elapsed,
            error: Some(error.into()),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Final result returned by the orchestrator for one extraction call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingResult {
    /// Merged, deduplicated and ranked descriptions (priority desc, position asc).
    pub descriptions: Vec<Description>,
    /// Raw pre-merge output per engine, for diagnostics.
    pub per_engine: HashMap<String, Vec<Description>>,
    pub processing_time: Duration,
    pub engines_used: Vec<String>,
    pub quality_metrics: HashMap<String, f64>,
    /// Human-readable tuning hints, e.g. "low consensus - consider adding an engine".
    pub recommendations: Vec<String>,
}

impl ProcessingResult {
    pub fn new() -> Self {
        Self {
            descriptions: Vec::new(),
            per_engine: HashMap::new(),
            processing_time: Duration::ZERO,
            engines_used: Vec::new(),
            quality_metrics: HashMap::new(),
            recommendations: Vec::new(),
        }
    }
}

impl Default for ProcessingResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Sort descriptions into the canonical output order: priority descending,
/// ties broken by chapter position ascending.
pub fn sort_descriptions(descriptions: &mut [Description]) {
    descriptions.sort_by(|a, b| {
        b.priority_score
            .partial_cmp(&a.priority_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.position_in_chapter.cmp(&b.position_in_chapter))
    });
}

/// Execution strategy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingMode {
    Single,
    Parallel,
    Sequential,
    Ensemble,
    Adaptive,
}

impl fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProcessingMode::Single => "single",
            ProcessingMode::Parallel => "parallel",
            ProcessingMode::Sequential => "sequential",
            ProcessingMode::Ensemble => "ensemble",
            ProcessingMode::Adaptive => "adaptive",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for ProcessingMode {
    type Err = ExtractorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "single" => Ok(ProcessingMode::Single),
            "parallel" => Ok(ProcessingMode::Parallel),
            "sequential" => Ok(ProcessingMode::Sequential),
            "ensemble" => Ok(ProcessingMode::Ensemble),
            "adaptive" => Ok(ProcessingMode::Adaptive),
            other => Err(ExtractorError::InvalidMode(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractorError {
    #[error("no extraction engines are available")]
    NoEnginesAvailable,

    #[error("engine '{name}' is unavailable")]
    EngineUnavailable { name: String },

    #[error("engine '{name}' timed out after {timeout:?}")]
    EngineTimeout { name: String, timeout: Duration },

    #[error("engine '{name}' failed: {message}")]
    EngineFailed { name: String, message: String },

    #[error("all {attempted} invoked engines failed or timed out")]
    AllEnginesFailed { attempted: usize },

    #[error("unknown processing mode: {0}")]
    InvalidMode(String),

    #[error("configuration validation failed: {0}")]
    ConfigValidation(String),

    #[error("extraction was cancelled")]
    Cancelled,

    #[error("overall processing deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),

    #[error("general error: {0}")]
    General(String),
}

pub type Result<T> = std::result::Result<T, ExtractorError>;
