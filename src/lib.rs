pub mod analysis;
pub mod config;
pub mod engines;
pub mod factory;
pub mod orchestrator;
pub mod registry;
pub mod strategies;
pub mod strategy;
pub mod traits;
pub mod types;
pub mod voter;

pub use analysis::{profile_text, TextProfile};
pub use config::{
    AdaptiveConfig, ConfigLoader, EngineConfig, EnsembleConfig, InMemorySettings,
    OrchestratorConfig, SettingsProvider,
};
pub use engines::{MockEngine, ScriptedEngine};
pub use factory::StrategyFactory;
pub use orchestrator::{Orchestrator, OrchestratorBuilder};
pub use registry::{EngineHandle, EngineRegistry};
pub use strategy::{merge_descriptions, Strategy, StrategyContext};
pub use traits::{EngineStatus, ExtractionEngine};
pub use types::*;
pub use voter::{EnsembleVoter, VoteOutcome};
