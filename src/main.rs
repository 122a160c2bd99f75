use anyhow::Context;
use clap::Parser;
use description_extractor::{MockEngine, Orchestrator, ProcessingMode};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

/// Run the description extractor against a chapter text with the built-in
/// mock engines.
#[derive(Parser)]
#[command(name = "description-extractor")]
struct Args {
    /// Path to a chapter text file; a built-in sample is used when omitted.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Processing mode: single, parallel, sequential, ensemble or adaptive.
    #[arg(long, default_value = "adaptive")]
    mode: String,

    /// Print the full result as JSON instead of a summary.
    #[arg(long)]
    json: bool,
}

const SAMPLE_CHAPTER: &str = "The castle rose above the valley, its towers lost in mist. \
Elena stood at the gate, her cloak heavy with rain, her eyes fixed on the dark hall beyond. \
The air was cold and silent. \
She grabbed the iron ring of the door and struck it three times. \
Somewhere inside, a lantern flickered against the shadow.";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let mode = ProcessingMode::from_str(&args.mode).context("invalid --mode")?;

    let text = match &args.input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => SAMPLE_CHAPTER.to_string(),
    };

    let orchestrator = Orchestrator::builder()
        .with_engine(Arc::new(MockEngine::new("cue-fast").with_delay(20)))
        .with_engine(Arc::new(MockEngine::new("cue-standard").with_delay(60)))
        .with_engine(Arc::new(MockEngine::new("cue-thorough").with_delay(120)))
        .build()?;

    for (name, status) in orchestrator.status() {
        info!(
            "engine '{}': available={} weight={}",
            name, status.available, status.weight
        );
    }

    let result = orchestrator.extract(&text, "demo-chapter", mode).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    info!(
        "extracted {} descriptions in {:?} using engines {:?}",
        result.descriptions.len(),
        result.processing_time,
        result.engines_used
    );
    for description in &result.descriptions {
        info!(
            "[{}] priority {:.1}, confidence {:.2}, pos {}: {}",
            description.description_type,
            description.priority_score,
            description.confidence_score,
            description.position_in_chapter,
            description.content
        );
    }
    for (metric, value) in &result.quality_metrics {
        info!("metric {} = {:.3}", metric, value);
    }
    for recommendation in &result.recommendations {
        info!("recommendation: {}", recommendation);
    }

    Ok(())
}
