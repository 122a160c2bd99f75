use description_extractor::{
    merge_descriptions, Description, DescriptionType, EngineConfig, EngineResult, ExtractorError,
    InMemorySettings, MockEngine, Orchestrator, ProcessingMode, Result, ScriptedEngine,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .try_init();
}

fn span(
    description_type: DescriptionType,
    content: &str,
    position: usize,
    confidence: f64,
) -> Description {
    Description::new(description_type, content, position, confidence)
}

const SPAN_ONE: &str = "The castle rose above the valley, its towers lost in mist";
const SPAN_TWO: &str = "Elena stood at the gate, her cloak heavy with rain";
const SPAN_THREE: &str = "The air inside the hall was cold and utterly silent";

#[tokio::test]
async fn test_merge_is_idempotent() -> Result<()> {
    init_tracing();
    info!("Testing that the parallel merge never accumulates duplicates");

    let results = vec![
        EngineResult::success(
            "alpha",
            vec![
                span(DescriptionType::Location, SPAN_ONE, 10, 0.8),
                span(DescriptionType::Character, SPAN_TWO, 250, 0.7),
            ],
            Duration::from_millis(5),
        ),
        EngineResult::success(
            "beta",
            vec![
                span(DescriptionType::Location, SPAN_ONE, 12, 0.9),
                span(DescriptionType::Atmosphere, SPAN_THREE, 700, 0.6),
            ],
            Duration::from_millis(5),
        ),
    ];

    let merged_once = merge_descriptions(&results, 40, 0.5);
    let merged_twice = merge_descriptions(&results, 40, 0.5);
    assert_eq!(merged_once, merged_twice, "same inputs must merge identically");

    // Feeding an already merged set back in alongside the originals must not
    // grow the result either
    let mut with_merged = results.clone();
    with_merged.push(EngineResult::success(
        "merged",
        merged_once.clone(),
        Duration::from_millis(1),
    ));
    let remerged = merge_descriptions(&with_merged, 40, 0.5);
    assert_eq!(remerged.len(), merged_once.len());

    // The overlapping location span keeps the higher-confidence copy
    assert_eq!(merged_once.len(), 3);
    let location = merged_once
        .iter()
        .find(|d| d.description_type == DescriptionType::Location)
        .expect("location span survives the merge");
    assert!((location.confidence_score - 0.9).abs() < 1e-12);

    Ok(())
}

#[tokio::test]
async fn test_parallel_tolerates_partial_failure() -> Result<()> {
    init_tracing();

    let orchestrator = Orchestrator::builder()
        .with_engine(Arc::new(ScriptedEngine::new(
            "healthy",
            vec![span(DescriptionType::Location, SPAN_ONE, 10, 0.8)],
        )))
        .with_engine(Arc::new(
            ScriptedEngine::new("broken", Vec::new()).failing_with("model crashed"),
        ))
        .build()?;

    let result = orchestrator
        .extract(SPAN_ONE, "ch-1", ProcessingMode::Parallel)
        .await?;

    assert_eq!(result.engines_used, vec!["healthy".to_string()]);
    assert_eq!(result.descriptions.len(), 1);
    assert!(
        result.recommendations.iter().any(|r| r.contains("failed")),
        "partial failure should surface as a recommendation"
    );

    Ok(())
}

#[tokio::test]
async fn test_all_engines_failed_is_a_typed_error() -> Result<()> {
    init_tracing();

    for mode in [
        ProcessingMode::Parallel,
        ProcessingMode::Sequential,
        ProcessingMode::Ensemble,
    ] {
        let orchestrator = Orchestrator::builder()
            .with_engine(Arc::new(
                ScriptedEngine::new("broken-1", Vec::new()).failing_with("crash"),
            ))
            .with_engine(Arc::new(
                ScriptedEngine::new("broken-2", Vec::new()).failing_with("crash"),
            ))
            .build()?;

        let err = orchestrator
            .extract(SPAN_ONE, "ch-1", mode)
            .await
            .expect_err("every engine failing must not look like success");
        info!("{} mode error: {}", mode, err);
        assert!(matches!(
            err,
            ExtractorError::AllEnginesFailed { attempted: 2 }
        ));
    }

    Ok(())
}

#[tokio::test]
async fn test_slow_engine_does_not_stall_the_batch() -> Result<()> {
    init_tracing();
    info!("Testing timeout isolation with one stalled engine");

    let slow_config = EngineConfig {
        timeout: Duration::from_millis(200),
        ..EngineConfig::default()
    };

    let orchestrator = Orchestrator::builder()
        .with_engine(Arc::new(ScriptedEngine::new(
            "fast-1",
            vec![span(DescriptionType::Location, SPAN_ONE, 10, 0.8)],
        )))
        .with_engine(Arc::new(ScriptedEngine::new(
            "fast-2",
            vec![span(DescriptionType::Character, SPAN_TWO, 250, 0.7)],
        )))
        .with_engine_config(
            Arc::new(
                ScriptedEngine::new(
                    "stalled",
                    vec![span(DescriptionType::Object, SPAN_THREE, 700, 0.9)],
                )
                .with_delay(2_000),
            ),
            slow_config,
        )
        .build()?;

    let started = Instant::now();
    let result = orchestrator
        .extract(SPAN_ONE, "ch-1", ProcessingMode::Parallel)
        .await?;
    let elapsed = started.elapsed();

    info!("parallel call finished in {:?}", elapsed);
    assert!(
        elapsed < Duration::from_millis(1_000),
        "one stalled engine must not delay the call past its own timeout"
    );
    assert_eq!(result.engines_used.len(), 2);
    assert!(!result.engines_used.contains(&"stalled".to_string()));

    Ok(())
}

#[tokio::test]
async fn test_sequential_accumulates_in_registration_order() -> Result<()> {
    init_tracing();

    let orchestrator = Orchestrator::builder()
        .with_engine(Arc::new(ScriptedEngine::new(
            "first",
            vec![span(DescriptionType::Location, SPAN_ONE, 10, 0.8)],
        )))
        .with_engine(Arc::new(ScriptedEngine::new(
            "second",
            vec![span(DescriptionType::Atmosphere, SPAN_THREE, 700, 0.6)],
        )))
        .build()?;

    let result = orchestrator
        .extract(SPAN_ONE, "ch-1", ProcessingMode::Sequential)
        .await?;

    assert_eq!(
        result.engines_used,
        vec!["first".to_string(), "second".to_string()]
    );
    assert_eq!(result.descriptions.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_single_prefers_the_configured_default_engine() -> Result<()> {
    init_tracing();

    let settings = Arc::new(InMemorySettings::new());
    settings.set("orchestrator.default_engine", "preferred");

    let orchestrator = Orchestrator::builder()
        .with_engine(Arc::new(ScriptedEngine::new(
            "other",
            vec![span(DescriptionType::Location, SPAN_ONE, 10, 0.8)],
        )))
        .with_engine(Arc::new(ScriptedEngine::new(
            "preferred",
            vec![span(DescriptionType::Character, SPAN_TWO, 250, 0.7)],
        )))
        .with_settings(settings)
        .build()?;

    let result = orchestrator
        .extract(SPAN_ONE, "ch-1", ProcessingMode::Single)
        .await?;

    assert_eq!(result.engines_used, vec!["preferred".to_string()]);
    assert_eq!(result.descriptions.len(), 1);
    assert_eq!(result.descriptions[0].content, SPAN_TWO);

    Ok(())
}

#[tokio::test]
async fn test_single_without_fallback_fails_when_default_is_down() -> Result<()> {
    init_tracing();

    let settings = Arc::new(InMemorySettings::new());
    settings.set("orchestrator.default_engine", "preferred");
    settings.set("orchestrator.single_fallback", false);

    let preferred = Arc::new(ScriptedEngine::new(
        "preferred",
        vec![span(DescriptionType::Character, SPAN_TWO, 250, 0.7)],
    ));
    preferred.set_available(false);

    let orchestrator = Orchestrator::builder()
        .with_engine(Arc::new(ScriptedEngine::new(
            "other",
            vec![span(DescriptionType::Location, SPAN_ONE, 10, 0.8)],
        )))
        .with_engine(preferred)
        .with_settings(settings)
        .build()?;

    let err = orchestrator
        .extract(SPAN_ONE, "ch-1", ProcessingMode::Single)
        .await
        .expect_err("default engine down and fallback disabled");
    assert!(matches!(err, ExtractorError::EngineUnavailable { name } if name == "preferred"));

    Ok(())
}

#[tokio::test]
async fn test_adaptive_routes_long_text_to_ensemble() -> Result<()> {
    init_tracing();

    let orchestrator = Orchestrator::builder()
        .with_engine(Arc::new(MockEngine::new("cue-a")))
        .with_engine(Arc::new(MockEngine::new("cue-b")))
        .build()?;

    // Well past the 6,000-char default long-text threshold
    let long_text = "The castle rose above the valley, dark and silent. ".repeat(150);
    let result = orchestrator
        .extract(&long_text, "ch-1", ProcessingMode::Adaptive)
        .await?;

    assert!(
        result.quality_metrics.contains_key("consensus_rate"),
        "long text should route to ensemble voting"
    );
    assert!(result.quality_metrics.contains_key("text_complexity"));

    // Short, plain text stays off the ensemble path
    let short = orchestrator
        .extract("A quiet room. A small candle.", "ch-2", ProcessingMode::Adaptive)
        .await?;
    assert!(!short.quality_metrics.contains_key("consensus_rate"));

    Ok(())
}
