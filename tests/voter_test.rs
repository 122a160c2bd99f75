use description_extractor::{
    Description, DescriptionType, EngineResult, EnsembleConfig, EnsembleVoter, Result,
};
use std::collections::HashMap;
use std::time::Duration;
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

fn ok(engine: &str, descriptions: Vec<Description>) -> EngineResult {
    EngineResult::success(engine, descriptions, Duration::from_millis(10))
}

fn failed(engine: &str) -> EngineResult {
    EngineResult::failure(engine, "model not loaded", Duration::from_millis(1))
}

fn equal_weights(names: &[&str]) -> HashMap<String, f64> {
    names.iter().map(|n| (n.to_string(), 1.0)).collect()
}

const SPAN_ONE: &str = "The castle rose above the valley, its towers lost in mist";
const SPAN_TWO: &str = "Elena stood at the gate, her cloak heavy with rain";
const SPAN_THREE: &str = "The air inside the hall was cold and utterly silent";

#[tokio::test]
async fn test_majority_agreement_passes_consensus() -> Result<()> {
    init_tracing();
    info!("Testing 2-of-3 agreement against the 0.6 threshold");

    let results = vec![
        ok("alpha", vec![span(DescriptionType::Location, SPAN_ONE, 100, 0.8)]),
        ok("beta", vec![span(DescriptionType::Location, SPAN_ONE, 110, 0.7)]),
        ok("gamma", vec![span(DescriptionType::Character, SPAN_TWO, 400, 0.9)]),
    ];

    let voter = EnsembleVoter::new(
        EnsembleConfig::default(),
        equal_weights(&["alpha", "beta", "gamma"]),
    );
    let outcome = voter.combine(&results);

    // 2/3 of the weight agrees on the location span (0.667 >= 0.6); the
    // character span carries 1/3 and is rejected
    assert_eq!(outcome.descriptions.len(), 1);
    assert_eq!(outcome.descriptions[0].description_type, DescriptionType::Location);
    assert_eq!(outcome.descriptions[0].content, SPAN_ONE);

    let consensus_rate = outcome.quality_metrics["consensus_rate"];
    info!("consensus rate: {:.3}", consensus_rate);
    assert!((consensus_rate - 0.5).abs() < 1e-9, "1 of 2 clusters accepted");

    Ok(())
}

#[tokio::test]
async fn test_minority_span_is_rejected() -> Result<()> {
    init_tracing();

    let results = vec![
        ok("alpha", vec![span(DescriptionType::Location, SPAN_ONE, 100, 0.8)]),
        ok("beta", Vec::new()),
        ok("gamma", Vec::new()),
    ];

    let voter = EnsembleVoter::new(
        EnsembleConfig::default(),
        equal_weights(&["alpha", "beta", "gamma"]),
    );
    let outcome = voter.combine(&results);

    // 1/3 of the weight is below the 0.6 threshold
    assert!(outcome.descriptions.is_empty());
    assert!(
        outcome
            .recommendations
            .iter()
            .any(|r| r.contains("consensus threshold")),
        "rejection should be explained in the recommendations"
    );

    Ok(())
}

#[tokio::test]
async fn test_failed_engine_excluded_from_denominator() -> Result<()> {
    init_tracing();
    info!("Testing that the consensus denominator only counts engines that ran");

    let results = vec![
        ok("alpha", vec![span(DescriptionType::Location, SPAN_ONE, 100, 0.8)]),
        ok("beta", vec![span(DescriptionType::Location, SPAN_ONE, 105, 0.75)]),
        failed("gamma"),
    ];

    let voter = EnsembleVoter::new(
        EnsembleConfig::default(),
        equal_weights(&["alpha", "beta", "gamma"]),
    );
    let outcome = voter.combine(&results);

    // 2 of 2 engines that ran agree: ratio 1.0, accepted. Under a naive
    // 3-engine denominator this would have been 0.667 - still accepted, but
    // the metrics must show full consensus over the engines that ran.
    assert_eq!(outcome.descriptions.len(), 1);
    assert!((outcome.quality_metrics["consensus_rate"] - 1.0).abs() < 1e-9);
    assert!((outcome.quality_metrics["engines_ran"] - 2.0).abs() < 1e-9);
    assert!((outcome.quality_metrics["engines_failed"] - 1.0).abs() < 1e-9);

    Ok(())
}

#[tokio::test]
async fn test_three_engine_scenario() -> Result<()> {
    init_tracing();
    info!("Testing the canonical A{{1,2}} B{{2,3}} C{{2}} scenario");

    let results = vec![
        ok(
            "alpha",
            vec![
                span(DescriptionType::Location, SPAN_ONE, 10, 0.8),
                span(DescriptionType::Character, SPAN_TWO, 250, 0.8),
            ],
        ),
        ok(
            "beta",
            vec![
                span(DescriptionType::Character, SPAN_TWO, 255, 0.7),
                span(DescriptionType::Atmosphere, SPAN_THREE, 700, 0.7),
            ],
        ),
        ok("gamma", vec![span(DescriptionType::Character, SPAN_TWO, 252, 0.6)]),
    ];

    let voter = EnsembleVoter::new(
        EnsembleConfig::default(),
        equal_weights(&["alpha", "beta", "gamma"]),
    );
    let outcome = voter.combine(&results);

    // Span 2 carries 3/3 of the weight; spans 1 and 3 carry 1/3 each and fail
    // the 0.6 threshold
    assert_eq!(outcome.descriptions.len(), 1);
    let elected = &outcome.descriptions[0];
    assert_eq!(elected.content, SPAN_TWO);

    // Equal weights: recomputed confidence is the plain average of 0.8, 0.7, 0.6
    let expected_confidence = (0.8 + 0.7 + 0.6) / 3.0;
    info!("elected confidence: {:.4}", elected.confidence_score);
    assert!((elected.confidence_score - expected_confidence).abs() < 1e-9);

    // Representative is the highest-confidence member (alpha's, position 250)
    assert_eq!(elected.position_in_chapter, 250);

    Ok(())
}

#[tokio::test]
async fn test_voting_is_deterministic() -> Result<()> {
    init_tracing();

    let results = vec![
        ok(
            "alpha",
            vec![
                span(DescriptionType::Location, SPAN_ONE, 10, 0.8),
                span(DescriptionType::Character, SPAN_TWO, 250, 0.9),
            ],
        ),
        ok(
            "beta",
            vec![
                span(DescriptionType::Location, SPAN_ONE, 15, 0.8),
                span(DescriptionType::Character, SPAN_TWO, 250, 0.85),
            ],
        ),
    ];

    let voter = EnsembleVoter::new(EnsembleConfig::default(), equal_weights(&["alpha", "beta"]));

    let first = voter.combine(&results);
    let second = voter.combine(&results);

    assert_eq!(first.descriptions, second.descriptions);
    assert_eq!(first.quality_metrics.len(), second.quality_metrics.len());
    for (metric, value) in &first.quality_metrics {
        assert!((value - second.quality_metrics[metric]).abs() < 1e-12);
    }

    Ok(())
}

#[tokio::test]
async fn test_weighted_voting_favors_precision_engines() -> Result<()> {
    init_tracing();

    let mut weights = HashMap::new();
    weights.insert("precise".to_string(), 1.2);
    weights.insert("baseline".to_string(), 1.0);
    weights.insert("noisy".to_string(), 0.8);

    let results = vec![
        ok("precise", vec![span(DescriptionType::Location, SPAN_ONE, 100, 0.9)]),
        ok("baseline", vec![span(DescriptionType::Location, SPAN_ONE, 102, 0.8)]),
        ok("noisy", vec![span(DescriptionType::Object, SPAN_THREE, 900, 0.95)]),
    ];

    let voter = EnsembleVoter::new(EnsembleConfig::default(), weights);
    let outcome = voter.combine(&results);

    // precise + baseline: 2.2 / 3.0 = 0.733 accepted; noisy alone: 0.267 rejected
    assert_eq!(outcome.descriptions.len(), 1);
    assert_eq!(outcome.descriptions[0].description_type, DescriptionType::Location);

    // Weighted average: (1.2 * 0.9 + 1.0 * 0.8) / 2.2
    let expected_confidence = (1.2 * 0.9 + 1.0 * 0.8) / 2.2;
    assert!((outcome.descriptions[0].confidence_score - expected_confidence).abs() < 1e-9);

    Ok(())
}

#[tokio::test]
async fn test_cluster_enrichment_unions_context_and_entities() -> Result<()> {
    init_tracing();

    let results = vec![
        ok(
            "alpha",
            vec![span(DescriptionType::Character, SPAN_TWO, 250, 0.9)
                .with_context("She had walked all night through the storm")
                .with_entities(vec!["Elena".to_string()])],
        ),
        ok(
            "beta",
            vec![span(DescriptionType::Character, SPAN_TWO, 252, 0.7)
                .with_context("The gate had not opened in years")
                .with_entities(vec!["Elena".to_string(), "Gate of Ashes".to_string()])],
        ),
    ];

    let voter = EnsembleVoter::new(EnsembleConfig::default(), equal_weights(&["alpha", "beta"]));
    let outcome = voter.combine(&results);

    assert_eq!(outcome.descriptions.len(), 1);
    let elected = &outcome.descriptions[0];

    let context = elected.context.as_deref().unwrap_or("");
    assert!(context.contains("walked all night"));
    assert!(context.contains("not opened in years"));

    assert_eq!(
        elected.entities_mentioned,
        vec!["Elena".to_string(), "Gate of Ashes".to_string()],
        "entities should be unioned and deduplicated in order"
    );

    Ok(())
}

#[tokio::test]
async fn test_single_engine_run_short_circuits_voting() -> Result<()> {
    init_tracing();

    let descriptions = vec![
        span(DescriptionType::Location, SPAN_ONE, 10, 0.62),
        span(DescriptionType::Atmosphere, SPAN_THREE, 700, 0.41),
    ];
    let results = vec![ok("alpha", descriptions.clone())];

    let voter = EnsembleVoter::new(EnsembleConfig::default(), equal_weights(&["alpha"]));
    let outcome = voter.combine(&results);

    assert_eq!(outcome.descriptions.len(), 2);
    for expected in &descriptions {
        let found = outcome
            .descriptions
            .iter()
            .find(|d| d.content == expected.content)
            .expect("description should pass through");
        assert!(
            (found.confidence_score - expected.confidence_score).abs() < 1e-12,
            "confidence must be unchanged on a single-engine run"
        );
    }

    Ok(())
}
