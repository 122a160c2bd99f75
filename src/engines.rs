//! Development and test engines. Real NLP backends live outside this crate
//! and plug in through `ExtractionEngine`; these two exist so the demo binary
//! and the test suite have engines to drive.

use crate::traits::ExtractionEngine;
use crate::types::{Description, DescriptionType, ExtractorError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::debug;

const LOCATION_CUES: &[&str] = &[
    "room", "forest", "city", "castle", "house", "mountain", "valley", "street", "tower",
    "village", "hall", "garden", "bridge", "harbor",
];
const CHARACTER_CUES: &[&str] = &[
    "wore", "stood", "eyes", "hair", "face", "smiled", "frowned", "voice", "figure", "man",
    "woman", "girl", "boy",
];
const ATMOSPHERE_CUES: &[&str] = &[
    "dark", "cold", "silent", "mist", "shadow", "gloom", "warm", "quiet", "heavy", "still",
    "air",
];
const OBJECT_CUES: &[&str] = &[
    "sword", "table", "door", "book", "lantern", "cloak", "ring", "chair", "blade", "chest",
    "candle",
];
const ACTION_CUES: &[&str] = &[
    "ran", "leapt", "grabbed", "struck", "fought", "rode", "climbed", "fled", "threw",
    "charged", "crept",
];

/// Keyword-cue engine for development and demos.
///
/// Scans sentence by sentence, classifies on simple cue-word hits, and reports
/// a confidence proportional to how many cues matched. Crude on purpose - a
/// stand-in, not an NLP backend.
pub struct MockEngine {
    name: String,
    response_delay_ms: u64,
    available: AtomicBool,
}

impl MockEngine {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            response_delay_ms: 0,
            available: AtomicBool::new(true),
        }
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.response_delay_ms = delay_ms;
        self
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    async fn simulate_processing(&self) {
        if self.response_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.response_delay_ms)).await;
        }
    }

    fn classify(sentence: &str) -> Option<(DescriptionType, usize)> {
        let lowered = sentence.to_lowercase();
        let count = |cues: &[&str]| {
            cues.iter()
                .filter(|cue| lowered.split_whitespace().any(|w| w.trim_matches(|c: char| !c.is_alphanumeric()) == **cue))
                .count()
        };

        // Tie-breaks follow downstream usefulness: locations and characters first
        let scored = [
            (DescriptionType::Location, count(LOCATION_CUES)),
            (DescriptionType::Character, count(CHARACTER_CUES)),
            (DescriptionType::Atmosphere, count(ATMOSPHERE_CUES)),
            (DescriptionType::Object, count(OBJECT_CUES)),
            (DescriptionType::Action, count(ACTION_CUES)),
        ];

        // max_by_key keeps the last maximum, so reverse to let the earlier
        // (higher-priority) category win ties
        scored
            .into_iter()
            .rev()
            .filter(|(_, hits)| *hits > 0)
            .max_by_key(|(_, hits)| *hits)
    }

    fn capitalized_entities(sentence: &str) -> Vec<String> {
        let mut entities: Vec<String> = Vec::new();
        for word in sentence.split_whitespace().skip(1) {
            let clean = word.trim_matches(|c: char| !c.is_alphabetic());
            if clean.len() > 2
                && clean.chars().next().is_some_and(|c| c.is_uppercase())
                && !entities.iter().any(|e| e == clean)
            {
                entities.push(clean.to_string());
            }
        }
        entities.truncate(10);
        entities
    }
}

#[async_trait]
impl ExtractionEngine for MockEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn extract(&self, text: &str, chapter_id: &str) -> Result<Vec<Description>> {
        self.simulate_processing().await;

        let mut descriptions = Vec::new();
        let mut start = 0usize;

        let handle_sentence = |raw: &str, offset: usize, out: &mut Vec<Description>| {
            let leading = raw.len() - raw.trim_start().len();
            let sentence = raw.trim();
            if sentence.is_empty() {
                return;
            }
            if let Some((description_type, hits)) = Self::classify(sentence) {
                let confidence = (0.4 + 0.15 * hits as f64).min(0.95);
                out.push(
                    Description::new(description_type, sentence, offset + leading, confidence)
                        .with_entities(Self::capitalized_entities(sentence))
                        .with_priority(confidence * 100.0),
                );
            }
        };

        for (i, c) in text.char_indices() {
            if matches!(c, '.' | '!' | '?') {
                handle_sentence(&text[start..i], start, &mut descriptions);
                start = i + c.len_utf8();
            }
        }
        handle_sentence(&text[start..], start, &mut descriptions);

        debug!(
            "mock engine '{}' extracted {} descriptions from chapter {}",
            self.name,
            descriptions.len(),
            chapter_id
        );
        Ok(descriptions)
    }
}

/// Test engine that returns a preset description list verbatim, optionally
/// after a delay, or fails with a preset error. The test suite uses it to
/// stage exact consensus and failure scenarios.
pub struct ScriptedEngine {
    name: String,
    descriptions: Vec<Description>,
    response_delay_ms: u64,
    fail_with: Option<String>,
    available: AtomicBool,
}

impl ScriptedEngine {
    pub fn new(name: impl Into<String>, descriptions: Vec<Description>) -> Self {
        Self {
            name: name.into(),
            descriptions,
            response_delay_ms: 0,
            fail_with: None,
            available: AtomicBool::new(true),
        }
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.response_delay_ms = delay_ms;
        self
    }

    pub fn failing_with(mut self, message: impl Into<String>) -> Self {
        self.fail_with = Some(message.into());
        self
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }
}

#[async_trait]
impl ExtractionEngine for ScriptedEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn extract(&self, _text: &str, _chapter_id: &str) -> Result<Vec<Description>> {
        if self.response_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.response_delay_ms)).await;
        }
        match &self.fail_with {
            Some(message) => Err(ExtractorError::EngineFailed {
                name: self.name.clone(),
                message: message.clone(),
            }),
            None => Ok(self.descriptions.clone()),
        }
    }
}
