//! Lightweight text profiling used by the adaptive strategy and the span
//! similarity measure used for clustering and deduplication.

use serde::{Deserialize, Serialize};

/// Structural profile of a chapter text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextProfile {
    pub char_count: usize,
    pub word_count: usize,
    pub sentence_count: usize,
    pub avg_sentence_words: f64,
    /// Fraction of sentences containing quoted speech.
    pub dialogue_density: f64,
    /// Estimated structural complexity in [0, 1].
    pub complexity: f64,
}

/// Sentences longer than this contribute no additional complexity.
const SENTENCE_LENGTH_CAP: f64 = 30.0;

/// Profile a text for adaptive routing. Complexity blends normalized mean
/// sentence length (60%) with dialogue density (40%).
pub fn profile_text(text: &str) -> TextProfile {
    let char_count = text.chars().count();
    let word_count = text.split_whitespace().count();

    let sentences: Vec<&str> = split_sentences(text);
    let sentence_count = sentences.len();

    let avg_sentence_words = if sentence_count > 0 {
        word_count as f64 / sentence_count as f64
    } else {
        0.0
    };

    let dialogue_sentences = sentences
        .iter()
        .filter(|s| s.contains('"') || s.contains('\u{201C}') || s.contains('\u{201D}'))
        .count();
    let dialogue_density = if sentence_count > 0 {
        dialogue_sentences as f64 / sentence_count as f64
    } else {
        0.0
    };

    let length_factor = (avg_sentence_words / SENTENCE_LENGTH_CAP).min(1.0);
    let complexity = (0.6 * length_factor + 0.4 * dialogue_density).clamp(0.0, 1.0);

    TextProfile {
        char_count,
        word_count,
        sentence_count,
        avg_sentence_words,
        dialogue_density,
        complexity,
    }
}

/// Split on sentence terminators, dropping empty fragments.
pub fn split_sentences(text: &str) -> Vec<&str> {
    text.split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Token-overlap ratio (Jaccard over lowercased alphanumeric tokens) between
/// two spans. 1.0 for identical token sets, 0.0 for disjoint ones.
pub fn token_overlap(a: &str, b: &str) -> f64 {
    let tokens_a = tokenize(a);
    let tokens_b = tokenize(b);

    if tokens_a.is_empty() && tokens_b.is_empty() {
        return 1.0;
    }
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let intersection = tokens_a.iter().filter(|t| tokens_b.contains(*t)).count();
    let union = tokens_a.len() + tokens_b.len() - intersection;

    intersection as f64 / union as f64
}

fn tokenize(text: &str) -> Vec<String> {
    let mut tokens: Vec<String> = text
        .to_lowercase()
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|w| !w.is_empty())
        .collect();
    tokens.sort();
    tokens.dedup();
    tokens
}
