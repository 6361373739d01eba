//! Lexicon-based sentiment scoring for review text.
//!
//! The classifier only relies on a polarity value in `[-1.0, 1.0]`; the scorer behind it is a
//! trait object, so a statistical model can replace [`LexiconScorer`] without touching the rest
//! of the pipeline.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use utoipa::ToSchema;

/// Polarity above this is Positive, below its negation is Negative.
pub const POLARITY_THRESHOLD: f64 = 0.1;

// Word polarities in [-1, 1]. Aspect nouns ("quality", "price", ...) are absent so
// that mentioning an aspect does not by itself tilt a review.
static LEXICON: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    [
        ("good", 0.7), ("great", 0.8), ("excellent", 1.0), ("amazing", 0.6), ("wonderful", 1.0),
        ("fantastic", 0.4), ("superb", 1.0), ("outstanding", 0.5), ("brilliant", 0.9),
        ("love", 0.5), ("loved", 0.7), ("loves", 0.5), ("best", 1.0), ("better", 0.5),
        ("happy", 0.8), ("beautiful", 0.85), ("perfect", 1.0), ("perfectly", 1.0),
        ("awesome", 1.0), ("incredible", 0.9), ("delightful", 1.0), ("pleasant", 0.73),
        ("satisfied", 0.5), ("recommend", 0.4), ("recommended", 0.4), ("impressive", 1.0),
        ("impressed", 0.7), ("exceptional", 0.67), ("remarkable", 0.75), ("solid", 0.4),
        ("sturdy", 0.5), ("nice", 0.6), ("comfortable", 0.4), ("helpful", 0.5),
        ("reliable", 0.5), ("works", 0.2), ("worked", 0.2), ("fine", 0.4), ("glad", 0.5),
        ("favorite", 0.5), ("pleased", 0.5), ("well", 0.3), ("enjoy", 0.4), ("enjoyed", 0.4),
        ("bad", -0.7), ("terrible", -1.0), ("awful", -1.0), ("horrible", -1.0),
        ("poor", -0.4), ("worst", -1.0), ("worse", -0.4), ("hate", -0.8), ("hated", -0.9),
        ("dislike", -0.6), ("disappointing", -0.6), ("disappointed", -0.75),
        ("failure", -0.3), ("failed", -0.5), ("fails", -0.5), ("sad", -0.5),
        ("unhappy", -0.6), ("angry", -0.5), ("annoying", -0.8), ("annoyed", -0.5),
        ("frustrated", -0.7), ("frustrating", -0.7), ("broken", -0.4), ("broke", -0.5),
        ("useless", -0.5), ("waste", -0.2), ("wasted", -0.2), ("scam", -0.6), ("fake", -0.5),
        ("unreliable", -0.5), ("unstable", -0.3), ("flimsy", -0.5), ("cheaply", -0.3),
        ("defective", -0.6), ("mediocre", -0.5), ("pathetic", -1.0), ("garbage", -0.8),
        ("junk", -0.8), ("refund", -0.2), ("returned", -0.2), ("wrong", -0.5),
        ("stopped", -0.3), ("died", -0.5), ("faulty", -0.6), ("overpriced", -0.6),
    ]
    .into_iter()
    .collect()
});

static NEGATORS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "not", "no", "never", "nothing", "hardly", "cannot", "don't", "doesn't", "didn't",
        "isn't", "wasn't", "aren't", "won't", "can't", "couldn't", "wouldn't", "shouldn't",
    ]
    .into_iter()
    .collect()
});

static INTENSIFIERS: Lazy<HashMap<&'static str, f64>> = Lazy::new(|| {
    [
        ("very", 1.3), ("really", 1.3), ("extremely", 1.5), ("super", 1.3), ("so", 1.2),
        ("absolutely", 1.5), ("quite", 1.1), ("totally", 1.3),
    ]
    .into_iter()
    .collect()
});

/// Sentiment label of a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    /// Applies the fixed polarity thresholds. Exactly `±0.1` is Neutral.
    pub fn from_polarity(polarity: f64) -> Self {
        if polarity > POLARITY_THRESHOLD {
            Sentiment::Positive
        } else if polarity < -POLARITY_THRESHOLD {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Sentiment::Positive => "Positive",
            Sentiment::Neutral => "Neutral",
            Sentiment::Negative => "Negative",
        };
        f.write_str(label)
    }
}

/// Produces a polarity score in `[-1.0, 1.0]` for a piece of text.
pub trait PolarityScorer: Send + Sync {
    fn polarity(&self, text: &str) -> f64;
}

/// Averages the polarity of lexicon words, flipping and damping negated words and scaling words
/// preceded by an intensifier.
#[derive(Debug, Default, Clone, Copy)]
pub struct LexiconScorer;

impl PolarityScorer for LexiconScorer {
    fn polarity(&self, text: &str) -> f64 {
        let lowercase_text = text.to_lowercase();
        let words: Vec<&str> = lowercase_text
            .split(|c: char| !(c.is_alphabetic() || c == '\''))
            .map(|w| w.trim_matches('\''))
            .filter(|w| !w.is_empty())
            .collect();

        let mut total = 0.0;
        let mut hits = 0usize;
        for (i, word) in words.iter().enumerate() {
            let Some(&base) = LEXICON.get(word) else {
                continue;
            };
            let mut score = base;
            if let Some(factor) = i.checked_sub(1).and_then(|p| INTENSIFIERS.get(words[p])) {
                score *= factor;
            }
            // A negator one or two words back ("not good", "not very good").
            let negated = words[i.saturating_sub(2)..i].iter().any(|w| NEGATORS.contains(w));
            if negated {
                score *= -0.5;
            }
            total += score.clamp(-1.0, 1.0);
            hits += 1;
        }

        if hits == 0 {
            return 0.0;
        }
        (total / hits as f64).clamp(-1.0, 1.0)
    }
}

/// Maps review text to a [`Sentiment`] through a pluggable [`PolarityScorer`].
#[derive(Clone)]
pub struct SentimentClassifier {
    scorer: Arc<dyn PolarityScorer>,
}

impl SentimentClassifier {
    pub fn new(scorer: Arc<dyn PolarityScorer>) -> Self {
        Self { scorer }
    }

    /// Scorer output is clamped into range and NaN counts as neutral.
    pub fn polarity(&self, text: &str) -> f64 {
        let p = self.scorer.polarity(text);
        if p.is_nan() {
            0.0
        } else {
            p.clamp(-1.0, 1.0)
        }
    }

    pub fn classify(&self, text: &str) -> Sentiment {
        Sentiment::from_polarity(self.polarity(text))
    }
}

impl Default for SentimentClassifier {
    fn default() -> Self {
        Self::new(Arc::new(LexiconScorer))
    }
}

impl fmt::Debug for SentimentClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SentimentClassifier").finish_non_exhaustive()
    }
}
