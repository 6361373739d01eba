use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::sentiment::{Sentiment, SentimentClassifier};

/// A review record as scraped from a listing page, before classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawReview {
    pub text: String,
    pub rating: f64,
}

impl RawReview {
    pub fn new(text: impl Into<String>, rating: f64) -> Self {
        Self { text: text.into(), rating }
    }
}

/// A classified review. The sentiment is always derived from the text, so the fields stay
/// private and there is no way to build one without a classifier.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Review {
    text: String,
    rating: f64,
    sentiment: Sentiment,
}

impl Review {
    pub fn classify(raw: RawReview, classifier: &SentimentClassifier) -> Self {
        let sentiment = classifier.classify(&raw.text);
        Self { text: raw.text, rating: raw.rating, sentiment }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn rating(&self) -> f64 {
        self.rating
    }

    pub fn sentiment(&self) -> Sentiment {
        self.sentiment
    }

    /// Length in characters, not bytes.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Reviews in page-then-in-page discovery order.
pub type ReviewCorpus = Vec<Review>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentiment_derived_from_text() {
        let classifier = SentimentClassifier::default();
        let review = Review::classify(RawReview::new("Excellent, works perfectly.", 5.0), &classifier);
        assert_eq!(review.sentiment(), Sentiment::Positive);
        assert_eq!(review.rating(), 5.0);
        assert_eq!(review.text(), "Excellent, works perfectly.");
    }

    #[test]
    fn test_char_len_counts_characters() {
        let classifier = SentimentClassifier::default();
        let review = Review::classify(RawReview::new("héllo wörld", 3.0), &classifier);
        assert_eq!(review.char_len(), 11);
    }
}
