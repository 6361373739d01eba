//! Corpus-level statistics.

use serde::Serialize;
use utoipa::ToSchema;

use crate::review::Review;
use crate::sentiment::Sentiment;

/// Counts and rating mean over a whole corpus.
///
/// Sentiment shares are kept as counts so that percentage thresholds compare exactly; the
/// `*_fraction` accessors are for presentation only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, ToSchema)]
pub struct AggregateStats {
    pub total_count: usize,
    pub positive_count: usize,
    pub neutral_count: usize,
    pub negative_count: usize,
    /// `None` for an empty corpus.
    pub mean_rating: Option<f64>,
}

impl AggregateStats {
    pub fn is_empty(&self) -> bool {
        self.total_count == 0
    }

    pub fn positive_fraction(&self) -> f64 {
        fraction(self.positive_count, self.total_count)
    }

    pub fn negative_fraction(&self) -> f64 {
        fraction(self.negative_count, self.total_count)
    }

    /// `positive_count / total_count >= percent / 100`, without floating point.
    pub fn positive_at_least(&self, percent: u32) -> bool {
        at_least(self.positive_count, self.total_count, percent)
    }

    pub fn negative_at_least(&self, percent: u32) -> bool {
        at_least(self.negative_count, self.total_count, percent)
    }
}

fn fraction(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

fn at_least(count: usize, total: usize, percent: u32) -> bool {
    total > 0 && (count as u128) * 100 >= (percent as u128) * (total as u128)
}

pub fn aggregate<'a, I>(reviews: I) -> AggregateStats
where
    I: IntoIterator<Item = &'a Review>,
{
    let mut stats = AggregateStats::default();
    let mut rating_sum = 0.0;
    for review in reviews {
        stats.total_count += 1;
        rating_sum += review.rating();
        match review.sentiment() {
            Sentiment::Positive => stats.positive_count += 1,
            Sentiment::Neutral => stats.neutral_count += 1,
            Sentiment::Negative => stats.negative_count += 1,
        }
    }
    if stats.total_count > 0 {
        stats.mean_rating = Some(rating_sum / stats.total_count as f64);
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::review::RawReview;
    use crate::sentiment::SentimentClassifier;

    fn corpus() -> Vec<Review> {
        let c = SentimentClassifier::default();
        [
            ("Excellent and reliable.", 5.0),
            ("Terrible, broke after a day.", 1.0),
            ("It arrived in a box.", 3.0),
            ("Great value, love it.", 4.5),
        ]
        .into_iter()
        .map(|(t, r)| Review::classify(RawReview::new(t, r), &c))
        .collect()
    }

    #[test]
    fn test_counts_and_mean() {
        let stats = aggregate(&corpus());
        assert_eq!(stats.total_count, 4);
        assert_eq!(stats.positive_count, 2);
        assert_eq!(stats.negative_count, 1);
        assert_eq!(stats.neutral_count, 1);
        assert_eq!(stats.mean_rating, Some(3.375));
        assert_eq!(stats.positive_fraction(), 0.5);
        assert_eq!(stats.negative_fraction(), 0.25);
    }

    #[test]
    fn test_order_independent() {
        let forward = corpus();
        let mut reversed = forward.clone();
        reversed.reverse();
        let mut rotated = forward.clone();
        rotated.rotate_left(1);
        assert_eq!(aggregate(&forward), aggregate(&reversed));
        assert_eq!(aggregate(&forward), aggregate(&rotated));
    }

    #[test]
    fn test_empty_corpus() {
        let stats = aggregate(&Vec::<Review>::new());
        assert!(stats.is_empty());
        assert_eq!(stats.mean_rating, None);
        assert_eq!(stats.positive_fraction(), 0.0);
        assert!(!stats.positive_at_least(0));
    }

    #[test]
    fn test_exact_percentage_thresholds() {
        let stats = AggregateStats {
            total_count: 10,
            positive_count: 7,
            neutral_count: 0,
            negative_count: 3,
            mean_rating: Some(4.0),
        };
        assert!(stats.positive_at_least(70));
        assert!(!stats.positive_at_least(71));
        assert!(stats.negative_at_least(30));

        let thirds = AggregateStats { total_count: 3, positive_count: 2, ..stats };
        assert!(thirds.positive_at_least(66));
        assert!(!thirds.positive_at_least(67));
    }
}
