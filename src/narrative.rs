//! Template-driven narrative summary.
//!
//! Clause order is fixed: opening, praised aspects, neutral perspective, concerns, closing
//! recommendation. Each clause after the opening is emitted only when its data exists.

use crate::review::Review;
use crate::stats::AggregateStats;
use crate::themes::ThemeMap;

pub const NO_REVIEWS_MESSAGE: &str = "No reviews found for analysis.";

/// Characters quoted from the neutral review before the ellipsis.
pub const NEUTRAL_EXCERPT_CHARS: usize = 150;

/// Overall reception, chosen from sentiment shares. First match wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reception {
    OverwhelminglyPositive,
    LargelyPositive,
    GenerallyPositive,
    GenerallyNegative,
    Mixed,
}

impl Reception {
    pub fn from_stats(stats: &AggregateStats) -> Self {
        if stats.positive_at_least(80) {
            Reception::OverwhelminglyPositive
        } else if stats.positive_at_least(70) {
            Reception::LargelyPositive
        } else if stats.positive_at_least(60) {
            Reception::GenerallyPositive
        } else if stats.negative_at_least(60) {
            Reception::GenerallyNegative
        } else {
            Reception::Mixed
        }
    }

    pub fn phrase(self) -> &'static str {
        match self {
            Reception::OverwhelminglyPositive => "overwhelmingly positive reviews",
            Reception::LargelyPositive => "largely positive reviews",
            Reception::GenerallyPositive => "generally positive reviews",
            Reception::GenerallyNegative => "generally negative reviews",
            Reception::Mixed => "mixed reviews",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recommendation {
    Strong,
    Cautious,
    ExploreAlternatives,
}

impl Recommendation {
    pub fn from_stats(mean_rating: f64, stats: &AggregateStats) -> Self {
        if mean_rating >= 4.0 && stats.positive_at_least(70) {
            Recommendation::Strong
        } else if mean_rating >= 3.5 && stats.positive_at_least(60) {
            Recommendation::Cautious
        } else {
            Recommendation::ExploreAlternatives
        }
    }
}

/// Builds the summary text. Never fails; an empty corpus yields [`NO_REVIEWS_MESSAGE`] alone.
///
/// `neutral_detailed` holds only neutral reviews that passed the detail threshold.
pub fn compose(
    stats: &AggregateStats,
    positive_themes: &ThemeMap,
    negative_themes: &ThemeMap,
    neutral_detailed: &[&Review],
    product_title: &str,
) -> String {
    let Some(mean_rating) = stats.mean_rating.filter(|_| !stats.is_empty()) else {
        return NO_REVIEWS_MESSAGE.to_string();
    };

    let mut summary = format!(
        "Based on a detailed analysis of {} customer reviews, the {} has received {} with an average rating of {:.1} out of 5 stars. ",
        stats.total_count,
        product_title,
        Reception::from_stats(stats).phrase(),
        mean_rating
    );

    if let Some(points) = theme_points(positive_themes) {
        summary.push_str("The standout features praised by customers include ");
        summary.push_str(&points);
        summary.push_str(". ");
    }

    if let Some(balanced) = first_longest(neutral_detailed.iter().copied(), |r| r.char_len()) {
        let excerpt: String = balanced.text().chars().take(NEUTRAL_EXCERPT_CHARS).collect();
        summary.push_str(&format!(
            "A balanced perspective from users notes that {}... ",
            excerpt
        ));
    }

    if let Some(points) = theme_points(negative_themes) {
        summary.push_str("However, some users have expressed concerns about ");
        summary.push_str(&points);
        summary.push_str(". ");
    }

    summary.push_str(&closing(Recommendation::from_stats(mean_rating, stats), positive_themes));
    summary
}

fn closing(recommendation: Recommendation, positive_themes: &ThemeMap) -> String {
    match recommendation {
        Recommendation::Strong => {
            let valued: Vec<&str> = positive_themes.aspects().take(2).map(|a| a.name()).collect();
            let mut text = String::from(
                "Given the substantial positive feedback and high average rating, this product comes highly recommended by the majority of users",
            );
            if !valued.is_empty() {
                text.push_str(", particularly for those valuing ");
                text.push_str(&valued.join(" and "));
            }
            text.push('.');
            text
        }
        Recommendation::Cautious => "While most users are satisfied with their purchase, potential buyers should weigh the praised aspects against the reported limitations to ensure it meets their specific needs.".to_string(),
        Recommendation::ExploreAlternatives => "Given the mixed feedback, potential buyers may want to explore other options or consider specific use cases before deciding.".to_string(),
    }
}

/// `the {aspect} ({longest example})` per aspect, joined as "a, b, and c".
fn theme_points(themes: &ThemeMap) -> Option<String> {
    let points: Vec<String> = themes
        .iter()
        .filter_map(|(aspect, examples)| {
            let example = first_longest(examples.iter(), |s| s.chars().count())?;
            Some(format!("the {} ({})", aspect, example))
        })
        .collect();

    match points.split_last() {
        None => None,
        Some((only, [])) => Some(only.clone()),
        Some((last, rest)) => Some(format!("{}, and {}", rest.join(", "), last)),
    }
}

/// Longest item by `len`; on ties the earliest one wins.
fn first_longest<T, I, F>(items: I, len: F) -> Option<T>
where
    I: IntoIterator<Item = T>,
    F: Fn(&T) -> usize,
{
    let mut best: Option<(usize, T)> = None;
    for item in items {
        let l = len(&item);
        if best.as_ref().map_or(true, |(b, _)| l > *b) {
            best = Some((l, item));
        }
    }
    best.map(|(_, item)| item)
}
