//! Aspect mining over review text.
//!
//! Detection is plain keyword containment on lower-cased text. The [`ThemeExtractor`] trait is
//! the seam for swapping in a richer detector; the narrative only consumes the resulting
//! [`ThemeMap`].

use serde::Serialize;
use std::fmt;
use utoipa::ToSchema;

use crate::review::Review;

/// A product-quality dimension that reviews are mined for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Aspect {
    Quality,
    Value,
    Performance,
    Features,
    Design,
    Usability,
    Reliability,
    Support,
}

impl Aspect {
    pub const ALL: [Aspect; 8] = [
        Aspect::Quality,
        Aspect::Value,
        Aspect::Performance,
        Aspect::Features,
        Aspect::Design,
        Aspect::Usability,
        Aspect::Reliability,
        Aspect::Support,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Aspect::Quality => "quality",
            Aspect::Value => "value",
            Aspect::Performance => "performance",
            Aspect::Features => "features",
            Aspect::Design => "design",
            Aspect::Usability => "usability",
            Aspect::Reliability => "reliability",
            Aspect::Support => "support",
        }
    }

    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Aspect::Quality => &["quality", "build", "material", "durability", "construction"],
            Aspect::Value => &["price", "value", "worth", "cost", "expensive", "cheap"],
            Aspect::Performance => &["performance", "speed", "fast", "slow", "efficient"],
            Aspect::Features => &["feature", "functionality", "options", "capabilities"],
            Aspect::Design => &["design", "look", "aesthetic", "style", "appearance"],
            Aspect::Usability => &["easy", "simple", "intuitive", "user-friendly", "difficult"],
            Aspect::Reliability => &["reliable", "consistent", "stable", "issues", "problems"],
            Aspect::Support => &["support", "customer service", "warranty", "help"],
        }
    }
}

impl fmt::Display for Aspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ThemeEntry {
    pub aspect: Aspect,
    pub examples: Vec<String>,
}

/// Aspect → example sentences, keeping aspects in the order they were first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ThemeMap {
    entries: Vec<ThemeEntry>,
}

impl ThemeMap {
    pub fn push(&mut self, aspect: Aspect, example: String) {
        match self.entries.iter_mut().find(|e| e.aspect == aspect) {
            Some(entry) => entry.examples.push(example),
            None => self.entries.push(ThemeEntry { aspect, examples: vec![example] }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, aspect: Aspect) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|e| e.aspect == aspect)
            .map(|e| e.examples.as_slice())
    }

    pub fn aspects(&self) -> impl Iterator<Item = Aspect> + '_ {
        self.entries.iter().map(|e| e.aspect)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Aspect, &[String])> + '_ {
        self.entries.iter().map(|e| (e.aspect, e.examples.as_slice()))
    }
}

pub trait ThemeExtractor: Send + Sync {
    fn extract(&self, reviews: &[&Review]) -> ThemeMap;
}

/// Keyword table driven extractor.
#[derive(Debug, Clone)]
pub struct KeywordThemeExtractor {
    table: Vec<(Aspect, Vec<String>)>,
}

impl KeywordThemeExtractor {
    pub fn new(table: Vec<(Aspect, Vec<String>)>) -> Self {
        let table = table
            .into_iter()
            .map(|(aspect, kws)| (aspect, kws.into_iter().map(|k| k.to_lowercase()).collect()))
            .collect();
        Self { table }
    }

    /// First `.`-separated segment of `lowered` that mentions one of `keywords`, trimmed.
    fn representative_sentence<'a>(lowered: &'a str, keywords: &[String]) -> Option<&'a str> {
        lowered
            .split('.')
            .filter(|s| keywords.iter().any(|k| s.contains(k.as_str())))
            .map(str::trim)
            .find(|s| !s.is_empty())
    }
}

impl Default for KeywordThemeExtractor {
    fn default() -> Self {
        Self::new(
            Aspect::ALL
                .iter()
                .map(|&a| (a, a.keywords().iter().map(|k| k.to_string()).collect()))
                .collect(),
        )
    }
}

impl ThemeExtractor for KeywordThemeExtractor {
    fn extract(&self, reviews: &[&Review]) -> ThemeMap {
        let mut themes = ThemeMap::default();
        for review in reviews {
            let lowered = review.text().to_lowercase();
            for (aspect, keywords) in &self.table {
                if !keywords.iter().any(|k| lowered.contains(k.as_str())) {
                    continue;
                }
                if let Some(sentence) = Self::representative_sentence(&lowered, keywords) {
                    themes.push(*aspect, sentence.to_string());
                }
            }
        }
        themes
    }
}
