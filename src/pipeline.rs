//! Analysis orchestration: fetch review pages, classify, aggregate, extract themes, compose.
//!
//! One [`Analyzer`] is shared by all requests. Each call to [`Analyzer::analyze`] opens its own
//! fetch session and owns its corpus, so concurrent analyses never observe each other.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, info_span, warn, Instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::Config;
use crate::crawler::{polite_pause, FetchSession, PageOutcome, ReviewSource};
use crate::error::{AnalysisError, FetchError};
use crate::narrative::compose;
use crate::product::ProductRef;
use crate::review::{Review, ReviewCorpus};
use crate::sentiment::{Sentiment, SentimentClassifier};
use crate::stats::{aggregate, AggregateStats};
use crate::themes::{KeywordThemeExtractor, ThemeExtractor, ThemeMap};

/// Title used when the product page cannot be read.
pub const FALLBACK_TITLE: &str = "Product";

/// Sessions keep each call within the configured timeout; the orchestrator abandons a call only
/// after this many times that timeout.
const GUARD_FACTOR: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyzerSettings {
    pub max_pages: u32,
    pub page_timeout: Duration,
    pub title_timeout: Duration,
    /// Wall-clock budget for fetching all pages of one request.
    pub deadline: Duration,
    /// Upper bound of the random pause before each page after the first.
    pub page_delay: Duration,
    pub detail_min_chars: usize,
}

impl From<&Config> for AnalyzerSettings {
    fn from(config: &Config) -> Self {
        Self {
            max_pages: config.max_pages,
            page_timeout: config.page_timeout,
            title_timeout: config.title_timeout,
            deadline: config.analysis_deadline,
            page_delay: config.page_delay,
            detail_min_chars: config.detail_min_chars,
        }
    }
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// Why page fetching ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The listing ran out of reviews.
    Exhausted,
    /// `max_pages` pages were fetched.
    PageLimit,
    DeadlineElapsed,
    /// A page could not be fetched; earlier pages are kept.
    PageFailed { page: u32, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FetchSummary {
    pub pages_fetched: u32,
    pub reviews_collected: usize,
    pub reviews_skipped: usize,
    pub stop: StopReason,
}

/// Everything one analysis produced. `summary` is the same text `/analyze` returns.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AnalysisReport {
    #[schema(value_type = String)]
    pub request_id: Uuid,
    pub product: ProductRef,
    pub title: String,
    pub stats: AggregateStats,
    #[schema(value_type = Vec<crate::themes::ThemeEntry>)]
    pub positive_themes: ThemeMap,
    #[schema(value_type = Vec<crate::themes::ThemeEntry>)]
    pub negative_themes: ThemeMap,
    pub fetch: FetchSummary,
    pub summary: String,
    #[schema(value_type = String)]
    pub analyzed_at: DateTime<Utc>,
}

/// Output of [`summarize`], the pure half of the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub stats: AggregateStats,
    pub positive_themes: ThemeMap,
    pub negative_themes: ThemeMap,
    pub text: String,
}

/// Aggregates the whole corpus and mines themes from the detailed reviews only.
pub fn summarize(
    corpus: &[Review],
    product_title: &str,
    detail_min_chars: usize,
    themes: &dyn ThemeExtractor,
) -> Summary {
    let stats = aggregate(corpus);

    let mut positive = Vec::new();
    let mut negative = Vec::new();
    let mut neutral = Vec::new();
    for review in corpus.iter().filter(|r| r.char_len() > detail_min_chars) {
        match review.sentiment() {
            Sentiment::Positive => positive.push(review),
            Sentiment::Negative => negative.push(review),
            Sentiment::Neutral => neutral.push(review),
        }
    }

    let positive_themes = themes.extract(&positive);
    let negative_themes = themes.extract(&negative);
    let text = compose(&stats, &positive_themes, &negative_themes, &neutral, product_title);

    Summary { stats, positive_themes, negative_themes, text }
}

struct Collected {
    corpus: ReviewCorpus,
    fetch: FetchSummary,
}

pub struct Analyzer {
    source: Arc<dyn ReviewSource>,
    classifier: SentimentClassifier,
    themes: Arc<dyn ThemeExtractor>,
    settings: AnalyzerSettings,
}

impl Analyzer {
    pub fn new(source: Arc<dyn ReviewSource>, settings: AnalyzerSettings) -> Self {
        Self {
            source,
            classifier: SentimentClassifier::default(),
            themes: Arc::new(KeywordThemeExtractor::default()),
            settings,
        }
    }

    pub fn with_classifier(mut self, classifier: SentimentClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_theme_extractor(mut self, themes: Arc<dyn ThemeExtractor>) -> Self {
        self.themes = themes;
        self
    }

    pub fn settings(&self) -> &AnalyzerSettings {
        &self.settings
    }

    /// Runs the pipeline and returns only the summary text.
    pub async fn analyze_summary(&self, product_url: &str) -> Result<String, AnalysisError> {
        Ok(self.analyze(product_url).await?.summary)
    }

    pub async fn analyze(&self, product_url: &str) -> Result<AnalysisReport, AnalysisError> {
        let product = ProductRef::parse(product_url)?;
        let request_id = Uuid::new_v4();
        let span = info_span!("analysis", %request_id, asin = %product.asin);
        self.run(product_url, product, request_id).instrument(span).await
    }

    async fn run(
        &self,
        product_url: &str,
        product: ProductRef,
        request_id: Uuid,
    ) -> Result<AnalysisReport, AnalysisError> {
        info!(domain = %product.domain, "🚀 starting review analysis");
        let deadline = Instant::now() + self.settings.deadline;

        let mut session = self
            .source
            .open_session()
            .await
            .map_err(AnalysisError::SourceUnavailable)?;

        let listing_url = product.review_listing_url();
        let Collected { corpus, fetch } = self.collect(session.as_mut(), &listing_url, deadline).await?;
        info!(
            pages = fetch.pages_fetched,
            reviews = fetch.reviews_collected,
            skipped = fetch.reviews_skipped,
            stop = ?fetch.stop,
            "fetching finished"
        );

        let title = if corpus.is_empty() {
            FALLBACK_TITLE.to_string()
        } else {
            self.resolve_title(session.as_mut(), product_url).await
        };
        drop(session);

        let summary = summarize(&corpus, &title, self.settings.detail_min_chars, self.themes.as_ref());
        info!(total = summary.stats.total_count, "✅ analysis complete");

        Ok(AnalysisReport {
            request_id,
            product,
            title,
            stats: summary.stats,
            positive_themes: summary.positive_themes,
            negative_themes: summary.negative_themes,
            fetch,
            summary: summary.text,
            analyzed_at: Utc::now(),
        })
    }

    /// Fetches pages in order until the listing ends, a limit is hit, or a page fails.
    ///
    /// Only an unrecoverable failure on the first page is returned as an error.
    async fn collect(
        &self,
        session: &mut dyn FetchSession,
        listing_url: &str,
        deadline: Instant,
    ) -> Result<Collected, AnalysisError> {
        let mut corpus = ReviewCorpus::new();
        let mut pages_fetched = 0;
        let mut reviews_skipped = 0;
        let mut stop = StopReason::PageLimit;

        let guard = self.settings.page_timeout * GUARD_FACTOR;
        for page in 1..=self.settings.max_pages {
            if page > 1 {
                polite_pause(self.settings.page_delay).await;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                stop = StopReason::DeadlineElapsed;
                break;
            }
            let budget = guard.min(remaining);

            let result = match timeout(budget, session.fetch_page(listing_url, page)).await {
                Ok(result) => result,
                Err(_) if budget < guard => {
                    stop = StopReason::DeadlineElapsed;
                    break;
                }
                Err(_) => Err(FetchError::Timeout { page }),
            };

            match result {
                Ok(PageOutcome::Exhausted) => {
                    debug!(page, "no more reviews");
                    stop = StopReason::Exhausted;
                    break;
                }
                Ok(PageOutcome::Reviews(parsed)) => {
                    pages_fetched += 1;
                    reviews_skipped += parsed.skipped;
                    debug!(page, reviews = parsed.reviews.len(), skipped = parsed.skipped, "page fetched");
                    corpus.extend(
                        parsed
                            .reviews
                            .into_iter()
                            .map(|raw| Review::classify(raw, &self.classifier)),
                    );
                }
                Err(e) if page == 1 && e.is_unrecoverable() => {
                    warn!(error = %e, "review source unavailable");
                    return Err(AnalysisError::SourceUnavailable(e));
                }
                Err(e) => {
                    warn!(page, error = %e, "⚠️ page fetch failed, keeping earlier pages");
                    stop = StopReason::PageFailed { page, reason: e.to_string() };
                    break;
                }
            }
        }

        let fetch = FetchSummary {
            pages_fetched,
            reviews_collected: corpus.len(),
            reviews_skipped,
            stop,
        };
        Ok(Collected { corpus, fetch })
    }

    async fn resolve_title(&self, session: &mut dyn FetchSession, product_url: &str) -> String {
        let guard = self.settings.title_timeout * GUARD_FACTOR;
        match timeout(guard, session.resolve_title(product_url)).await {
            Ok(Ok(title)) if !title.trim().is_empty() => title.trim().to_string(),
            Ok(Ok(_)) => {
                warn!("empty product title, using fallback");
                FALLBACK_TITLE.to_string()
            }
            Ok(Err(e)) => {
                warn!(error = %e, "title lookup failed, using fallback");
                FALLBACK_TITLE.to_string()
            }
            Err(_) => {
                warn!("title lookup timed out, using fallback");
                FALLBACK_TITLE.to_string()
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory review source for orchestrator and HTTP tests.

    use super::*;
    use crate::review::RawReview;
    use crate::review_page::ParsedPage;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone)]
    pub enum Step {
        Reviews(Vec<(&'static str, f64)>),
        End,
        Blocked,
        Broken,
        /// The inner step, delivered after more than the page timeout.
        Slow(Box<Step>),
        Hang,
    }

    pub struct ScriptedSource {
        steps: Vec<Step>,
        /// Served for every page past the end of `steps`.
        repeat: Option<Step>,
        title: Option<&'static str>,
        fail_open: bool,
        pub opened: AtomicUsize,
        pub title_calls: Arc<AtomicUsize>,
    }

    impl ScriptedSource {
        pub fn new(steps: Vec<Step>) -> Self {
            Self {
                steps,
                repeat: None,
                title: Some("Acme Kettle"),
                fail_open: false,
                opened: AtomicUsize::new(0),
                title_calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub fn repeating(mut self, step: Step) -> Self {
            self.repeat = Some(step);
            self
        }

        pub fn without_title(mut self) -> Self {
            self.title = None;
            self
        }

        pub fn failing_to_open(mut self) -> Self {
            self.fail_open = true;
            self
        }
    }

    #[async_trait]
    impl ReviewSource for ScriptedSource {
        async fn open_session(&self) -> Result<Box<dyn FetchSession>, FetchError> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            if self.fail_open {
                return Err(FetchError::Launch("chrome not found".to_string()));
            }
            Ok(Box::new(ScriptedSession {
                steps: self.steps.clone(),
                repeat: self.repeat.clone(),
                title: self.title,
                title_calls: self.title_calls.clone(),
            }))
        }
    }

    struct ScriptedSession {
        steps: Vec<Step>,
        repeat: Option<Step>,
        title: Option<&'static str>,
        title_calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl FetchSession for ScriptedSession {
        async fn fetch_page(&mut self, listing_url: &str, page: u32) -> Result<PageOutcome, FetchError> {
            let step = self
                .steps
                .get(page as usize - 1)
                .or(self.repeat.as_ref())
                .cloned()
                .unwrap_or(Step::End);
            let step = match step {
                Step::Slow(inner) => {
                    tokio::time::sleep(SLOW_STEP).await;
                    *inner
                }
                other => other,
            };
            match step {
                Step::Reviews(reviews) => Ok(PageOutcome::Reviews(ParsedPage {
                    reviews: reviews.into_iter().map(|(t, r)| RawReview::new(t, r)).collect(),
                    skipped: 1,
                })),
                Step::End => Ok(PageOutcome::Exhausted),
                Step::Blocked => Err(FetchError::Blocked("captcha challenge".to_string())),
                Step::Broken => Err(FetchError::Navigation {
                    url: listing_url.to_string(),
                    reason: "net::ERR_ABORTED".to_string(),
                }),
                Step::Slow(_) => unreachable!("nested slow step"),
                Step::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(PageOutcome::Exhausted)
                }
            }
        }

        async fn resolve_title(&mut self, product_url: &str) -> Result<String, FetchError> {
            self.title_calls.fetch_add(1, Ordering::SeqCst);
            self.title.map(str::to_string).ok_or_else(|| FetchError::Navigation {
                url: product_url.to_string(),
                reason: "product title not found".to_string(),
            })
        }
    }

    /// Longer than `fast_settings().page_timeout`, well inside its guard.
    pub const SLOW_STEP: Duration = Duration::from_millis(280);

    pub fn fast_settings() -> AnalyzerSettings {
        AnalyzerSettings {
            max_pages: 10,
            page_timeout: Duration::from_millis(200),
            title_timeout: Duration::from_millis(200),
            deadline: Duration::from_secs(5),
            page_delay: Duration::ZERO,
            detail_min_chars: 200,
        }
    }
}
