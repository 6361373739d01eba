//! Review sources: the per-request sessions that fetch listing pages and product titles.
//!
//! A source hands out one [`FetchSession`] per analysis request. Sessions own their browser or
//! HTTP client outright and release it when dropped, so concurrent requests never share a
//! driver.

use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::header::ACCEPT_LANGUAGE;
use reqwest::StatusCode;
use std::ffi::OsStr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::sleep;
use tracing::{debug, info};

use crate::config::{Config, FetchBackend};
use crate::error::FetchError;
use crate::product::review_page_url;
use crate::review_page::{
    detect_block, parse_product_title, parse_review_page, ParsedPage, REVIEW_WAIT_SELECTOR,
};

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
];

const ACCEPT_LANGUAGE_VALUE: &str = "en-US,en;q=0.9";

pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// Sleeps for a random duration up to `max`. No-op for zero.
pub async fn polite_pause(max: Duration) {
    if max.is_zero() {
        return;
    }
    let millis = rand::thread_rng().gen_range(0..=max.as_millis() as u64);
    debug!(millis, "pausing between pages");
    sleep(Duration::from_millis(millis)).await;
}

/// Result of fetching one listing page.
#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    Reviews(ParsedPage),
    /// The listing has no more review blocks.
    Exhausted,
}

impl PageOutcome {
    /// Classifies a rendered listing page.
    pub fn from_html(html: &str) -> Result<Self, FetchError> {
        if let Some(wall) = detect_block(html) {
            return Err(FetchError::Blocked(wall.to_string()));
        }
        let parsed = parse_review_page(html);
        if parsed.is_end_of_results() {
            Ok(PageOutcome::Exhausted)
        } else {
            Ok(PageOutcome::Reviews(parsed))
        }
    }
}

/// Hands out independent fetch sessions, one per analysis request.
#[async_trait]
pub trait ReviewSource: Send + Sync {
    async fn open_session(&self) -> Result<Box<dyn FetchSession>, FetchError>;
}

/// A scoped fetch context. Resources are released on drop.
#[async_trait]
pub trait FetchSession: Send {
    async fn fetch_page(&mut self, listing_url: &str, page: u32) -> Result<PageOutcome, FetchError>;

    async fn resolve_title(&mut self, product_url: &str) -> Result<String, FetchError>;
}

pub fn source_from_config(config: &Config) -> Arc<dyn ReviewSource> {
    match config.backend {
        FetchBackend::Browser => Arc::new(BrowserSource::new(
            BrowserSettings {
                headless: config.headless,
                page_timeout: config.page_timeout,
                title_timeout: config.title_timeout,
            },
            config.max_browser_sessions,
        )),
        FetchBackend::Http => Arc::new(HttpSource::new(config.page_timeout)),
    }
}

// ============================================================================
// Headless Chrome
// ============================================================================

/// Each render (navigation plus element wait) stays within the matching timeout.
#[derive(Debug, Clone, Copy)]
pub struct BrowserSettings {
    pub headless: bool,
    pub page_timeout: Duration,
    pub title_timeout: Duration,
}

/// Launches one Chrome per session; a semaphore caps how many run at once.
pub struct BrowserSource {
    settings: BrowserSettings,
    permits: Arc<Semaphore>,
}

impl BrowserSource {
    pub fn new(settings: BrowserSettings, max_sessions: usize) -> Self {
        Self {
            settings,
            permits: Arc::new(Semaphore::new(max_sessions.max(1))),
        }
    }
}

#[async_trait]
impl ReviewSource for BrowserSource {
    async fn open_session(&self) -> Result<Box<dyn FetchSession>, FetchError> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| FetchError::Launch(e.to_string()))?;

        let BrowserSettings { headless, page_timeout, .. } = self.settings;
        let user_agent = random_user_agent();
        let (browser, tab) =
            tokio::task::spawn_blocking(move || launch_browser(headless, user_agent, page_timeout))
                .await?
                .map_err(|e| FetchError::Launch(e.to_string()))?;
        info!(headless, "🌐 browser session started");

        Ok(Box::new(BrowserSession {
            tab,
            tab_lock: Arc::new(Mutex::new(())),
            _browser: browser,
            _permit: permit,
            settings: self.settings,
        }))
    }
}

fn launch_browser(
    headless: bool,
    user_agent: &str,
    command_timeout: Duration,
) -> anyhow::Result<(Browser, Arc<Tab>)> {
    let ua_arg = format!("--user-agent={}", user_agent);
    let mut args = vec![
        OsStr::new("--disable-blink-features=AutomationControlled"),
        OsStr::new("--no-sandbox"),
        OsStr::new("--disable-dev-shm-usage"),
        OsStr::new("--disable-gpu"),
        OsStr::new("--disable-infobars"),
        OsStr::new(&ua_arg),
    ];
    if headless {
        args.push(OsStr::new("--headless=new"));
    }

    let browser = Browser::new(LaunchOptions {
        // Headless mode is selected through `--headless=new` above.
        headless: false,
        window_size: Some((1920, 1080)),
        idle_browser_timeout: Duration::from_secs(300),
        args,
        ..Default::default()
    })?;
    let tab = browser.new_tab()?;
    tab.set_default_timeout(command_timeout);
    Ok((browser, tab))
}

// Field order matters: the tab goes first, then the browser, then the permit.
struct BrowserSession {
    tab: Arc<Tab>,
    /// Held for the whole of a render. A render whose caller gave up still owns the tab until
    /// it finishes.
    tab_lock: Arc<Mutex<()>>,
    _browser: Browser,
    _permit: OwnedSemaphorePermit,
    settings: BrowserSettings,
}

/// Navigates and waits for `wait_for`; navigation plus the wait stay within `budget`.
///
/// A missing element is not an error: the caller classifies whatever HTML is there.
async fn render(
    tab: Arc<Tab>,
    tab_lock: Arc<Mutex<()>>,
    url: String,
    wait_for: &'static str,
    budget: Duration,
) -> Result<String, FetchError> {
    let html = tokio::task::spawn_blocking(move || -> Result<String, FetchError> {
        let _guard = tab_lock
            .lock()
            .map_err(|_| FetchError::Task("tab lock poisoned".to_string()))?;
        let started = Instant::now();
        tab.navigate_to(&url).map_err(|e| FetchError::Navigation {
            url: url.clone(),
            reason: e.to_string(),
        })?;
        let wait = budget.saturating_sub(started.elapsed());
        if !wait.is_zero() {
            if let Err(e) = tab.wait_for_element_with_custom_timeout(wait_for, wait) {
                debug!(%url, error = %e, "element did not appear before timeout");
            }
        }
        tab.get_content().map_err(|e| FetchError::Navigation {
            url,
            reason: e.to_string(),
        })
    })
    .await??;
    Ok(html)
}

#[async_trait]
impl FetchSession for BrowserSession {
    async fn fetch_page(&mut self, listing_url: &str, page: u32) -> Result<PageOutcome, FetchError> {
        let html = render(
            self.tab.clone(),
            self.tab_lock.clone(),
            review_page_url(listing_url, page),
            REVIEW_WAIT_SELECTOR,
            self.settings.page_timeout,
        )
        .await?;
        PageOutcome::from_html(&html)
    }

    async fn resolve_title(&mut self, product_url: &str) -> Result<String, FetchError> {
        let html = render(
            self.tab.clone(),
            self.tab_lock.clone(),
            product_url.to_string(),
            "#productTitle",
            self.settings.title_timeout,
        )
        .await?;
        parse_product_title(&html).ok_or_else(|| FetchError::Navigation {
            url: product_url.to_string(),
            reason: "product title not found".to_string(),
        })
    }
}

// ============================================================================
// Plain HTTP
// ============================================================================

/// Fetches listing pages with a plain HTTP client; cheaper than Chrome, but only sees
/// server-rendered markup.
pub struct HttpSource {
    page_timeout: Duration,
}

impl HttpSource {
    pub fn new(page_timeout: Duration) -> Self {
        Self { page_timeout }
    }
}

#[async_trait]
impl ReviewSource for HttpSource {
    async fn open_session(&self) -> Result<Box<dyn FetchSession>, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(random_user_agent())
            .redirect(reqwest::redirect::Policy::limited(10))
            .timeout(self.page_timeout)
            .build()?;
        Ok(Box::new(HttpSession { client }))
    }
}

struct HttpSession {
    client: reqwest::Client,
}

impl HttpSession {
    async fn get_html(&self, url: &str) -> Result<(StatusCode, String), FetchError> {
        let resp = self
            .client
            .get(url)
            .header(ACCEPT_LANGUAGE, ACCEPT_LANGUAGE_VALUE)
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        Ok((status, body))
    }
}

#[async_trait]
impl FetchSession for HttpSession {
    async fn fetch_page(&mut self, listing_url: &str, page: u32) -> Result<PageOutcome, FetchError> {
        let url = review_page_url(listing_url, page);
        let (status, html) = self.get_html(&url).await?;
        match status {
            s if s.is_success() => PageOutcome::from_html(&html),
            StatusCode::NOT_FOUND => Ok(PageOutcome::Exhausted),
            StatusCode::SERVICE_UNAVAILABLE | StatusCode::TOO_MANY_REQUESTS => {
                Err(FetchError::Blocked(format!("throttled with status {}", status.as_u16())))
            }
            s => Err(FetchError::Status { status: s.as_u16(), url }),
        }
    }

    async fn resolve_title(&mut self, product_url: &str) -> Result<String, FetchError> {
        let (status, html) = self.get_html(product_url).await?;
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: product_url.to_string(),
            });
        }
        parse_product_title(&html).ok_or_else(|| FetchError::Navigation {
            url: product_url.to_string(),
            reason: "product title not found".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_user_agent_from_pool() {
        for _ in 0..20 {
            assert!(USER_AGENTS.contains(&random_user_agent()));
        }
    }

    #[test]
    fn test_outcome_from_html() {
        let page = r#"<div data-hook="review">
            <i data-hook="review-star-rating"><span>4.0 out of 5 stars</span></i>
            <span data-hook="review-body">Solid.</span></div>"#;
        match PageOutcome::from_html(page).unwrap() {
            PageOutcome::Reviews(parsed) => assert_eq!(parsed.reviews.len(), 1),
            PageOutcome::Exhausted => panic!("expected reviews"),
        }
        assert_eq!(PageOutcome::from_html("<p>nothing</p>").unwrap(), PageOutcome::Exhausted);
        let captcha = r#"<form action="/errors/validateCaptcha"></form>"#;
        assert!(matches!(PageOutcome::from_html(captcha), Err(FetchError::Blocked(_))));
    }

    #[tokio::test]
    async fn test_zero_pause_returns_immediately() {
        let started = Instant::now();
        polite_pause(Duration::ZERO).await;
        assert!(started.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_http_source_opens_session() {
        let source = HttpSource::new(Duration::from_secs(5));
        assert!(source.open_session().await.is_ok());
    }
}
