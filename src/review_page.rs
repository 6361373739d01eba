//! Parsing of rendered review listing pages.
//!
//! Shared by the browser and plain HTTP backends so both see identical extraction rules.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use crate::review::RawReview;

static REVIEW_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"div[data-hook="review"], li[data-hook="review"]"#).expect("static selector")
});
static BODY_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"span[data-hook="review-body"]"#).expect("static selector"));
static RATING_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"i[data-hook="review-star-rating"], i[data-hook="cmps-review-star-rating"]"#)
        .expect("static selector")
});
static TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("#productTitle").expect("static selector"));
static CAPTCHA_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"form[action*="validateCaptcha"], input#captchacharacters"#)
        .expect("static selector")
});
static SIGNIN_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"form[name="signIn"], input#ap_email"#).expect("static selector")
});

/// CSS selector the browser waits for before reading a review page: a review block, or the
/// marker of a captcha or sign-in wall.
pub const REVIEW_WAIT_SELECTOR: &str = r#"[data-hook="review"], form[action*="validateCaptcha"], input#captchacharacters, form[name="signIn"], input#ap_email"#;

/// Reviews extracted from one listing page.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ParsedPage {
    pub reviews: Vec<RawReview>,
    /// Review blocks present on the page that could not be read.
    pub skipped: usize,
}

impl ParsedPage {
    /// No review blocks at all, readable or not.
    pub fn is_end_of_results(&self) -> bool {
        self.reviews.is_empty() && self.skipped == 0
    }
}

/// Why a review block was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    MissingBody,
    EmptyBody,
    MissingRating,
    UnparsableRating(String),
}

pub fn parse_review_page(html: &str) -> ParsedPage {
    let document = Html::parse_document(html);
    let mut page = ParsedPage::default();

    for block in document.select(&REVIEW_SELECTOR) {
        match parse_review_block(block) {
            Ok(review) => page.reviews.push(review),
            Err(reason) => {
                tracing::debug!(?reason, "skipping unreadable review block");
                page.skipped += 1;
            }
        }
    }
    page
}

fn parse_review_block(block: ElementRef<'_>) -> Result<RawReview, SkipReason> {
    let body = block
        .select(&BODY_SELECTOR)
        .next()
        .ok_or(SkipReason::MissingBody)?;
    let text = collapse_whitespace(&body.text().collect::<String>());
    if text.is_empty() {
        return Err(SkipReason::EmptyBody);
    }

    let rating_text = block
        .select(&RATING_SELECTOR)
        .next()
        .ok_or(SkipReason::MissingRating)?
        .text()
        .collect::<String>();
    let rating = parse_rating(&rating_text)
        .ok_or_else(|| SkipReason::UnparsableRating(rating_text.trim().to_string()))?;

    Ok(RawReview { text, rating })
}

/// Reads the leading number of a star label such as "4.0 out of 5 stars" or
/// "4,0 von 5 Sternen".
pub fn parse_rating(label: &str) -> Option<f64> {
    let first = label.split_whitespace().next()?;
    first.replace(',', ".").parse::<f64>().ok().filter(|r| r.is_finite())
}

/// Product title from a product detail page.
pub fn parse_product_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty())
}

/// Describes the wall if the page is a captcha or a sign-in redirect rather than content.
pub fn detect_block(html: &str) -> Option<&'static str> {
    let document = Html::parse_document(html);
    if document.select(&CAPTCHA_SELECTOR).next().is_some()
        || html.contains("Enter the characters you see below")
    {
        return Some("captcha challenge");
    }
    if document.select(&SIGNIN_SELECTOR).next().is_some() {
        return Some("sign-in wall");
    }
    None
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
