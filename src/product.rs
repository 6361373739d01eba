//! Product URL resolution: site domain plus ASIN, and the review listing derived from them.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

static DP_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/dp/([A-Z0-9]{10})").expect("static regex"));
static PRODUCT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/product/([A-Z0-9]{10})").expect("static regex"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProductUrlError {
    #[error("malformed product url: {0}")]
    Malformed(String),
    #[error("product url has no host")]
    MissingHost,
    #[error("could not find a valid ASIN in url")]
    MissingAsin,
}

/// A product on a specific storefront domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProductRef {
    #[schema(example = "www.amazon.de")]
    pub domain: String,
    #[schema(example = "B08N5WRWNW")]
    pub asin: String,
}

impl ProductRef {
    /// Parses a product page URL. The ASIN is taken from a `/dp/` path segment, falling back to
    /// `/product/`.
    pub fn parse(url: &str) -> Result<Self, ProductUrlError> {
        let parsed =
            Url::parse(url.trim()).map_err(|e| ProductUrlError::Malformed(e.to_string()))?;
        let domain = parsed
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or(ProductUrlError::MissingHost)?
            .to_string();

        let asin = DP_PATTERN
            .captures(url)
            .or_else(|| PRODUCT_PATTERN.captures(url))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or(ProductUrlError::MissingAsin)?;

        Ok(Self { domain, asin })
    }

    pub fn review_listing_url(&self) -> String {
        format!("https://{}/product-reviews/{}/", self.domain, self.asin)
    }
}

/// URL of one page of a review listing; pages are 1-based.
pub fn review_page_url(listing_url: &str, page: u32) -> String {
    format!("{}?pageNumber={}", listing_url, page)
}
