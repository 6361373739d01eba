//! Error taxonomy for the review analysis service.

use thiserror::Error;

use crate::product::ProductUrlError;

/// Failures that abort an analysis request.
///
/// Everything else (per-page fetch failures, title lookup failures, an empty corpus) degrades
/// to a reduced summary instead of surfacing here.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    InvalidInput(#[from] ProductUrlError),
    #[error("review source unavailable: {0}")]
    SourceUnavailable(#[source] FetchError),
}

/// Failures raised by a review source while opening a session or fetching a page.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to launch browser: {0}")]
    Launch(String),
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },
    #[error("page {page} timed out")]
    Timeout { page: u32 },
    #[error("blocked by the site: {0}")]
    Blocked(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status} for {url}")]
    Status { status: u16, url: String },
    #[error("fetch task aborted: {0}")]
    Task(String),
}

impl FetchError {
    /// Whether retrying the same source is pointless for the rest of this request.
    pub fn is_unrecoverable(&self) -> bool {
        match self {
            FetchError::Launch(_) | FetchError::Blocked(_) => true,
            FetchError::Http(e) => e.is_connect(),
            _ => false,
        }
    }
}

impl From<tokio::task::JoinError> for FetchError {
    fn from(e: tokio::task::JoinError) -> Self {
        FetchError::Task(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrecoverable_kinds() {
        assert!(FetchError::Launch("no chrome".into()).is_unrecoverable());
        assert!(FetchError::Blocked("captcha".into()).is_unrecoverable());
        assert!(!FetchError::Timeout { page: 3 }.is_unrecoverable());
        assert!(!FetchError::Status { status: 404, url: "https://x".into() }.is_unrecoverable());
    }

    #[test]
    fn test_invalid_input_message_passes_through() {
        let err: AnalysisError = ProductUrlError::MissingAsin.into();
        assert_eq!(err.to_string(), ProductUrlError::MissingAsin.to_string());
    }
}
