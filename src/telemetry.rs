//! Log filtering shared by the server and the CLI.

use tracing_subscriber::EnvFilter;

/// Used when `RUST_LOG` is unset, blank, or unparsable.
pub const DEFAULT_LOG_FILTER: &str = "info";

pub fn env_filter() -> EnvFilter {
    filter_from(std::env::var(EnvFilter::DEFAULT_ENV).ok())
}

fn filter_from(raw: Option<String>) -> EnvFilter {
    raw.filter(|r| !r.trim().is_empty())
        .and_then(|r| EnvFilter::try_new(r).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn test_defaults_to_info() {
        assert_eq!(filter_from(None).max_level_hint(), Some(LevelFilter::INFO));
        assert_eq!(filter_from(Some("  ".to_string())).max_level_hint(), Some(LevelFilter::INFO));
    }

    #[test]
    fn test_rust_log_overrides_default() {
        let filter = filter_from(Some("review_insight=debug".to_string()));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
        assert_eq!(filter_from(Some("warn".to_string())).max_level_hint(), Some(LevelFilter::WARN));
    }
}
