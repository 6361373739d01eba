//! Service configuration read from the environment (optionally seeded from `.env`).

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Which review source implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchBackend {
    /// Headless Chrome; renders script-driven listings.
    Browser,
    /// Plain HTTP GET plus HTML parsing.
    Http,
}

impl FromStr for FetchBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "browser" | "chrome" => Ok(FetchBackend::Browser),
            "http" => Ok(FetchBackend::Http),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub backend: FetchBackend,
    pub headless: bool,
    pub max_pages: u32,
    pub page_timeout: Duration,
    pub title_timeout: Duration,
    pub analysis_deadline: Duration,
    /// Upper bound of the random pause between two page requests.
    pub page_delay: Duration,
    pub max_browser_sessions: usize,
    /// Reviews longer than this many characters are mined for themes.
    pub detail_min_chars: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            backend: FetchBackend::Browser,
            headless: true,
            max_pages: 500,
            page_timeout: Duration::from_secs(15),
            title_timeout: Duration::from_secs(10),
            analysis_deadline: Duration::from_secs(600),
            page_delay: Duration::ZERO,
            max_browser_sessions: 2,
            detail_min_chars: 200,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |name: &'static str| lookup(name).filter(|v| !v.trim().is_empty());

        Ok(Self {
            bind_addr: parse_or(get("BIND_ADDR"), "BIND_ADDR", defaults.bind_addr)?,
            backend: parse_or(get("FETCH_BACKEND"), "FETCH_BACKEND", defaults.backend)?,
            headless: parse_or(get("HEADLESS"), "HEADLESS", defaults.headless)?,
            max_pages: parse_or(get("MAX_REVIEW_PAGES"), "MAX_REVIEW_PAGES", defaults.max_pages)?,
            page_timeout: secs_or(get("PAGE_TIMEOUT_SECS"), "PAGE_TIMEOUT_SECS", defaults.page_timeout)?,
            title_timeout: secs_or(get("TITLE_TIMEOUT_SECS"), "TITLE_TIMEOUT_SECS", defaults.title_timeout)?,
            analysis_deadline: secs_or(
                get("ANALYSIS_DEADLINE_SECS"),
                "ANALYSIS_DEADLINE_SECS",
                defaults.analysis_deadline,
            )?,
            page_delay: Duration::from_millis(parse_or(get("PAGE_DELAY_MS"), "PAGE_DELAY_MS", 0u64)?),
            max_browser_sessions: parse_or(
                get("MAX_BROWSER_SESSIONS"),
                "MAX_BROWSER_SESSIONS",
                defaults.max_browser_sessions,
            )?
            .max(1),
            detail_min_chars: parse_or(get("DETAIL_MIN_CHARS"), "DETAIL_MIN_CHARS", defaults.detail_min_chars)?,
        })
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, name: &'static str, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

fn secs_or(raw: Option<String>, name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    parse_or(raw, name, default.as_secs()).map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = from_pairs(&[]).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.max_pages, 500);
        assert_eq!(config.detail_min_chars, 200);
    }

    #[test]
    fn test_overrides() {
        let config = from_pairs(&[
            ("BIND_ADDR", "127.0.0.1:8080"),
            ("FETCH_BACKEND", "HTTP"),
            ("HEADLESS", "false"),
            ("MAX_REVIEW_PAGES", "3"),
            ("PAGE_TIMEOUT_SECS", "5"),
            ("PAGE_DELAY_MS", "1500"),
            ("MAX_BROWSER_SESSIONS", "0"),
        ])
        .unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.backend, FetchBackend::Http);
        assert!(!config.headless);
        assert_eq!(config.max_pages, 3);
        assert_eq!(config.page_timeout, Duration::from_secs(5));
        assert_eq!(config.page_delay, Duration::from_millis(1500));
        assert_eq!(config.max_browser_sessions, 1);
    }

    #[test]
    fn test_blank_value_keeps_default() {
        let config = from_pairs(&[("MAX_REVIEW_PAGES", "  ")]).unwrap();
        assert_eq!(config.max_pages, 500);
    }

    #[test]
    fn test_invalid_value_is_reported() {
        let err = from_pairs(&[("MAX_REVIEW_PAGES", "many")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "MAX_REVIEW_PAGES", .. }));
        assert!(from_pairs(&[("FETCH_BACKEND", "carrier-pigeon")]).is_err());
    }
}
