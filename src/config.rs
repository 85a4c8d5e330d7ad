use std::env;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{FixedOffset, Local, Offset};

use crate::render::FallbackPolicy;
use crate::store;

pub const DEFAULT_FOOTBALL_API_BASE: &str = "https://v3.football.api-sports.io";
pub const DEFAULT_FOOTBALL_API_HOST: &str = "v3.football.api-sports.io";
pub const DEFAULT_NEWS_API_BASE: &str = "https://newsdata.io/api/1";
pub const DEFAULT_LOCALES_DIR: &str = "locales";

#[derive(Debug, Clone)]
pub struct Config {
    pub football_api_base: String,
    /// `None` when requests go through a proxy that injects the key.
    pub football_api_key: Option<String>,
    pub football_api_host: String,
    pub news_api_base: String,
    pub news_api_key: Option<String>,
    pub poll_interval: Duration,
    pub lang: Option<String>,
    pub viewer_offset: FixedOffset,
    pub locales_dir: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
    pub show_lineups: bool,
    pub fallback: FallbackPolicy,
    pub news_page_size: Option<usize>,
    pub fetch_parallelism: usize,
}

impl Config {
    /// Reads `.env.local`, then `.env`, then the process environment.
    pub fn load() -> Self {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");
        Self::from_env()
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let opt = |key: &str| lookup(key).filter(|val| !val.trim().is_empty());

        let poll_secs = opt("FEED_POLL_SECS")
            .and_then(|val| val.trim().parse::<u64>().ok())
            .unwrap_or(60)
            .max(15);
        let viewer_offset = opt("FEED_TZ_OFFSET_MINUTES")
            .and_then(|val| parse_offset_minutes(&val))
            .unwrap_or_else(local_offset);

        Self {
            football_api_base: opt("FOOTBALL_API_BASE")
                .map(|val| trim_base(&val))
                .unwrap_or_else(|| DEFAULT_FOOTBALL_API_BASE.to_string()),
            football_api_key: opt("FOOTBALL_API_KEY"),
            football_api_host: opt("FOOTBALL_API_HOST")
                .unwrap_or_else(|| DEFAULT_FOOTBALL_API_HOST.to_string()),
            news_api_base: opt("NEWS_API_BASE")
                .map(|val| trim_base(&val))
                .unwrap_or_else(|| DEFAULT_NEWS_API_BASE.to_string()),
            news_api_key: opt("NEWS_API_KEY"),
            poll_interval: Duration::from_secs(poll_secs),
            lang: opt("FEED_LANG"),
            viewer_offset,
            locales_dir: opt("FEED_LOCALES_DIR")
                .map(PathBuf::from)
                .or_else(|| Some(PathBuf::from(DEFAULT_LOCALES_DIR)).filter(|dir| dir.is_dir())),
            db_path: opt("FEED_DB_PATH")
                .map(PathBuf::from)
                .or_else(store::default_db_path),
            show_lineups: opt("FEED_SHOW_LINEUPS")
                .and_then(|val| parse_bool(&val))
                .unwrap_or(false),
            fallback: opt("FEED_FALLBACK")
                .and_then(|val| FallbackPolicy::parse(&val))
                .unwrap_or_default(),
            news_page_size: opt("NEWS_PAGE_SIZE")
                .and_then(|val| val.trim().parse::<usize>().ok())
                .filter(|n| *n > 0),
            fetch_parallelism: opt("FETCH_PARALLELISM")
                .and_then(|val| val.trim().parse::<usize>().ok())
                .unwrap_or(3)
                .clamp(1, 8),
        }
    }
}

pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Minutes east of UTC, e.g. `180` or `-300`. Out-of-range values are rejected.
pub fn parse_offset_minutes(raw: &str) -> Option<FixedOffset> {
    let minutes = raw.trim().parse::<i32>().ok()?;
    FixedOffset::east_opt(minutes.checked_mul(60)?)
}

fn local_offset() -> FixedOffset {
    Local::now().offset().fix()
}

fn trim_base(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let cfg = config(&[("FEED_DB_PATH", "/tmp/feed.sqlite")]);
        assert_eq!(cfg.football_api_base, DEFAULT_FOOTBALL_API_BASE);
        assert_eq!(cfg.poll_interval, Duration::from_secs(60));
        assert_eq!(cfg.fallback, FallbackPolicy::Placeholder);
        assert!(!cfg.show_lineups);
        assert!(cfg.football_api_key.is_none());
        assert_eq!(cfg.news_page_size, None);
    }

    #[test]
    fn poll_interval_has_a_floor() {
        let cfg = config(&[("FEED_POLL_SECS", "2")]);
        assert_eq!(cfg.poll_interval, Duration::from_secs(15));
    }

    #[test]
    fn overrides_are_parsed() {
        let cfg = config(&[
            ("FOOTBALL_API_BASE", "https://proxy.example/api/"),
            ("FEED_TZ_OFFSET_MINUTES", "180"),
            ("FEED_SHOW_LINEUPS", "yes"),
            ("FEED_FALLBACK", "message"),
            ("NEWS_PAGE_SIZE", "6"),
            ("FOOTBALL_API_KEY", "  "),
        ]);
        assert_eq!(cfg.football_api_base, "https://proxy.example/api");
        assert_eq!(cfg.viewer_offset.local_minus_utc(), 3 * 3600);
        assert!(cfg.show_lineups);
        assert_eq!(cfg.fallback, FallbackPolicy::Message);
        assert_eq!(cfg.news_page_size, Some(6));
        assert!(cfg.football_api_key.is_none());
    }

    #[test]
    fn offset_rejects_garbage() {
        assert!(parse_offset_minutes("abc").is_none());
        assert!(parse_offset_minutes("100000").is_none());
        assert_eq!(
            parse_offset_minutes("-300").map(|o| o.local_minus_utc()),
            Some(-5 * 3600)
        );
    }
}
