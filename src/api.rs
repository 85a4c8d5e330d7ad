use anyhow::Context;
use chrono::{DateTime, FixedOffset, Utc};
use reqwest::Url;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::FeedError;
use crate::fixture::{Fixture, parse_fixtures_json};
use crate::http_client::get_text;
use crate::i18n::Lang;
use crate::news::{Article, news_language_code, news_query, parse_news_json};
use crate::render::{FallbackPolicy, FeedOptions};

/// Which slice of fixtures a container shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedKind {
    Live,
    Today,
    Match(u64),
}

impl FeedKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "live" => Some(Self::Live),
            "today" => Some(Self::Today),
            other => other
                .strip_prefix("match:")
                .and_then(|id| id.parse().ok())
                .map(Self::Match),
        }
    }

    pub fn container_id(self) -> String {
        match self {
            Self::Live => "live-matches".to_string(),
            Self::Today => "today-matches".to_string(),
            Self::Match(id) => format!("match-{id}"),
        }
    }

    /// Query parameters for `GET /fixtures`. "Today" is the viewer's day.
    pub fn query(self, now: DateTime<Utc>, viewer: FixedOffset) -> Vec<(&'static str, String)> {
        match self {
            Self::Live => vec![("live", "all".to_string())],
            Self::Today => vec![(
                "date",
                now.with_timezone(&viewer).format("%Y-%m-%d").to_string(),
            )],
            Self::Match(id) => vec![("id", id.to_string())],
        }
    }

    pub fn no_matches_key(self) -> &'static str {
        match self {
            Self::Live => "no_live_matches",
            Self::Today => "no_matches_today",
            Self::Match(_) => "no_matches",
        }
    }

    /// The single-match view always offers lineups.
    pub fn options(self, show_lineups: bool, fallback: FallbackPolicy) -> FeedOptions {
        FeedOptions {
            show_lineups: show_lineups || matches!(self, Self::Match(_)),
            no_matches_key: self.no_matches_key().to_string(),
            fallback,
        }
    }
}

pub fn fixtures_url(cfg: &Config, kind: FeedKind, now: DateTime<Utc>) -> anyhow::Result<Url> {
    let base = format!("{}/fixtures", cfg.football_api_base);
    Url::parse_with_params(&base, kind.query(now, cfg.viewer_offset))
        .with_context(|| format!("invalid fixtures url {base}"))
}

pub fn fetch_fixtures(
    cfg: &Config,
    kind: FeedKind,
    now: DateTime<Utc>,
) -> Result<Vec<Fixture>, FeedError> {
    let url = fixtures_url(cfg, kind, now).map_err(|err| FeedError::network(&err))?;
    let mut headers: Vec<(&str, &str)> = Vec::new();
    if let Some(key) = cfg.football_api_key.as_deref() {
        headers.push(("x-rapidapi-key", key));
        headers.push(("x-rapidapi-host", cfg.football_api_host.as_str()));
    }
    debug!(url = %url, keyed = !headers.is_empty(), "fetching fixtures");

    let body = get_text(url.as_str(), &headers)
        .context("fixtures request failed")
        .map_err(|err| FeedError::network(&err))?;
    let fixtures = fixtures_from_json(&body)?;
    info!(kind = ?kind, count = fixtures.len(), "fixtures fetched");
    Ok(fixtures)
}

/// Runs `fetch` with the request instant and returns its result stamped with
/// the instant it completed. Live clocks are seeded from the latter.
pub fn stamp_arrival<T>(fetch: impl FnOnce(DateTime<Utc>) -> T) -> (T, DateTime<Utc>) {
    let result = fetch(Utc::now());
    (result, Utc::now())
}

/// Decodes a raw `/fixtures` body into the feed result the renderer takes.
pub fn fixtures_from_json(raw: &str) -> Result<Vec<Fixture>, FeedError> {
    parse_fixtures_json(raw)
        .map_err(|err| FeedError::network(&err))?
        .into_feed()
}

pub fn news_url(cfg: &Config, lang: Lang) -> anyhow::Result<Url> {
    let base = format!("{}/news", cfg.news_api_base);
    let mut params: Vec<(&str, &str)> = Vec::with_capacity(4);
    if let Some(key) = cfg.news_api_key.as_deref() {
        params.push(("apikey", key));
    }
    params.push(("q", news_query(lang)));
    params.push(("language", news_language_code(lang.code())));
    params.push(("image", "1"));
    Url::parse_with_params(&base, params).with_context(|| format!("invalid news url {base}"))
}

pub fn fetch_news(cfg: &Config, lang: Lang) -> Result<Vec<Article>, FeedError> {
    let url = news_url(cfg, lang).map_err(|err| FeedError::network(&err))?;
    let body = get_text(url.as_str(), &[])
        .context("news request failed")
        .map_err(|err| FeedError::network(&err))?;
    parse_news_json(&body)
}
