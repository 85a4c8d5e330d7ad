use std::collections::HashSet;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::FeedError;
use crate::i18n::{self, Lang, Labels};
use crate::render::RenderInstruction;

pub const PLACEHOLDER_IMAGE_URL: &str = "https://via.placeholder.com/400x200.png?text=Matchday";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub link: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub source_id: Option<String>,
    #[serde(default, rename = "pubDate")]
    pub pub_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewsCard {
    pub title: String,
    pub description: String,
    pub link: String,
    pub image_url: String,
    pub source: String,
    pub date_label: String,
    pub saved: bool,
    pub read_more_label: String,
    pub save_label: String,
}

#[derive(Debug, Deserialize)]
struct NewsEnvelope {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    results: Value,
}

pub fn news_query(lang: Lang) -> &'static str {
    match lang {
        Lang::Ar => "كرة القدم",
        _ => "football",
    }
}

/// Language codes the news provider does not know ask for English.
pub fn news_language_code(raw: &str) -> &'static str {
    Lang::parse(raw).map(Lang::code).unwrap_or("en")
}

pub fn parse_news_json(raw: &str) -> Result<Vec<Article>, FeedError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Err(FeedError::Empty);
    }
    let envelope: NewsEnvelope = serde_json::from_str(trimmed)
        .map_err(|err| FeedError::Network(format!("invalid news json: {err}")))?;

    if envelope.status.as_deref() != Some("success") {
        let message = envelope
            .results
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("could not fetch news")
            .to_string();
        return Err(FeedError::Upstream(message));
    }

    let Value::Array(items) = envelope.results else {
        return Err(FeedError::Empty);
    };
    let articles: Vec<Article> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<Article>(item) {
            Ok(article) => Some(article),
            Err(err) => {
                warn!(error = %err, "skipping malformed article");
                None
            }
        })
        .collect();

    if articles.is_empty() {
        return Err(FeedError::Empty);
    }
    Ok(articles)
}

/// "2024-11-09 17:30:00" as the provider sends it; a bare date also works.
pub fn article_date_label(pub_date: Option<&str>, lang: Lang) -> String {
    let Some(raw) = pub_date.map(str::trim).filter(|s| !s.is_empty()) else {
        return String::new();
    };
    let date = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.date())
        .or_else(|_| chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d"));
    match date {
        Ok(date) => i18n::format_long_date(date, lang),
        Err(_) => String::new(),
    }
}

pub fn news_card(article: &Article, saved: bool, labels: &Labels) -> NewsCard {
    NewsCard {
        title: article.title.clone().unwrap_or_default(),
        description: article.description.clone().unwrap_or_default(),
        link: article.link.clone(),
        image_url: article
            .image_url
            .clone()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| PLACEHOLDER_IMAGE_URL.to_string()),
        source: article.source_id.clone().unwrap_or_default(),
        date_label: article_date_label(article.pub_date.as_deref(), labels.lang()),
        saved,
        read_more_label: labels.get("read_more").to_string(),
        save_label: labels
            .get(if saved { "unsave_article" } else { "save_article" })
            .to_string(),
    }
}

/// Cards for the news container, or a single message when there is nothing.
pub fn build_news(
    articles: &[Article],
    page_size: Option<usize>,
    saved_links: &HashSet<String>,
    labels: &Labels,
) -> Vec<RenderInstruction> {
    if articles.is_empty() {
        return vec![RenderInstruction::Message {
            i18n_key: Some("no_saved_articles".to_string()),
            text: labels.get("no_saved_articles").to_string(),
        }];
    }
    let take = page_size.unwrap_or(articles.len());
    articles
        .iter()
        .take(take)
        .map(|a| RenderInstruction::NewsCard(news_card(a, saved_links.contains(&a.link), labels)))
        .collect()
}

pub fn build_news_result(
    result: &Result<Vec<Article>, FeedError>,
    page_size: Option<usize>,
    saved_links: &HashSet<String>,
    labels: &Labels,
) -> Vec<RenderInstruction> {
    match result {
        Ok(articles) => build_news(articles, page_size, saved_links, labels),
        Err(err) => {
            warn!(error = %err, "news unavailable");
            vec![RenderInstruction::Message {
                i18n_key: Some("news_loading_error".to_string()),
                text: labels.get("news_loading_error").to_string(),
            }]
        }
    }
}
