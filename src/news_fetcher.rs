use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::FetchError;

/// A news article as shown to the model and cited back to the caller.
/// Identity is the URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    pub title: String,
    pub url: String,
    pub published_at: DateTime<Utc>,
    pub source_name: String,
}

/// A top-headlines story as the provider returned it, for the story feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Headline {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub url_to_image: Option<String>,
    #[serde(default)]
    pub source: HeadlineSource,
    #[serde(default)]
    pub published_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadlineSource {
    #[serde(default)]
    pub name: String,
}

/// Keep provider order; only entries without a title or URL are skipped.
pub fn collect_headlines(entries: &[serde_json::Value], limit: usize) -> Vec<Headline> {
    entries
        .iter()
        .filter_map(|entry| serde_json::from_value::<Headline>(entry.clone()).ok())
        .take(limit)
        .collect()
}

// ─── NewsAPI wire types ───

#[derive(Debug, Deserialize)]
struct RawArticle {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(rename = "publishedAt", default)]
    published_at: Option<String>,
    #[serde(default)]
    source: Option<RawSource>,
}

#[derive(Debug, Deserialize)]
struct RawSource {
    #[serde(default)]
    name: Option<String>,
}

/// NewsAPI replaces taken-down articles with this placeholder.
const REMOVED_PLACEHOLDER: &str = "[Removed]";

impl RawArticle {
    fn into_article(self) -> Option<NewsArticle> {
        let title = self.title.filter(|t| !t.trim().is_empty() && t != REMOVED_PLACEHOLDER)?;
        let url = self.url.filter(|u| !u.trim().is_empty())?;
        let published_at = DateTime::parse_from_rfc3339(self.published_at.as_deref()?)
            .ok()?
            .with_timezone(&Utc);
        let source_name = self.source.and_then(|s| s.name).unwrap_or_default();

        Some(NewsArticle {
            title,
            url,
            published_at,
            source_name,
        })
    }
}

/// Turn the raw `articles` array into at most `limit` usable articles,
/// newest first. Entries missing a title, URL or timestamp are dropped and
/// repeated URLs are kept once.
pub fn normalize_articles(entries: &[serde_json::Value], limit: usize) -> Vec<NewsArticle> {
    let mut seen = HashSet::new();
    let mut articles: Vec<NewsArticle> = entries
        .iter()
        .filter_map(|entry| serde_json::from_value::<RawArticle>(entry.clone()).ok())
        .filter_map(RawArticle::into_article)
        .filter(|a| seen.insert(a.url.clone()))
        .collect();

    let dropped = entries.len() - articles.len();
    if dropped > 0 {
        debug!("Dropped {} unusable or duplicate news entries", dropped);
    }

    articles.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    articles.truncate(limit);
    articles
}

pub struct NewsFetcher {
    client: Client,
    base_url: String,
    api_key: String,
    query: String,
    domains: String,
    page_size: u32,
    window: chrono::Duration,
    max_retries: u32,
    headline_domains: String,
    headline_page_size: u32,
}

impl NewsFetcher {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.news_request_timeout_secs))
            .build()
            .context("Failed to build news HTTP client")?;

        Ok(NewsFetcher {
            client,
            base_url: config.news_api_url.trim_end_matches('/').to_string(),
            api_key: config.news_api_key.clone(),
            query: config.news_query.clone(),
            domains: config.news_domains.join(","),
            page_size: config.news_page_size,
            window: chrono::Duration::try_hours(config.news_window_hours).with_context(|| {
                format!("News window of {} hours is out of range", config.news_window_hours)
            })?,
            max_retries: config.news_max_retries,
            headline_domains: config.headline_domains.join(","),
            headline_page_size: config.headline_page_size,
        })
    }

    /// Recent fintech articles for prompt grounding.
    ///
    /// Never fails: any fetch error is logged and collapsed to an empty list,
    /// because "no news" is a normal input for the rest of the pipeline.
    pub async fn fetch_recent(&self) -> Vec<NewsArticle> {
        match self.try_fetch_recent().await {
            Ok(articles) => {
                info!("Fetched {} recent news articles", articles.len());
                articles
            }
            Err(e) => {
                warn!("News fetch failed, continuing without news context: {}", e);
                Vec::new()
            }
        }
    }

    /// Fallible core of [`fetch_recent`](Self::fetch_recent), with bounded retry.
    pub async fn try_fetch_recent(&self) -> Result<Vec<NewsArticle>, FetchError> {
        let mut attempt = 0u32;
        loop {
            match self.fetch_everything().await {
                Ok(articles) => return Ok(articles),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    let backoff_ms = 500u64.saturating_mul(2u64.saturating_pow(attempt - 1));
                    let delay = Duration::from_millis(backoff_ms);
                    warn!(
                        "News fetch failed ({}), retrying after {:?} (attempt {})",
                        e,
                        delay,
                        attempt + 1
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Business headlines from the trusted headline sources.
    pub async fn top_headlines(&self) -> Result<Vec<Headline>, FetchError> {
        let params = [
            ("category", "business".to_string()),
            ("language", "en".to_string()),
            ("pageSize", self.headline_page_size.to_string()),
            ("domains", self.headline_domains.clone()),
            ("apiKey", self.api_key.clone()),
        ];
        let entries = self.get_entries("top-headlines", &params).await?;
        Ok(collect_headlines(&entries, self.headline_page_size as usize))
    }

    async fn fetch_everything(&self) -> Result<Vec<NewsArticle>, FetchError> {
        let from = (Utc::now() - self.window).to_rfc3339_opts(SecondsFormat::Millis, true);
        let params = [
            ("q", self.query.clone()),
            ("sortBy", "publishedAt".to_string()),
            ("from", from),
            ("language", "en".to_string()),
            ("pageSize", self.page_size.to_string()),
            ("domains", self.domains.clone()),
            ("apiKey", self.api_key.clone()),
        ];
        let entries = self.get_entries("everything", &params).await?;
        Ok(normalize_articles(&entries, self.page_size as usize))
    }

    /// Raw `articles` array of a NewsAPI response.
    async fn get_entries(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<serde_json::Value>, FetchError> {
        let url = format!("{}/v2/{}", self.base_url, endpoint);

        let response = self.client.get(&url).query(params).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| FetchError::MalformedPayload(e.to_string()))?;

        let entries = match body {
            serde_json::Value::Object(mut map) => match map.remove("articles") {
                Some(serde_json::Value::Array(entries)) => entries,
                _ => {
                    return Err(FetchError::MalformedPayload(
                        "missing or non-array 'articles'".to_string(),
                    ))
                }
            },
            _ => {
                return Err(FetchError::MalformedPayload(
                    "response body is not an object".to_string(),
                ))
            }
        };

        debug!("News API /{} returned {} entries", endpoint, entries.len());
        Ok(entries)
    }
}
