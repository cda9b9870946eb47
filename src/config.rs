use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;

pub const DEFAULT_NEWS_QUERY: &str =
    "(fintech OR \"financial technology\" OR blockchain OR cryptocurrency OR \"digital banking\")";

pub const DEFAULT_NEWS_DOMAINS: &str =
    "forbes.com,techcrunch.com,bloomberg.com,reuters.com,ft.com,cnbc.com";

pub const DEFAULT_HEADLINE_DOMAINS: &str = "bloomberg.com,reuters.com,ft.com,wsj.com,cnbc.com";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => anyhow::bail!("Invalid log format: '{}'. Must be 'text' or 'json'", s),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub bind_host: String,
    pub port: u16,
    pub log_format: LogFormat,
    // News search API
    pub news_api_key: String,
    pub news_api_url: String,
    pub news_query: String,
    pub news_domains: Vec<String>,
    pub news_page_size: u32,
    pub news_window_hours: i64,
    pub news_request_timeout_secs: u64,
    pub news_max_retries: u32,
    // Headline feed
    pub headline_domains: Vec<String>,
    pub headline_page_size: u32,
    // Completion API
    pub openai_api_key: String,
    pub completion_api_url: String,
    pub completion_model: String,
    pub completion_temperature: f32,
    pub completion_max_tokens: u32,
    pub completion_request_timeout_secs: u64,
    // Preference store
    pub database_path: String,
}

fn split_domains(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|d| d.trim())
        .filter(|d| !d.is_empty())
        .map(|d| d.to_string())
        .collect()
}

pub const MAX_NEWS_WINDOW_HOURS: i64 = 720;
pub const MAX_NEWS_RETRIES: u32 = 10;

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Don't fail if .env missing

        let config = Config {
            bind_host: env::var("BIND_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("Failed to parse PORT")?,
            log_format: env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "text".to_string())
                .parse()
                .context("Failed to parse LOG_FORMAT")?,
            news_api_key: env::var("NEWS_API_KEY").unwrap_or_default(),
            news_api_url: env::var("NEWS_API_URL")
                .unwrap_or_else(|_| "https://newsapi.org".to_string()),
            news_query: env::var("NEWS_QUERY").unwrap_or_else(|_| DEFAULT_NEWS_QUERY.to_string()),
            news_domains: split_domains(
                &env::var("NEWS_DOMAINS").unwrap_or_else(|_| DEFAULT_NEWS_DOMAINS.to_string()),
            ),
            news_page_size: env::var("NEWS_PAGE_SIZE")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .context("Failed to parse NEWS_PAGE_SIZE")?,
            news_window_hours: env::var("NEWS_WINDOW_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .context("Failed to parse NEWS_WINDOW_HOURS")?,
            news_request_timeout_secs: env::var("NEWS_REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("Failed to parse NEWS_REQUEST_TIMEOUT_SECS")?,
            news_max_retries: env::var("NEWS_MAX_RETRIES")
                .unwrap_or_else(|_| "1".to_string())
                .parse()
                .context("Failed to parse NEWS_MAX_RETRIES")?,
            headline_domains: split_domains(
                &env::var("HEADLINE_DOMAINS")
                    .unwrap_or_else(|_| DEFAULT_HEADLINE_DOMAINS.to_string()),
            ),
            headline_page_size: env::var("HEADLINE_PAGE_SIZE")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("Failed to parse HEADLINE_PAGE_SIZE")?,
            openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
            completion_api_url: env::var("COMPLETION_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com".to_string()),
            completion_model: env::var("COMPLETION_MODEL")
                .unwrap_or_else(|_| "gpt-4-turbo-preview".to_string()),
            completion_temperature: env::var("COMPLETION_TEMPERATURE")
                .unwrap_or_else(|_| "0.7".to_string())
                .parse()
                .context("Failed to parse COMPLETION_TEMPERATURE")?,
            completion_max_tokens: env::var("COMPLETION_MAX_TOKENS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .context("Failed to parse COMPLETION_MAX_TOKENS")?,
            completion_request_timeout_secs: env::var("COMPLETION_REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .context("Failed to parse COMPLETION_REQUEST_TIMEOUT_SECS")?,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "data/fintech-radar.db".to_string()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would overflow the news window or retry backoff.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_NEWS_WINDOW_HOURS).contains(&self.news_window_hours) {
            anyhow::bail!(
                "NEWS_WINDOW_HOURS must be between 1 and {}, got {}",
                MAX_NEWS_WINDOW_HOURS,
                self.news_window_hours
            );
        }
        if self.news_max_retries > MAX_NEWS_RETRIES {
            anyhow::bail!(
                "NEWS_MAX_RETRIES must be at most {}, got {}",
                MAX_NEWS_RETRIES,
                self.news_max_retries
            );
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }
}

/// Config pointing both outbound clients at local mock servers.
#[cfg(test)]
pub(crate) fn test_config(news_api_url: &str, completion_api_url: &str) -> Config {
    Config {
        bind_host: "127.0.0.1".to_string(),
        port: 0,
        log_format: LogFormat::Text,
        news_api_key: "news-key".to_string(),
        news_api_url: news_api_url.to_string(),
        news_query: DEFAULT_NEWS_QUERY.to_string(),
        news_domains: split_domains(DEFAULT_NEWS_DOMAINS),
        news_page_size: 5,
        news_window_hours: 24,
        news_request_timeout_secs: 5,
        news_max_retries: 0,
        headline_domains: split_domains(DEFAULT_HEADLINE_DOMAINS),
        headline_page_size: 10,
        openai_api_key: "test-key".to_string(),
        completion_api_url: completion_api_url.to_string(),
        completion_model: "gpt-4-turbo-preview".to_string(),
        completion_temperature: 0.7,
        completion_max_tokens: 1000,
        completion_request_timeout_secs: 5,
        database_path: ":memory:".to_string(),
    }
}
