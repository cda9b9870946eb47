use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use fintech_radar::completion::CompletionClient;
use fintech_radar::config::{Config, LogFormat};
use fintech_radar::news_fetcher::NewsFetcher;
use fintech_radar::preferences::PreferenceStore;
use fintech_radar::server::{self, AppState};

fn init_logging(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new("fintech_radar=info,tower_http=info")
    });

    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    init_logging(config.log_format);

    info!(
        "Fintech Radar starting (model: {}, news page size: {})",
        config.completion_model, config.news_page_size
    );

    if config.news_api_key.is_empty() {
        warn!("NEWS_API_KEY not set, analyses will run without news context");
    }
    if config.openai_api_key.is_empty() {
        warn!("OPENAI_API_KEY not set, analysis requests will fail");
    }

    // Outbound clients and the preference store live for the whole process
    let preferences = Arc::new(PreferenceStore::open(&config.database_path)?);
    info!("Preference store initialized at {}", config.database_path);

    let news = Arc::new(NewsFetcher::new(&config)?);
    let completion = Arc::new(CompletionClient::new(&config)?);

    let state = AppState::new(news, completion, preferences);
    server::serve(&config, state).await
}
