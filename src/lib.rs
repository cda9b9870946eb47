pub mod analysis;
pub mod completion;
pub mod config;
pub mod error;
pub mod news_fetcher;
pub mod preferences;
pub mod prompt;
pub mod server;
