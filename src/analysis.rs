use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::completion::CompletionClient;
use crate::error::AnalysisError;
use crate::news_fetcher::{NewsArticle, NewsFetcher};
use crate::preferences::{PreferenceStore, UserId};
use crate::prompt::build_prompt;

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisRequest {
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub analysis: String,
    /// Exactly the articles that were rendered into the prompt.
    pub sources: Vec<NewsArticle>,
    pub personalized: bool,
}

/// News-grounded question answering: preferences → news → prompt → model.
pub struct AnalysisService {
    news: Arc<NewsFetcher>,
    completion: Arc<CompletionClient>,
    preferences: Arc<PreferenceStore>,
}

impl AnalysisService {
    pub fn new(
        news: Arc<NewsFetcher>,
        completion: Arc<CompletionClient>,
        preferences: Arc<PreferenceStore>,
    ) -> Self {
        AnalysisService {
            news,
            completion,
            preferences,
        }
    }

    pub async fn analyze(
        &self,
        request: &AnalysisRequest,
        user: Option<&UserId>,
    ) -> Result<AnalysisResult, AnalysisError> {
        let context = self.preferences.resolve(user);
        let articles = self.news.fetch_recent().await;
        let prompt = build_prompt(&articles, &context);

        let analysis = self
            .completion
            .complete(&prompt.instruction, &request.query)
            .await?;

        info!(
            "Analysis complete: {} sources, personalized={}, model={}",
            articles.len(),
            prompt.personalized,
            self.completion.model()
        );

        Ok(AnalysisResult {
            analysis,
            sources: articles,
            personalized: prompt.personalized,
        })
    }
}
