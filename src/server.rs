use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use crate::analysis::{AnalysisRequest, AnalysisResult, AnalysisService};
use crate::completion::CompletionClient;
use crate::config::Config;
use crate::error::ApiError;
use crate::news_fetcher::{Headline, NewsFetcher};
use crate::preferences::{PreferenceStore, UserId, UserPreferences};

/// Header carrying the caller's account id, set by the authenticating gateway.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Shared state for the HTTP server. Every client is built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub analysis: Arc<AnalysisService>,
    pub news: Arc<NewsFetcher>,
    pub preferences: Arc<PreferenceStore>,
}

impl AppState {
    pub fn new(
        news: Arc<NewsFetcher>,
        completion: Arc<CompletionClient>,
        preferences: Arc<PreferenceStore>,
    ) -> Self {
        let analysis = Arc::new(AnalysisService::new(
            news.clone(),
            completion,
            preferences.clone(),
        ));
        AppState {
            analysis,
            news,
            preferences,
        }
    }
}

// ─── Request / response types ──────────────────────────

#[derive(Deserialize)]
pub struct AnalyzeBody {
    query: Option<String>,
}

#[derive(Deserialize)]
pub struct PreferencesBody {
    #[serde(default)]
    occupation: String,
    #[serde(default)]
    industry: String,
    #[serde(default)]
    interests: Vec<String>,
}

#[derive(Serialize)]
struct SaveResponse {
    success: bool,
    message: &'static str,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

fn caller_identity(headers: &HeaderMap) -> Option<UserId> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| UserId(id.to_string()))
}

// ─── Handlers ──────────────────────────────────────────

async fn api_analyze(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<AnalyzeBody>, JsonRejection>,
) -> Result<Json<AnalysisResult>, ApiError> {
    let Json(body) = body.map_err(|rejection| {
        warn!("Rejected analyze request: {}", rejection);
        ApiError::InvalidBody
    })?;

    let query = body
        .query
        .filter(|q| !q.trim().is_empty())
        .ok_or(ApiError::MissingQuery)?;

    let user = caller_identity(&headers);
    let request = AnalysisRequest { query };

    match state.analysis.analyze(&request, user.as_ref()).await {
        Ok(result) => Ok(Json(result)),
        Err(e) => {
            error!("Analysis failed: {:?}", e);
            Err(ApiError::AnalysisFailed)
        }
    }
}

async fn api_stories(State(state): State<AppState>) -> Result<Json<Vec<Headline>>, ApiError> {
    match state.news.top_headlines().await {
        Ok(articles) => Ok(Json(articles)),
        Err(e) => {
            error!("Error fetching stories: {}", e);
            Err(ApiError::StoriesFailed)
        }
    }
}

async fn api_get_preferences(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserPreferences>, ApiError> {
    let user = caller_identity(&headers).ok_or(ApiError::Unauthenticated)?;
    match state.preferences.get(&user) {
        Ok(Some(prefs)) => Ok(Json(prefs)),
        Ok(None) => Err(ApiError::PreferencesNotFound),
        Err(e) => {
            error!("Failed to load preferences for {}: {}", user, e);
            Err(ApiError::PreferencesLoadFailed)
        }
    }
}

async fn api_save_preferences(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<PreferencesBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let user = caller_identity(&headers).ok_or(ApiError::Unauthenticated)?;
    let Json(body) = body.map_err(|rejection| {
        warn!("Rejected preferences body: {}", rejection);
        ApiError::InvalidBody
    })?;

    let prefs = UserPreferences {
        id: user.0,
        occupation: body.occupation,
        industry: body.industry,
        interests: body.interests,
    };

    if let Err(e) = state.preferences.upsert(&prefs) {
        error!("Failed to save preferences for {}: {}", prefs.id, e);
        return Err(ApiError::PreferencesSaveFailed);
    }

    Ok(Json(SaveResponse {
        success: true,
        message: "Preferences saved successfully",
    }))
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

// ─── Router & server startup ───────────────────────────

pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/api/analyze", post(api_analyze))
        .route("/api/stories", get(api_stories))
        .route(
            "/api/user/preferences",
            get(api_get_preferences).post(api_save_preferences),
        );

    Router::new()
        .route("/health", get(health))
        .merge(api_routes)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the API until Ctrl+C.
pub async fn serve(config: &Config, state: AppState) -> Result<()> {
    let app = build_router(state);
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind server to {}", addr))?;

    info!("Fintech Radar listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Ctrl+C received, shutting down gracefully");
            }
        })
        .await
        .context("Server error")?;

    Ok(())
}
