use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failure talking to the news search API.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("news request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("news API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed news payload: {0}")]
    MalformedPayload(String),
}

impl FetchError {
    /// Transport errors, rate limits and server errors are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Transport(_) => true,
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            FetchError::MalformedPayload(_) => false,
        }
    }
}

/// Failure talking to the chat-completion API.
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("completion request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("completion API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed completion response: {0}")]
    MalformedResponse(String),
}

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("analysis failed: {0}")]
    Completion(#[from] CompletionError),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("preference store lock poisoned")]
    Poisoned,
}

/// Errors returned to HTTP callers. Messages are fixed strings; the cause is
/// logged where the error is produced.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("Query is required")]
    MissingQuery,

    #[error("Invalid request body")]
    InvalidBody,

    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Preferences not found")]
    PreferencesNotFound,

    #[error("Failed to analyze")]
    AnalysisFailed,

    #[error("Failed to fetch stories")]
    StoriesFailed,

    #[error("Failed to load preferences")]
    PreferencesLoadFailed,

    #[error("Failed to save preferences")]
    PreferencesSaveFailed,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingQuery | ApiError::InvalidBody => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::PreferencesNotFound => StatusCode::NOT_FOUND,
            ApiError::AnalysisFailed
            | ApiError::StoriesFailed
            | ApiError::PreferencesLoadFailed
            | ApiError::PreferencesSaveFailed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_retryable() {
        let rate_limited = FetchError::Status {
            status: 429,
            body: String::new(),
        };
        let unavailable = FetchError::Status {
            status: 503,
            body: String::new(),
        };
        let bad_key = FetchError::Status {
            status: 401,
            body: String::new(),
        };
        assert!(rate_limited.is_retryable());
        assert!(unavailable.is_retryable());
        assert!(!bad_key.is_retryable());
        assert!(!FetchError::MalformedPayload("no articles".into()).is_retryable());
    }

    #[test]
    fn test_api_error_status_codes() {
        assert_eq!(ApiError::MissingQuery.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::PreferencesNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::AnalysisFailed.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_api_error_body_is_fixed_message() {
        let resp = ApiError::AnalysisFailed.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(resp.into_body(), 1_000_000)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({"error": "Failed to analyze"}));
    }
}
