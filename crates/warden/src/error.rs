//! HTTP mapping of gateway errors.

use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use stillwater_common::{ChallengeError, ChallengePrompt, StillwaterError};

use crate::store::StoreError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Error returned by every handler
#[derive(Debug)]
pub struct ApiError(pub StillwaterError);

impl From<StillwaterError> for ApiError {
    fn from(err: StillwaterError) -> Self {
        Self(err)
    }
}

impl From<ChallengeError> for ApiError {
    fn from(err: ChallengeError) -> Self {
        Self(err.into())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self(err.into())
    }
}

/// JSON error response body
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    challenge: Option<ChallengePrompt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attempts_left: Option<u32>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        // Server-side failures are logged by category and answered opaquely
        let message = if err.is_server_error() {
            tracing::error!(code = err.code(), error = %err, "Request failed");
            match err {
                StillwaterError::UpstreamUnavailable => err.to_string(),
                _ => "Internal server error".to_string(),
            }
        } else {
            err.to_string()
        };

        let retry_after = err.retry_after_secs();
        let (challenge, attempts_left) = match &err {
            StillwaterError::RateLimited { challenge, .. } => (challenge.clone(), None),
            StillwaterError::Challenge(ChallengeError::WrongAnswer { attempts_left }) => {
                (None, Some(*attempts_left))
            }
            _ => (None, None),
        };

        let body = ErrorResponse {
            error: err.code(),
            message,
            retry_after,
            challenge,
            attempts_left,
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(StillwaterError::Validation(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    async fn render(err: StillwaterError) -> (StatusCode, Option<String>, Value) {
        let response = ApiError(err).into_response();
        let status = response.status();
        let retry = response
            .headers()
            .get(header::RETRY_AFTER)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, retry, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_challenge_required_response() {
        let (status, retry, json) = render(StillwaterError::RateLimited {
            retry_after_secs: 42,
            challenge: Some(ChallengePrompt {
                challenge_id: "abc".into(),
                question: "7 + 5".into(),
                expires_in_secs: 300,
            }),
        })
        .await;

        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(retry.as_deref(), Some("42"));
        assert_eq!(json["error"], "challenge_required");
        assert_eq!(json["retry_after"], 42);
        assert_eq!(json["challenge"]["question"], "7 + 5");
    }

    #[tokio::test]
    async fn test_wrong_answer_reports_attempts_left() {
        let (status, retry, json) =
            render(ChallengeError::WrongAnswer { attempts_left: 1 }.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(retry.is_none());
        assert_eq!(json["error"], "challenge_wrong_answer");
        assert_eq!(json["attempts_left"], 1);
        assert!(json.get("challenge").is_none());
    }

    #[tokio::test]
    async fn test_internal_details_are_hidden() {
        let (status, _, json) =
            render(StillwaterError::Internal("lock poisoned at store.rs".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "internal_error");
        assert_eq!(json["message"], "Internal server error");

        let (status, _, json) = render(StillwaterError::UpstreamUnavailable).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "upstream_unavailable");
    }

    #[tokio::test]
    async fn test_share_errors() {
        assert_eq!(render(StillwaterError::Expired).await.0, StatusCode::NOT_FOUND);
        let (status, _, json) = render(StillwaterError::Tampered).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "tampered");
    }
}
