//! Gemini `generateContent` client.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use stillwater_common::constants::OUTBOUND_USER_AGENT;

use super::{LlmClient, LlmFuture, UpstreamError};
use crate::config::LlmConfig;

/// Returned when the model produced no text
pub const EMPTY_COMPLETION: &str = "No response generated.";

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    /// First candidate's first part, or the placeholder when absent or empty
    fn into_text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| EMPTY_COMPLETION.to_string())
    }
}

/// HTTP client for the hosted model
pub struct GeminiClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(OUTBOUND_USER_AGENT)
            .build()
            .context("Failed to build LLM HTTP client")?;

        if config.api_key.is_empty() {
            tracing::warn!("LLM API key is not set; chat requests will fail");
        }

        Ok(Self {
            client,
            endpoint: format!(
                "{}/models/{}:generateContent",
                config.base_url.trim_end_matches('/'),
                config.model
            ),
            api_key: config.api_key.clone(),
        })
    }

    async fn call(&self, prompt: &str) -> Result<String, UpstreamError> {
        if self.api_key.is_empty() {
            return Err(UpstreamError::NotConfigured);
        }

        let body = GenerateRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            // Error text can carry the URL, and with it the key
            .map_err(|e| UpstreamError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status.as_u16()));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|_| UpstreamError::Decode)?;

        Ok(parsed.into_text())
    }
}

impl LlmClient for GeminiClient {
    fn generate<'a>(&'a self, prompt: &'a str) -> LlmFuture<'a> {
        Box::pin(self.call(prompt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Json, Query};
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::Router;
    use serde_json::{Value, json};
    use std::collections::HashMap;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/v1beta")
    }

    fn client(base_url: String) -> GeminiClient {
        GeminiClient::new(&LlmConfig {
            base_url,
            api_key: "test-key".to_string(),
            ..LlmConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_into_text() {
        let full: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"text": "The lake is still."}]}}]
        }))
        .unwrap();
        assert_eq!(full.into_text(), "The lake is still.");

        let empty: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"text": ""}]}}]
        }))
        .unwrap();
        assert_eq!(empty.into_text(), EMPTY_COMPLETION);

        let none: GenerateResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(none.into_text(), EMPTY_COMPLETION);
    }

    #[tokio::test]
    async fn test_generate_sends_expected_request() {
        let app = Router::new().route(
            "/v1beta/models/gemini-2.0-flash:generateContent",
            post(
                |Query(q): Query<HashMap<String, String>>, Json(body): Json<Value>| async move {
                    assert_eq!(q.get("key").map(String::as_str), Some("test-key"));
                    let text = body["contents"][0]["parts"][0]["text"]
                        .as_str()
                        .unwrap_or_default()
                        .to_uppercase();
                    Json(json!({"candidates": [{"content": {"parts": [{"text": text}]}}]}))
                },
            ),
        );
        let gemini = client(serve(app).await);

        assert_eq!(gemini.generate("be still").await.unwrap(), "BE STILL");
    }

    #[tokio::test]
    async fn test_non_success_status_is_upstream_error() {
        let app = Router::new().route(
            "/v1beta/models/gemini-2.0-flash:generateContent",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "quota exhausted: key=secret") }),
        );
        let gemini = client(serve(app).await);

        let err = gemini.generate("hi").await.unwrap_err();
        assert!(matches!(err, UpstreamError::Status(429)));
        assert!(!err.to_string().contains("secret"));
    }

    #[tokio::test]
    async fn test_missing_key_is_not_configured() {
        let gemini = GeminiClient::new(&LlmConfig::default()).unwrap();
        assert!(matches!(
            gemini.generate("hi").await,
            Err(UpstreamError::NotConfigured)
        ));
    }
}
