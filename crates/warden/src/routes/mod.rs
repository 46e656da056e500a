//! HTTP route handlers for Warden.

use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, StatusCode, header},
    routing::{get, post},
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::state::AppState;

mod challenge;
mod chat;
mod feedback;
mod health;
mod preview;
mod share;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server.allowed_origins);
    let timeout = state.config.server.request_timeout();

    Router::new()
        // Health & Status
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .route("/metrics", get(health::metrics))

        // Protected endpoints
        .route("/api/chat", post(chat::chat))
        .route("/api/share", post(share::create_share))

        // Challenge verification
        .route("/api/challenge/verify", post(challenge::verify_challenge))

        // Read-only share access
        .route("/api/share/{id}", get(share::get_share))
        .route("/api/feedback", post(feedback::submit_feedback))
        .route("/api/feedback/{id}", get(feedback::get_feedback))

        // Social previews
        .route("/api/og-image", get(preview::og_image))
        .route("/s/{id}", get(preview::share_page))

        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Explicit origin list; entries that are not valid header values are skipped
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static("x-requested-with")])
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::clock::ManualClock;
    use crate::config::AppConfig;
    use crate::state::tests::{StubLlm, test_config, test_state};

    pub(crate) struct TestApp {
        pub state: AppState,
        pub clock: Arc<ManualClock>,
        pub llm: Arc<StubLlm>,
    }

    impl TestApp {
        pub fn new() -> Self {
            Self::with_config(test_config())
        }

        pub fn with_config(config: AppConfig) -> Self {
            Self::with_llm(config, StubLlm::default())
        }

        pub fn with_llm(config: AppConfig, llm: StubLlm) -> Self {
            let clock = Arc::new(ManualClock::default());
            let llm = Arc::new(llm);
            let state = test_state(config, clock.clone(), llm.clone());
            Self { state, clock, llm }
        }

        pub async fn send(&self, request: Request<Body>) -> Response {
            create_router(self.state.clone())
                .oneshot(request)
                .await
                .unwrap()
        }

        pub async fn get(&self, uri: &str) -> Response {
            self.send(browser_request(Method::GET, uri).body(Body::empty()).unwrap())
                .await
        }

        pub async fn post_json(&self, uri: &str, body: Value) -> Response {
            self.send(
                browser_request(Method::POST, uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
        }
    }

    /// Request builder carrying the headers an ordinary browser sends
    pub(crate) fn browser_request(method: Method, uri: &str) -> axum::http::request::Builder {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::HOST, "minnebo.ai")
            .header(
                header::USER_AGENT,
                "Mozilla/5.0 (X11; Linux x86_64) Chrome/126.0",
            )
            .header(header::ACCEPT_LANGUAGE, "nl-BE,nl;q=0.9")
            .header("sec-fetch-site", "same-origin")
            .header("x-forwarded-for", "203.0.113.9")
    }

    pub(crate) async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    pub(crate) async fn body_json(response: Response) -> Value {
        serde_json::from_str(&body_text(response).await).unwrap()
    }

    /// Evaluate a challenge question such as `"7 + 5"`
    pub(crate) fn solve(question: &str) -> String {
        let parts: Vec<&str> = question.split(' ').collect();
        let (a, b): (i64, i64) = (parts[0].parse().unwrap(), parts[2].parse().unwrap());
        match parts[1] {
            "+" => a + b,
            "-" => a - b,
            _ => a * b,
        }
        .to_string()
    }

    #[tokio::test]
    async fn test_security_headers_on_every_response() {
        let app = TestApp::new();
        let response = app.get("/health").await;
        assert_eq!(response.status(), StatusCode::OK);

        let headers = response.headers();
        assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
        assert_eq!(headers[header::REFERRER_POLICY], "no-referrer");
    }

    #[tokio::test]
    async fn test_cors_allows_listed_origin_only() {
        let app = TestApp::new();

        let response = app
            .send(
                browser_request(Method::GET, "/health")
                    .header(header::ORIGIN, "https://minnebo.ai")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://minnebo.ai"
        );

        let response = app
            .send(
                browser_request(Method::GET, "/health")
                    .header(header::ORIGIN, "https://evil.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let app = TestApp::new();
        assert_eq!(app.get("/api/nothing").await.status(), StatusCode::NOT_FOUND);
    }
}
