//! Health check endpoints.

use axum::{Json, extract::State};
use serde::Serialize;

use stillwater_common::MetricsSnapshot;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Basic health check (is the server running?)
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
pub struct ReadyResponse {
    status: &'static str,
    tor_exit_nodes: usize,
    tor_list_fresh: bool,
}

/// Readiness check.
///
/// Tor screening fails open, so a stale exit list degrades the status
/// without taking the gateway out of rotation.
pub async fn ready_check(State(state): State<AppState>) -> Json<ReadyResponse> {
    let fresh = !state.config.tor.enabled || !state.tor.is_stale();

    Json(ReadyResponse {
        status: if fresh { "ready" } else { "degraded" },
        tor_exit_nodes: state.tor.len(),
        tor_list_fresh: fresh,
    })
}

/// Metrics endpoint (for monitoring)
pub async fn metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics())
}

#[cfg(test)]
mod tests {
    use crate::routes::testing::{TestApp, body_json};
    use crate::tor::parse_exit_list;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_health() {
        let app = TestApp::new();
        let response = app.get("/health").await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_ready_reports_tor_list() {
        let app = TestApp::new();
        let json = body_json(app.get("/ready").await).await;
        assert_eq!(json["status"], "ready");
        assert_eq!(json["tor_exit_nodes"], 0);

        let mut config = crate::state::tests::test_config();
        config.tor.enabled = true;
        let app = TestApp::with_config(config);
        let json = body_json(app.get("/ready").await).await;
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["tor_list_fresh"], false);

        app.state.tor.replace(parse_exit_list("185.220.101.7\n"));
        let json = body_json(app.get("/ready").await).await;
        assert_eq!(json["status"], "ready");
        assert_eq!(json["tor_exit_nodes"], 1);
    }

    #[tokio::test]
    async fn test_metrics_snapshot() {
        let app = TestApp::new();
        app.state.shares.create("q", "a").unwrap();
        let json = body_json(app.get("/metrics").await).await;
        assert_eq!(json["stored_shares"], 1);
        assert_eq!(json["active_challenges"], 0);
    }
}
