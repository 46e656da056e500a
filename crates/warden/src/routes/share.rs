//! Share creation and retrieval endpoints.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};

use stillwater_common::{ShareCreated, ShareRequest, ShareView};

use crate::error::ApiResult;
use crate::gatekeeper::{Caller, ChallengeAnswer};
use crate::state::AppState;
use crate::store::ShareId;

/// Store a question/answer pair and return its unguessable id
pub async fn create_share(
    State(state): State<AppState>,
    caller: Caller,
    payload: Result<Json<ShareRequest>, JsonRejection>,
) -> ApiResult<Json<ShareCreated>> {
    let answer = payload.as_ref().ok().and_then(|Json(body)| {
        ChallengeAnswer::from_parts(body.challenge_id.as_deref(), body.challenge_answer.as_deref())
    });
    let assessment = state.gatekeeper.admit(&caller, answer)?;

    let Json(request) = payload?;
    let id = state.shares.create(
        request.question.as_deref().unwrap_or_default(),
        request.answer.as_deref().unwrap_or_default(),
    )?;

    tracing::info!(fingerprint = %assessment.fingerprint, "Share created");
    Ok(Json(ShareCreated {
        id: id.as_str().to_string(),
    }))
}

/// Return a verified share; expired and tampered records are removed on read
pub async fn get_share(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<Json<ShareView>> {
    state.gatekeeper.screen(&caller)?;

    let id = ShareId::parse(&id)?;
    let record = state.shares.read(&id)?;
    Ok(Json(record.into()))
}

#[cfg(test)]
mod tests {
    use crate::routes::testing::{TestApp, body_json};
    use axum::http::StatusCode;
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn test_create_then_read() {
        let app = TestApp::new();
        let response = app
            .post_json(
                "/api/share",
                json!({ "question": "What is <b>stillness</b>?", "answer": "The lake undisturbed." }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let id = body_json(response).await["id"].as_str().unwrap().to_string();
        assert_eq!(id.len(), 43);

        let response = app.get(&format!("/api/share/{id}")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["question"], "What is &lt;b&gt;stillness&lt;/b&gt;?");
        assert_eq!(json["answer"], "The lake undisturbed.");
        assert!(json["timestamp"].as_i64().unwrap() >= 0);
    }

    #[tokio::test]
    async fn test_create_validation() {
        let app = TestApp::new();
        let json = body_json(
            app.post_json("/api/share", json!({ "answer": "The lake undisturbed." }))
                .await,
        )
        .await;
        assert_eq!(json["error"], "validation_error");
        assert_eq!(json["message"], "Question is required");

        let response = app
            .post_json(
                "/api/share",
                json!({ "question": "q", "answer": "a".repeat(5001) }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_read_errors() {
        let app = TestApp::new();

        let response = app.get("/api/share/not-an-id").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let unknown = "A".repeat(43);
        let response = app.get(&format!("/api/share/{unknown}")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let id = app.state.shares.create("q", "a").unwrap();
        app.clock.advance(Duration::from_secs(86_401));
        let response = app.get(&format!("/api/share/{}", id.as_str())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "expired");

        // Removed on the failed read
        let response = app.get(&format!("/api/share/{}", id.as_str())).await;
        assert_eq!(body_json(response).await["error"], "not_found");
    }
}
