//! Chat proxy endpoint.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::header,
    response::{IntoResponse, Response},
};

use stillwater_common::{ChatRequest, StillwaterError};

use crate::error::ApiResult;
use crate::gatekeeper::{Caller, ChallengeAnswer};
use crate::llm::Persona;
use crate::sanitize::sanitize_prompt;
use crate::state::AppState;

/// Screen the caller, sanitise the message and relay it to the model
pub async fn chat(
    State(state): State<AppState>,
    caller: Caller,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<Response> {
    // Limits apply before the body is judged, so malformed requests still count
    let answer = payload.as_ref().ok().and_then(|Json(body)| {
        ChallengeAnswer::from_parts(body.challenge_id.as_deref(), body.challenge_answer.as_deref())
    });
    let assessment = state.gatekeeper.admit(&caller, answer)?;

    let Json(request) = payload?;
    let message = request
        .message
        .ok_or_else(|| StillwaterError::Validation("Message field is required".to_string()))?;

    state.gatekeeper.check_entropy(&assessment, &message)?;
    let message = sanitize_prompt(&message)?;

    let persona = Persona::random(&mut rand::rng());
    let prompt = persona.decorate(&message);

    let reply = state.llm.generate(&prompt).await.map_err(|e| {
        tracing::error!(kind = e.kind(), error = %e, "LLM request failed");
        StillwaterError::UpstreamUnavailable
    })?;

    tracing::debug!(
        persona = ?persona,
        fingerprint = %assessment.fingerprint,
        chars = reply.chars().count(),
        "Chat answered"
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        reply,
    )
        .into_response())
}
