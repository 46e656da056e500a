//! Challenge verification endpoint.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::Serialize;

use stillwater_common::VerifyRequest;

use crate::error::ApiResult;
use crate::gatekeeper::Caller;
use crate::state::AppState;

#[derive(Serialize)]
pub struct VerifyResponse {
    verified: bool,
}

/// Verify a challenge answer and unlock the requested protected route
pub async fn verify_challenge(
    State(state): State<AppState>,
    caller: Caller,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> ApiResult<Json<VerifyResponse>> {
    // Foreign hosts are turned away before the body is judged
    state.gatekeeper.check_host(&caller.headers)?;
    let Json(request) = payload?;

    state.gatekeeper.verify_for_route(
        &caller,
        request.route,
        &request.challenge_id,
        &request.answer,
    )?;

    tracing::info!(route = ?request.route, "Challenge solved");
    Ok(Json(VerifyResponse { verified: true }))
}
