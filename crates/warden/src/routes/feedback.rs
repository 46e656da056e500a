//! Feedback voting endpoints.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};

use stillwater_common::{FeedbackRequest, FeedbackTally, StillwaterError};

use crate::error::ApiResult;
use crate::gatekeeper::Caller;
use crate::identity::client_ip;
use crate::limiter::WindowDecision;
use crate::state::AppState;
use crate::store::ShareId;

/// Host check plus the per-address feedback budget
fn guard(state: &AppState, caller: &Caller) -> Result<(), StillwaterError> {
    state.gatekeeper.check_host(&caller.headers)?;

    let ip = client_ip(&caller.headers, caller.peer);
    match state
        .feedback_limiter
        .hit(&ip, state.config.feedback.rate_limit)
    {
        WindowDecision::Allowed { .. } => Ok(()),
        WindowDecision::Limited {
            retry_after_secs, ..
        } => {
            tracing::debug!(client_ip = %ip, "Feedback rate limit reached");
            Err(StillwaterError::RateLimited {
                retry_after_secs,
                challenge: None,
            })
        }
    }
}

/// Record one vote and return the updated tally
pub async fn submit_feedback(
    State(state): State<AppState>,
    caller: Caller,
    payload: Result<Json<FeedbackRequest>, JsonRejection>,
) -> ApiResult<Json<FeedbackTally>> {
    guard(&state, &caller)?;

    let Json(request) = payload?;
    let id = ShareId::parse(&request.id)?;
    // Only live shares collect votes
    state.shares.read(&id)?;
    Ok(Json(state.feedback.vote(&id, request.vote)))
}

/// Current tally for a share; zeros when nobody voted
pub async fn get_feedback(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<Json<FeedbackTally>> {
    guard(&state, &caller)?;

    let id = ShareId::parse(&id)?;
    state.shares.read(&id)?;
    Ok(Json(state.feedback.tally(&id)))
}
