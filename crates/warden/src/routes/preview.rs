//! Open Graph image and share landing page.
//!
//! Both endpoints degrade to generic content instead of failing: crawlers
//! get a valid card for any id, and only store-validated text is rendered.

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::gatekeeper::Caller;
use crate::preview::{PreviewText, render_share_page, render_svg};
use crate::state::AppState;
use crate::store::{ShareId, ShareRecord};

const PAGE_CSP: &str = "default-src 'none'; img-src 'self' https:; base-uri 'none'";

#[derive(Deserialize)]
pub struct OgImageQuery {
    id: Option<String>,
}

/// Verified record for `raw`, or nothing
fn lookup(state: &AppState, raw: &str) -> Option<ShareRecord> {
    let id = ShareId::parse(raw).ok()?;
    match state.shares.read(&id) {
        Ok(record) => Some(record),
        Err(e) => {
            tracing::debug!(error = %e, "Preview falling back to generic content");
            None
        }
    }
}

/// SVG preview card for a share
pub async fn og_image(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<OgImageQuery>,
) -> ApiResult<Response> {
    state.gatekeeper.screen(&caller)?;

    let record = query.id.as_deref().and_then(|id| lookup(&state, id));
    let svg = render_svg(record.as_ref().map(|r| PreviewText {
        question: &r.question,
        answer: &r.answer,
    }));

    Ok((
        [
            (header::CONTENT_TYPE, "image/svg+xml"),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        svg,
    )
        .into_response())
}

/// HTML landing page that crawlers read and browsers are redirected from
pub async fn share_page(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    state.gatekeeper.screen(&caller)?;

    let record = lookup(&state, &id);
    let page = render_share_page(
        &state.config.server.public_origin,
        record.as_ref().map(|_| id.as_str()),
        record.as_ref().map(|r| PreviewText {
            question: &r.question,
            answer: &r.answer,
        }),
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8"),
            (header::CONTENT_SECURITY_POLICY, PAGE_CSP),
            (header::CACHE_CONTROL, "public, max-age=300"),
        ],
        page,
    )
        .into_response())
}
