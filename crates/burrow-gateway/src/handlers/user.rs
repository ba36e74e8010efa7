use std::time::Duration;

use crate::error::{AppError, Result};
use crate::extract::Owner;
use crate::model::UserUrlResponse;
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use burrow_core::{DeleteRequest, ShortCode};
use tracing::debug;

/// Upper bound on waiting for room in the delete pipeline.
const SUBMIT_TIMEOUT: Duration = Duration::from_secs(2);

pub async fn user_urls_handler(State(state): State<AppState>, owner: Owner) -> Result<Response> {
    let links = state.links().get_all_by_owner(owner.as_str()).await?;
    if links.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let response: Vec<UserUrlResponse> = links
        .into_iter()
        .map(|link| UserUrlResponse {
            short_url: state.short_url(&link.short_code),
            original_url: link.original_url,
        })
        .collect();
    Ok(Json(response).into_response())
}

/// Queues the listed codes for deletion and answers before they are applied.
pub async fn delete_user_urls_handler(
    State(state): State<AppState>,
    owner: Owner,
    payload: std::result::Result<Json<Vec<String>>, JsonRejection>,
) -> Result<StatusCode> {
    let Json(codes) = payload?;
    let requests = codes
        .into_iter()
        .map(|code| Ok(DeleteRequest::new(ShortCode::parse(code)?, owner.as_str())))
        .collect::<Result<Vec<_>>>()?;

    if requests.is_empty() {
        return Ok(StatusCode::NOT_ACCEPTABLE);
    }

    let count = requests.len();
    tokio::time::timeout(SUBMIT_TIMEOUT, state.pipeline().submit_all(requests))
        .await
        .map_err(|_| AppError::Busy)??;
    debug!(count, owner = %owner.as_str(), "queued delete requests");

    Ok(StatusCode::ACCEPTED)
}
