use crate::error::{AppError, Result};
use crate::extract::Owner;
use crate::model::{BatchItemRequest, BatchItemResponse, ShortenRequest, ShortenResponse};
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use burrow_core::ShortCode;
use burrow_shortener::NewLink;
use tracing::debug;

fn trim_line_end(input: &str) -> &str {
    input.trim_end_matches(['\r', '\n'])
}

fn created_status(is_duplicate: bool) -> StatusCode {
    if is_duplicate {
        StatusCode::CONFLICT
    } else {
        StatusCode::CREATED
    }
}

/// `POST /` with the URL as a plain text body.
pub async fn create_text_handler(
    State(state): State<AppState>,
    owner: Owner,
    body: String,
) -> Result<Response> {
    let created = state
        .links()
        .create_link(trim_line_end(&body), owner.as_str())
        .await?;

    Ok((
        created_status(created.is_duplicate),
        [(header::CONTENT_TYPE, "text/plain")],
        state.short_url(&created.record.short_code),
    )
        .into_response())
}

pub async fn shorten_handler(
    State(state): State<AppState>,
    owner: Owner,
    payload: std::result::Result<Json<ShortenRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) = payload?;
    let created = state
        .links()
        .create_link(trim_line_end(&request.url), owner.as_str())
        .await?;

    let response = ShortenResponse {
        result: state.short_url(&created.record.short_code),
    };
    Ok((created_status(created.is_duplicate), Json(response)).into_response())
}

pub async fn batch_handler(
    State(state): State<AppState>,
    owner: Owner,
    payload: std::result::Result<Json<Vec<BatchItemRequest>>, JsonRejection>,
) -> Result<Response> {
    let Json(items) = payload?;
    if items.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let links = items
        .into_iter()
        .map(|item| NewLink::new(item.correlation_id, trim_line_end(&item.original_url)))
        .collect();
    let created = state.links().create_link_batch(links, owner.as_str()).await?;

    let response: Vec<BatchItemResponse> = created
        .into_iter()
        .map(|link| BatchItemResponse {
            short_url: state.short_url(&link.record.short_code),
            correlation_id: link.correlation_id,
        })
        .collect();
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

pub async fn redirect_handler(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Redirect> {
    let code = ShortCode::parse(id)?;
    let record = state
        .links()
        .get_url(&code)
        .await?
        .ok_or(AppError::NotFound)?;

    if record.is_deleted {
        debug!(code = %code, "redirect to deleted link refused");
        return Err(AppError::Gone);
    }

    Ok(Redirect::temporary(&record.original_url))
}
