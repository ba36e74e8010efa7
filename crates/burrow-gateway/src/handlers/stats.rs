use crate::error::Result;
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use burrow_core::Stats;

pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<Stats>> {
    Ok(Json(state.links().stats().await?))
}
