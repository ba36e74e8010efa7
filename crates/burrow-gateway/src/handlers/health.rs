use crate::error::Result;
use crate::state::AppState;
use axum::extract::State;

pub async fn ping_handler(State(state): State<AppState>) -> Result<&'static str> {
    state.links().ping().await?;
    Ok("OK")
}
