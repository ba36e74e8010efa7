//! HTTP transport for burrow.
//!
//! Thin axum handlers that validate input, read the caller identity and call
//! into the link service or the delete pipeline.

pub mod app;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod model;
pub mod state;

pub use app::App;
pub use state::{AppState, Links, SharedStore};
