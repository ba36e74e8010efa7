//! Core types and traits for the burrow URL shortener.
//!
//! This crate provides the link model and the storage contract shared by the
//! storage backends, the link service and the HTTP gateway.

pub mod error;
pub mod link;
pub mod shortcode;
pub mod store;

pub use error::{StorageError, ValidationError};
pub use link::{validate_url, DeleteRequest, LinkId, LinkRecord, Stats, StoredLink};
pub use shortcode::ShortCode;
pub use store::LinkStore;
