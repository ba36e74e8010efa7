//! Storage backends for burrow.
//!
//! Three interchangeable implementations of [`LinkStore`]:
//! - [`InMemoryStore`]: volatile, sharded concurrent map.
//! - [`FileStore`]: append-only JSON lines log replayed into an in-memory index.
//! - [`PostgresStore`]: relational table with a unique constraint on the original URL.

pub mod file;
pub mod memory;
pub mod postgres;

pub use burrow_core::error::Result;
pub use burrow_core::{LinkStore, StorageError};
pub use file::FileStore;
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
