//! Link domain service and asynchronous delete pipeline.
//!
//! [`LinkService`] creates and resolves links against any
//! [`burrow_core::LinkStore`]. [`DeletePipeline`] accepts work units of
//! delete requests from many callers and applies them in periodic batches
//! through a [`BatchDeleter`].

pub mod error;
pub mod pipeline;
pub mod service;

pub use error::{PipelineError, ShortenerError};
pub use pipeline::{BatchDeleter, DeletePipeline, PipelineSettings, WorkUnit};
pub use service::{BatchLink, CreatedLink, LinkService, NewLink};
