use std::sync::Arc;

use burrow_core::{LinkStore, ShortCode};
use burrow_generator::RandomGenerator;
use burrow_shortener::{DeletePipeline, LinkService};

/// The storage backend selected at startup.
pub type SharedStore = Arc<dyn LinkStore>;

/// The link service as wired into the HTTP layer.
pub type Links = LinkService<SharedStore, RandomGenerator>;

#[derive(Clone)]
pub struct AppState {
    links: Links,
    pipeline: Arc<DeletePipeline>,
    base_url: Arc<str>,
}

impl AppState {
    pub fn new(
        links: Links,
        pipeline: Arc<DeletePipeline>,
        public_base_url: impl Into<String>,
    ) -> Self {
        let base_url: String = public_base_url.into();
        Self {
            links,
            pipeline,
            base_url: base_url.trim_end_matches('/').into(),
        }
    }

    pub fn links(&self) -> &Links {
        &self.links
    }

    pub fn pipeline(&self) -> &DeletePipeline {
        &self.pipeline
    }

    /// Renders the public short URL for `code`.
    pub fn short_url(&self, code: &ShortCode) -> String {
        code.to_url(&self.base_url)
    }
}
