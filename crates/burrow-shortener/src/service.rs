use crate::error::ShortenerError;
use burrow_core::{
    validate_url, DeleteRequest, LinkRecord, LinkStore, ShortCode, Stats, StorageError,
    StoredLink,
};
use burrow_generator::Generator;
use std::sync::Arc;
use tracing::debug;

type Result<T> = std::result::Result<T, ShortenerError>;

/// One item of a batch creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLink {
    pub correlation_id: String,
    pub original_url: String,
}

impl NewLink {
    pub fn new(correlation_id: impl Into<String>, original_url: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            original_url: original_url.into(),
        }
    }
}

/// Result of [`LinkService::create_link`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedLink {
    pub record: LinkRecord,
    /// `true` when the URL was already stored and `record` is the existing link.
    pub is_duplicate: bool,
}

/// One stored link of a batch, paired with the caller's correlation id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchLink {
    pub correlation_id: String,
    pub record: LinkRecord,
}

/// The link domain service.
///
/// Wraps a [`LinkStore`] and a [`Generator`]. The generator is responsible for
/// the uniqueness of generated short codes; no collision retry is performed.
/// Backend errors are wrapped with the failing operation and never retried.
#[derive(Debug)]
pub struct LinkService<S, G> {
    store: Arc<S>,
    generator: Arc<G>,
}

impl<S, G> Clone for LinkService<S, G> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            generator: Arc::clone(&self.generator),
        }
    }
}

impl<S: LinkStore, G: Generator> LinkService<S, G> {
    pub fn new(store: S, generator: G) -> Self {
        Self {
            store: Arc::new(store),
            generator: Arc::new(generator),
        }
    }

    fn new_record(&self, original_url: impl Into<String>, owner_id: &str) -> LinkRecord {
        LinkRecord::new(
            self.generator.link_id(),
            self.generator.generate().into(),
            original_url,
            owner_id,
        )
    }

    /// Shortens `original_url` on behalf of `owner_id`.
    ///
    /// When the backend already stores the URL under another code, the
    /// existing record is returned with `is_duplicate` set and the freshly
    /// generated code is discarded.
    pub async fn create_link(&self, original_url: &str, owner_id: &str) -> Result<CreatedLink> {
        const OP: &str = "create link";
        validate_url(original_url)?;

        let record = self.new_record(original_url, owner_id);
        let stored = self
            .store
            .add(record)
            .await
            .map_err(ShortenerError::storage(OP))?;

        match stored {
            StoredLink::Inserted(record) => Ok(CreatedLink {
                record,
                is_duplicate: false,
            }),
            StoredLink::Existing(code) => {
                debug!(code = %code, url = %original_url, "url already shortened");
                let record = self
                    .store
                    .get(&code)
                    .await
                    .map_err(ShortenerError::storage(OP))?
                    .ok_or_else(|| ShortenerError::Storage {
                        op: OP,
                        source: StorageError::InvalidData(format!(
                            "existing short code '{code}' is missing"
                        )),
                    })?;
                Ok(CreatedLink {
                    record,
                    is_duplicate: true,
                })
            }
        }
    }

    /// Shortens every item in one backend call.
    ///
    /// A single invalid URL rejects the whole batch before the backend is
    /// contacted. Duplicates are not resolved per item. Results keep the
    /// input order.
    pub async fn create_link_batch(
        &self,
        links: Vec<NewLink>,
        owner_id: &str,
    ) -> Result<Vec<BatchLink>> {
        if links.is_empty() {
            return Ok(Vec::new());
        }

        for link in &links {
            validate_url(&link.original_url)?;
        }

        let (correlation_ids, records): (Vec<String>, Vec<LinkRecord>) = links
            .into_iter()
            .map(|link| {
                let record = self.new_record(link.original_url, owner_id);
                (link.correlation_id, record)
            })
            .unzip();

        let stored = self
            .store
            .add_batch(records)
            .await
            .map_err(ShortenerError::storage("create link batch"))?;
        debug!(count = stored.len(), owner = %owner_id, "stored link batch");

        Ok(correlation_ids
            .into_iter()
            .zip(stored)
            .map(|(correlation_id, record)| BatchLink {
                correlation_id,
                record,
            })
            .collect())
    }

    /// Looks up a link. Soft-deleted links are returned with `is_deleted` set.
    pub async fn get_url(&self, code: &ShortCode) -> Result<Option<LinkRecord>> {
        self.store
            .get(code)
            .await
            .map_err(ShortenerError::storage("get url"))
    }

    pub async fn get_all_by_owner(&self, owner_id: &str) -> Result<Vec<LinkRecord>> {
        self.store
            .get_all_by_owner(owner_id)
            .await
            .map_err(ShortenerError::storage("get links by owner"))
    }

    /// Soft-deletes the links whose owner matches the request.
    pub async fn delete_batch(&self, requests: &[DeleteRequest]) -> Result<()> {
        self.store
            .delete_batch(requests)
            .await
            .map_err(ShortenerError::storage("delete batch"))
    }

    pub async fn stats(&self) -> Result<Stats> {
        self.store
            .stats()
            .await
            .map_err(ShortenerError::storage("get stats"))
    }

    /// Checks that the backend is reachable.
    pub async fn ping(&self) -> Result<()> {
        self.store
            .ping()
            .await
            .map_err(ShortenerError::storage("ping"))
    }
}
