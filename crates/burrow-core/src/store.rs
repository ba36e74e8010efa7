use crate::error::Result;
use crate::link::{DeleteRequest, LinkRecord, Stats, StoredLink};
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use std::sync::Arc;

/// The storage contract every backend implements.
///
/// Backends never remove records physically: [`LinkStore::delete_batch`] only
/// flips the soft-delete flag, and only for requests whose owner matches the
/// stored record. Unknown codes and foreign owners are skipped without error.
#[async_trait]
pub trait LinkStore: Send + Sync + 'static {
    /// Persists a single record.
    ///
    /// Backends that deduplicate by original URL return
    /// [`StoredLink::Existing`] carrying the short code the URL is already
    /// stored under; all others always return [`StoredLink::Inserted`].
    async fn add(&self, record: LinkRecord) -> Result<StoredLink>;

    /// Persists a batch of records in a single call.
    async fn add_batch(&self, records: Vec<LinkRecord>) -> Result<Vec<LinkRecord>>;

    /// Retrieves the record for a given short code, deleted or not.
    /// Returns `None` if the code does not exist.
    async fn get(&self, code: &ShortCode) -> Result<Option<LinkRecord>>;

    /// Returns every record created by `owner_id`, soft-deleted ones included.
    async fn get_all_by_owner(&self, owner_id: &str) -> Result<Vec<LinkRecord>>;

    /// Soft-deletes every record whose code and owner match a request.
    async fn delete_batch(&self, requests: &[DeleteRequest]) -> Result<()>;

    /// Counts records and distinct owners.
    async fn stats(&self) -> Result<Stats>;

    /// Checks that the backend is reachable.
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl<S: LinkStore + ?Sized> LinkStore for Arc<S> {
    async fn add(&self, record: LinkRecord) -> Result<StoredLink> {
        (**self).add(record).await
    }

    async fn add_batch(&self, records: Vec<LinkRecord>) -> Result<Vec<LinkRecord>> {
        (**self).add_batch(records).await
    }

    async fn get(&self, code: &ShortCode) -> Result<Option<LinkRecord>> {
        (**self).get(code).await
    }

    async fn get_all_by_owner(&self, owner_id: &str) -> Result<Vec<LinkRecord>> {
        (**self).get_all_by_owner(owner_id).await
    }

    async fn delete_batch(&self, requests: &[DeleteRequest]) -> Result<()> {
        (**self).delete_batch(requests).await
    }

    async fn stats(&self) -> Result<Stats> {
        (**self).stats().await
    }

    async fn ping(&self) -> Result<()> {
        (**self).ping().await
    }
}
