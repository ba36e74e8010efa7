use async_trait::async_trait;
use burrow_core::error::Result;
use burrow_core::{DeleteRequest, LinkRecord, LinkStore, ShortCode, Stats, StoredLink};
use dashmap::DashMap;
use std::collections::HashSet;
use tracing::trace;

/// In-memory implementation of [`LinkStore`] using DashMap.
///
/// DashMap uses sharded locks, so request tasks and the delete pipeline can
/// read and write different buckets without blocking each other. Records are
/// keyed by short code; writing an existing code supersedes the old record.
/// No deduplication by original URL. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    storage: DashMap<String, LinkRecord>,
}

impl InMemoryStore {
    /// Creates a new in-memory store.
    pub fn new() -> Self {
        Self {
            storage: DashMap::new(),
        }
    }

    /// Creates a new in-memory store with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            storage: DashMap::with_capacity(capacity),
        }
    }
}

#[async_trait]
impl LinkStore for InMemoryStore {
    async fn add(&self, record: LinkRecord) -> Result<StoredLink> {
        self.storage
            .insert(record.short_code.as_str().to_owned(), record.clone());
        Ok(StoredLink::Inserted(record))
    }

    async fn add_batch(&self, records: Vec<LinkRecord>) -> Result<Vec<LinkRecord>> {
        for record in &records {
            self.storage
                .insert(record.short_code.as_str().to_owned(), record.clone());
        }
        Ok(records)
    }

    async fn get(&self, code: &ShortCode) -> Result<Option<LinkRecord>> {
        Ok(self.storage.get(code.as_str()).map(|entry| entry.clone()))
    }

    async fn get_all_by_owner(&self, owner_id: &str) -> Result<Vec<LinkRecord>> {
        Ok(self
            .storage
            .iter()
            .filter(|entry| entry.owner_id == owner_id)
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn delete_batch(&self, requests: &[DeleteRequest]) -> Result<()> {
        for request in requests {
            let Some(mut entry) = self.storage.get_mut(request.short_code.as_str()) else {
                trace!(code = %request.short_code, "delete skipped, unknown short code");
                continue;
            };

            if entry.is_owned_by(&request.owner_id) {
                entry.is_deleted = true;
            } else {
                trace!(code = %request.short_code, owner = %request.owner_id, "delete skipped, owner mismatch");
            }
        }
        Ok(())
    }

    async fn stats(&self) -> Result<Stats> {
        let mut owners = HashSet::new();
        let mut urls = 0;
        for entry in self.storage.iter() {
            urls += 1;
            owners.insert(entry.owner_id.clone());
        }
        Ok(Stats::new(urls, owners.len()))
    }
}
