use crate::table::RecordTable;
use async_trait::async_trait;
use linkbox_core::registry::Result;
use linkbox_core::{OwnerId, Registry, SaveOutcome, ShortCode, UrlRecord};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, trace};

/// In-memory implementation of the [`Registry`] trait.
///
/// Everything lives for the lifetime of the process. A single mutex guards
/// the whole map: dedup needs a scan over every record, so sharded maps would
/// not make Save atomic. Save is O(n) in the number of records.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    table: Mutex<RecordTable>,
}

impl InMemoryRegistry {
    /// Creates a new, empty in-memory registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, deleted ones included.
    pub fn len(&self) -> usize {
        self.table.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Registry for InMemoryRegistry {
    async fn get(&self, code: &ShortCode) -> Result<Option<UrlRecord>> {
        Ok(self.table.lock().get(code))
    }

    async fn save(
        &self,
        code: &ShortCode,
        original_url: &str,
        owner: &OwnerId,
    ) -> Result<SaveOutcome> {
        let outcome = self.table.lock().save(code, original_url, owner)?;
        trace!(code = %outcome.code(), created = outcome.is_new(), "saved url");
        Ok(outcome)
    }

    async fn batch_save(&self, items: &[(ShortCode, String)], owner: &OwnerId) -> Result<()> {
        let mut table = self.table.lock();
        for (code, original_url) in items {
            table.insert(code, original_url, owner)?;
        }
        debug!(count = items.len(), owner = %owner, "saved url batch");
        Ok(())
    }

    async fn owner_urls(&self, owner: &OwnerId) -> Result<BTreeMap<ShortCode, String>> {
        Ok(self.table.lock().owner_urls(owner))
    }

    async fn delete(&self, codes: &[ShortCode], owner: &OwnerId) -> Result<()> {
        let changed = self.table.lock().delete(codes, owner);
        debug!(requested = codes.len(), changed, owner = %owner, "marked urls deleted");
        Ok(())
    }

    async fn ping(&self, _timeout: Duration) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
