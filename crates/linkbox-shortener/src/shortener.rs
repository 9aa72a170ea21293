use crate::dispatcher::DeletionHandle;
use crate::error::Result;
use async_trait::async_trait;
use linkbox_core::{OwnerId, ShortCode};
use std::collections::BTreeMap;

/// Result of shortening a single URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortened {
    pub code: ShortCode,
    /// `false` when the owner had already shortened this URL.
    pub created: bool,
}

/// One entry of a batch request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItem {
    pub correlation_id: String,
    pub original_url: String,
}

/// One entry of a batch response, matched to its request by correlation id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchShortened {
    pub correlation_id: String,
    pub code: ShortCode,
}

#[async_trait]
pub trait Shortener: Send + Sync + 'static {
    /// Shortens `original_url` for `owner`, reusing the owner's existing code
    /// for the same URL.
    async fn shorten(&self, original_url: &str, owner: &OwnerId) -> Result<Shortened>;

    /// Shortens every item with a fresh code.
    async fn shorten_batch(
        &self,
        items: Vec<BatchItem>,
        owner: &OwnerId,
    ) -> Result<Vec<BatchShortened>>;

    /// Resolves a code to its original URL. Fails with `NotFound` for
    /// unknown codes and `Gone` for deleted ones.
    async fn resolve(&self, code: &ShortCode) -> Result<String>;

    /// Lists every code registered by `owner`.
    async fn owner_urls(&self, owner: &OwnerId) -> Result<BTreeMap<ShortCode, String>>;

    /// Schedules deletion of `codes` for `owner` and returns immediately.
    fn delete(&self, codes: Vec<ShortCode>, owner: OwnerId) -> DeletionHandle;

    /// Checks that the storage backend is reachable.
    async fn ping(&self) -> Result<()>;

    /// Releases the storage backend.
    async fn close(&self) -> Result<()>;
}
