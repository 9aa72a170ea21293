use crate::error::StorageError;
use crate::owner::OwnerId;
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// A stored URL record.
///
/// Records are never physically removed: deletion only flips `deleted`, and
/// the flag never goes back to `false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRecord {
    /// The original URL that was shortened.
    pub original_url: String,
    /// The identity that registered the URL.
    pub owner: OwnerId,
    /// Tombstone flag set by [`Registry::delete`].
    #[serde(default)]
    pub deleted: bool,
}

impl UrlRecord {
    pub fn new(original_url: impl Into<String>, owner: OwnerId) -> Self {
        Self {
            original_url: original_url.into(),
            owner,
            deleted: false,
        }
    }
}

/// Outcome of [`Registry::save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// A new record was stored under the candidate code.
    Created(ShortCode),
    /// The (url, owner) pair was already registered under this code.
    Existing(ShortCode),
}

impl SaveOutcome {
    pub fn code(&self) -> &ShortCode {
        match self {
            SaveOutcome::Created(code) | SaveOutcome::Existing(code) => code,
        }
    }

    pub fn into_code(self) -> ShortCode {
        match self {
            SaveOutcome::Created(code) | SaveOutcome::Existing(code) => code,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, SaveOutcome::Created(_))
    }
}

/// The storage contract shared by every backend.
///
/// Implementations must be safe to call concurrently. Save's dedup check and
/// insert happen as one atomic step inside the backend; callers never check
/// for existence first.
#[async_trait]
pub trait Registry: Send + Sync + 'static {
    /// Retrieves the record stored under `code`, deleted or not.
    /// Returns `None` if the code is unknown.
    async fn get(&self, code: &ShortCode) -> Result<Option<UrlRecord>>;

    /// Stores `original_url` for `owner` under `code`.
    ///
    /// If the owner already registered the same URL, returns the existing
    /// code as [`SaveOutcome::Existing`] without writing anything. Returns
    /// `Err(CodeTaken)` if `code` is held by a different record.
    async fn save(
        &self,
        code: &ShortCode,
        original_url: &str,
        owner: &OwnerId,
    ) -> Result<SaveOutcome>;

    /// Stores every `(code, url)` pair for `owner`, in order.
    ///
    /// Atomicity is backend dependent: relational backends roll back the
    /// whole batch on the first failing item, in-process backends keep the
    /// items applied before it.
    async fn batch_save(&self, items: &[(ShortCode, String)], owner: &OwnerId) -> Result<()>;

    /// Returns every record owned by `owner` as code -> original url.
    async fn owner_urls(&self, owner: &OwnerId) -> Result<BTreeMap<ShortCode, String>>;

    /// Marks the given codes deleted when they belong to `owner`.
    /// Unknown codes and codes owned by someone else are ignored.
    async fn delete(&self, codes: &[ShortCode], owner: &OwnerId) -> Result<()>;

    /// Checks that the backend is reachable within `timeout`.
    async fn ping(&self, timeout: Duration) -> Result<()>;

    /// Releases backend resources. Calling it more than once is a no-op.
    async fn close(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_outcome_accessors() {
        let created = SaveOutcome::Created(ShortCode::new_unchecked("ghi"));
        let existing = SaveOutcome::Existing(ShortCode::new_unchecked("ghi"));

        assert!(created.is_new());
        assert!(!existing.is_new());
        assert_eq!(created.code(), existing.code());
        assert_eq!(existing.into_code().as_str(), "ghi");
    }

    #[test]
    fn record_without_deleted_flag_deserializes_as_active() {
        let record: UrlRecord =
            serde_json::from_str(r#"{"original_url":"https://a.com","owner":"u1"}"#).unwrap();
        assert!(!record.deleted);
        assert_eq!(record.owner.as_str(), "u1");
    }
}
