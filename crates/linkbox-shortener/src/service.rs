use crate::dispatcher::{DeletionDispatcher, DeletionHandle};
use crate::error::{Result, ShortenerError};
use crate::shortener::{BatchItem, BatchShortened, Shortened, Shortener};
use async_trait::async_trait;
use linkbox_core::{OwnerId, Registry, ShortCode, StorageError};
use linkbox_generator::{Generator, RandomGenerator};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};
use typed_builder::TypedBuilder;

/// Tunables of [`ShortenerService`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct ShortenerSettings {
    /// Candidate codes tried per URL before giving up. `None` retries until
    /// a free code is found.
    #[builder(default, setter(strip_option))]
    pub max_attempts: Option<NonZeroUsize>,
    /// Upper bound for a storage liveness check.
    #[builder(default = Duration::from_secs(1))]
    pub ping_timeout: Duration,
}

impl Default for ShortenerSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// A concrete implementation of the [`Shortener`] trait.
///
/// Pairs a [`Generator`] with a [`Registry`]. The registry's save is the
/// only uniqueness check: a generated code that turns out to be taken is
/// replaced by a fresh one and saved again.
pub struct ShortenerService<G = RandomGenerator> {
    registry: Arc<dyn Registry>,
    generator: Arc<G>,
    dispatcher: DeletionDispatcher,
    settings: ShortenerSettings,
}

impl<G: Generator> ShortenerService<G> {
    pub fn new(registry: Arc<dyn Registry>, generator: G, settings: ShortenerSettings) -> Self {
        Self {
            dispatcher: DeletionDispatcher::new(Arc::clone(&registry)),
            registry,
            generator: Arc::new(generator),
            settings,
        }
    }

    /// Only emptiness is checked.
    fn validate_url(url: &str) -> Result<()> {
        if url.trim().is_empty() {
            return Err(ShortenerError::InvalidUrl(
                "URL cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn check_attempts(&self, attempts: usize) -> Result<()> {
        match self.settings.max_attempts {
            Some(max) if attempts >= max.get() => {
                Err(ShortenerError::CodeSpaceExhausted { attempts })
            }
            _ => Ok(()),
        }
    }

    /// Drops the items ahead of `failed` that the registry kept when a batch
    /// stopped there. Backends that roll back keep none of them.
    async fn unapplied(
        &self,
        pending: Vec<(ShortCode, String)>,
        failed: usize,
        owner: &OwnerId,
    ) -> Result<Vec<(ShortCode, String)>> {
        let mut remaining = Vec::with_capacity(pending.len());
        for (index, (code, original_url)) in pending.into_iter().enumerate() {
            if index < failed {
                let stored = self.registry.get(&code).await?;
                if stored.is_some_and(|record| {
                    record.original_url == original_url && &record.owner == owner
                }) {
                    continue;
                }
            }
            remaining.push((code, original_url));
        }
        Ok(remaining)
    }

    /// Generates a code not contained in `taken`.
    fn fresh_code(&self, taken: &HashSet<ShortCode>) -> Result<ShortCode> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let code = self.generator.generate();
            if !taken.contains(&code) {
                return Ok(code);
            }
            self.check_attempts(attempts)?;
        }
    }
}

#[async_trait]
impl<G: Generator> Shortener for ShortenerService<G> {
    async fn shorten(&self, original_url: &str, owner: &OwnerId) -> Result<Shortened> {
        Self::validate_url(original_url)?;

        let mut attempts = 0;
        loop {
            attempts += 1;
            let candidate = self.generator.generate();

            match self.registry.save(&candidate, original_url, owner).await {
                Ok(outcome) => {
                    debug!(code = %outcome.code(), created = outcome.is_new(), owner = %owner, "shortened url");
                    return Ok(Shortened {
                        created: outcome.is_new(),
                        code: outcome.into_code(),
                    });
                }
                Err(StorageError::CodeTaken(_)) => {
                    trace!(code = %candidate, attempts, "generated code is taken, retrying");
                    self.check_attempts(attempts)?;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    async fn shorten_batch(
        &self,
        items: Vec<BatchItem>,
        owner: &OwnerId,
    ) -> Result<Vec<BatchShortened>> {
        if items.is_empty() {
            return Err(ShortenerError::EmptyBatch);
        }
        for item in &items {
            Self::validate_url(&item.original_url)?;
        }

        // Repeated URLs inside one batch share a code.
        let mut by_url: HashMap<&str, ShortCode> = HashMap::new();
        let mut taken = HashSet::new();
        let mut pending = Vec::new();
        for item in &items {
            if !by_url.contains_key(item.original_url.as_str()) {
                let code = self.fresh_code(&taken)?;
                taken.insert(code.clone());
                by_url.insert(&item.original_url, code.clone());
                pending.push((code, item.original_url.clone()));
            }
        }

        let mut attempts = 0;
        loop {
            attempts += 1;
            let failed = match self.registry.batch_save(&pending, owner).await {
                Ok(()) => break,
                Err(StorageError::CodeTaken(taken_code)) => pending
                    .iter()
                    .position(|(code, _)| code.as_str() == taken_code)
                    .ok_or(StorageError::CodeTaken(taken_code))?,
                Err(err) => return Err(err.into()),
            };
            trace!(code = %pending[failed].0, attempts, "batch code is taken, retrying");
            self.check_attempts(attempts)?;

            let fresh = self.fresh_code(&taken)?;
            taken.insert(fresh.clone());
            if let Some(code) = by_url.get_mut(pending[failed].1.as_str()) {
                *code = fresh.clone();
            }
            pending[failed].0 = fresh;
            pending = self.unapplied(pending, failed, owner).await?;
        }
        debug!(count = by_url.len(), owner = %owner, "shortened url batch");

        Ok(items
            .iter()
            .filter_map(|item| {
                by_url
                    .get(item.original_url.as_str())
                    .map(|code| BatchShortened {
                        correlation_id: item.correlation_id.clone(),
                        code: code.clone(),
                    })
            })
            .collect())
    }

    async fn resolve(&self, code: &ShortCode) -> Result<String> {
        trace!(code = %code, "resolving short code");

        match self.registry.get(code).await? {
            None => Err(ShortenerError::NotFound(code.to_string())),
            Some(record) if record.deleted => Err(ShortenerError::Gone(code.to_string())),
            Some(record) => Ok(record.original_url),
        }
    }

    async fn owner_urls(&self, owner: &OwnerId) -> Result<BTreeMap<ShortCode, String>> {
        Ok(self.registry.owner_urls(owner).await?)
    }

    fn delete(&self, codes: Vec<ShortCode>, owner: OwnerId) -> DeletionHandle {
        self.dispatcher.dispatch(codes, owner)
    }

    async fn ping(&self) -> Result<()> {
        Ok(self.registry.ping(self.settings.ping_timeout).await?)
    }

    async fn close(&self) -> Result<()> {
        Ok(self.registry.close().await?)
    }
}
