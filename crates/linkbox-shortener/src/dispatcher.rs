use crate::error::{Result, ShortenerError};
use linkbox_core::{OwnerId, Registry, ShortCode, StorageError};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Runs deletions in the background against a registry.
///
/// [`dispatch`](Self::dispatch) spawns the work and returns at once. The
/// spawned task is never aborted; failures are logged whether or not anyone
/// looks at the returned handle.
#[derive(Clone)]
pub struct DeletionDispatcher {
    registry: Arc<dyn Registry>,
}

impl DeletionDispatcher {
    pub fn new(registry: Arc<dyn Registry>) -> Self {
        Self { registry }
    }

    /// Must be called from within a tokio runtime.
    pub fn dispatch(&self, codes: Vec<ShortCode>, owner: OwnerId) -> DeletionHandle {
        let registry = Arc::clone(&self.registry);

        let task = tokio::spawn(async move {
            let result = registry.delete(&codes, &owner).await;
            match &result {
                Ok(()) => debug!(count = codes.len(), owner = %owner, "deletion finished"),
                Err(err) => {
                    warn!(count = codes.len(), owner = %owner, error = %err, "deletion failed")
                }
            }
            result
        });

        DeletionHandle { task }
    }
}

/// Completion handle of a dispatched deletion.
///
/// Dropping it detaches the task, which keeps running.
#[derive(Debug)]
pub struct DeletionHandle {
    task: JoinHandle<std::result::Result<(), StorageError>>,
}

impl DeletionHandle {
    /// Waits for the deletion and returns its result.
    pub async fn outcome(self) -> Result<()> {
        match self.task.await {
            Ok(result) => result.map_err(ShortenerError::from),
            Err(err) => Err(ShortenerError::Deletion(err.to_string())),
        }
    }
}
