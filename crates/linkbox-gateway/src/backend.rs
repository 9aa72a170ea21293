use std::path::Path;
use std::sync::Arc;

use linkbox_core::Registry;
use linkbox_storage::{FileRegistry, InMemoryRegistry, PostgresRegistry};
use tracing::{info, warn};

/// Picks the first backend that comes up: PostgreSQL when a DSN is given,
/// then the JSON file, then process memory.
pub async fn select_registry(
    database_dsn: Option<&str>,
    file_storage_path: Option<&Path>,
) -> Arc<dyn Registry> {
    if let Some(dsn) = database_dsn.filter(|dsn| !dsn.is_empty()) {
        match PostgresRegistry::connect(dsn).await {
            Ok(registry) => {
                info!(storage_backend = "postgres", "registry ready");
                return Arc::new(registry);
            }
            Err(err) => warn!(error = %err, "postgres unavailable, falling back"),
        }
    }

    if let Some(path) = file_storage_path.filter(|path| !path.as_os_str().is_empty()) {
        match FileRegistry::open(path) {
            Ok(registry) => {
                info!(storage_backend = "file", path = %path.display(), "registry ready");
                return Arc::new(registry);
            }
            Err(err) => {
                warn!(error = %err, path = %path.display(), "file storage unavailable, falling back")
            }
        }
    }

    info!(storage_backend = "memory", "registry ready");
    Arc::new(InMemoryRegistry::new())
}
