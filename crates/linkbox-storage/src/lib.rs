//! Storage backends implementing the [`Registry`] contract.
//!
//! - [`InMemoryRegistry`]: process-lifetime map.
//! - [`FileRegistry`]: the in-memory map plus a JSON snapshot on disk.
//! - [`PostgresRegistry`]: a `urls` table whose constraints enforce dedup.

pub mod file;
pub mod memory;
pub mod postgres;
mod table;

pub use file::FileRegistry;
pub use linkbox_core::{OwnerId, Registry, SaveOutcome, ShortCode, StorageError, UrlRecord};
pub use memory::InMemoryRegistry;
pub use postgres::PostgresRegistry;
