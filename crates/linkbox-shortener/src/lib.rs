//! URL shortener service implementation.
//!
//! This crate ties a code [`Generator`](linkbox_generator::Generator) to a
//! [`Registry`](linkbox_core::Registry) and runs owner deletions in the
//! background through the [`DeletionDispatcher`].

pub mod dispatcher;
pub mod error;
pub mod service;
pub mod shortener;

pub use dispatcher::{DeletionDispatcher, DeletionHandle};
pub use error::ShortenerError;
pub use service::{ShortenerService, ShortenerSettings};
pub use shortener::{BatchItem, BatchShortened, Shortened, Shortener};
