//! Core types and traits for the linkbox URL shortener.
//!
//! This crate provides the types shared by every storage backend and by the
//! shortener service: short codes, owner identities, stored records and the
//! [`Registry`] contract all backends implement.

pub mod error;
pub mod owner;
pub mod registry;
pub mod shortcode;

pub use error::{CoreError, StorageError};
pub use owner::OwnerId;
pub use registry::{Registry, SaveOutcome, UrlRecord};
pub use shortcode::ShortCode;
