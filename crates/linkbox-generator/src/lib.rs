pub mod random;

pub use random::{GeneratorError, RandomGenerator};

use linkbox_core::ShortCode;

/// Trait for generating short codes.
///
/// Implementations are pure generators that don't interact with storage, so
/// a generated code may already be taken. Uniqueness is settled by the
/// registry's atomic save, and callers retry with a fresh code on collision.
pub trait Generator: Send + Sync + 'static {
    /// Generates a candidate short code.
    fn generate(&self) -> ShortCode;
}
