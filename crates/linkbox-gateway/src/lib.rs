//! HTTP gateway of the link shortener.
//!
//! Every request passes through [`identity::identity_middleware`], which
//! attaches the caller's owner id before the handlers run.

pub mod app;
pub mod backend;
pub mod error;
mod handlers;
pub mod identity;
pub mod model;
pub mod state;

pub use app::App;
pub use backend::select_registry;
pub use error::AppError;
pub use identity::Identity;
pub use state::AppState;
