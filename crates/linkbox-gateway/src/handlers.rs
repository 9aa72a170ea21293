mod health;
mod url;
mod user;

pub use health::ping_handler;
pub use url::{create_url_handler, resolve_handler, shorten_batch_handler, shorten_handler};
pub use user::{delete_user_urls_handler, list_user_urls_handler};

use crate::error::{AppError, Result};
use serde::de::DeserializeOwned;

fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|err| AppError::BadRequest(err.to_string()))
}
