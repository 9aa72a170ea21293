use super::parse_json;
use crate::error::{AppError, Result};
use crate::identity::Identity;
use crate::model::UserUrlResponse;
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use linkbox_core::ShortCode;
use tracing::debug;

pub async fn list_user_urls_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Response> {
    let owner = identity.presented()?;
    let urls = state.shortener().owner_urls(owner).await?;
    if urls.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let response: Vec<_> = urls
        .into_iter()
        .map(|(code, original_url)| UserUrlResponse {
            short_url: state.short_url(&code),
            original_url,
        })
        .collect();
    Ok(Json(response).into_response())
}

pub async fn delete_user_urls_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    body: Bytes,
) -> Result<StatusCode> {
    let owner = identity.presented()?.clone();
    let requested: Vec<String> = parse_json(&body)?;
    if requested.is_empty() {
        return Err(AppError::BadRequest("no short codes given".to_string()));
    }

    // Malformed codes cannot name a stored record.
    let codes: Vec<ShortCode> = requested
        .into_iter()
        .filter_map(|code| ShortCode::new(code).ok())
        .collect();
    debug!(count = codes.len(), owner = %owner, "scheduling deletion");

    // The deletion keeps running in the background.
    drop(state.shortener().delete(codes, owner));
    Ok(StatusCode::ACCEPTED)
}
