use super::parse_json;
use crate::error::{AppError, Result};
use crate::identity::Identity;
use crate::model::{BatchShortenRequest, BatchShortenResponse, ShortenRequest, ShortenResponse};
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::header::LOCATION;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use linkbox_core::ShortCode;
use linkbox_shortener::{BatchItem, Shortened, ShortenerError};

fn created_status(shortened: &Shortened) -> StatusCode {
    if shortened.created {
        StatusCode::CREATED
    } else {
        StatusCode::CONFLICT
    }
}

pub async fn create_url_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    body: String,
) -> Result<Response> {
    let shortened = state
        .shortener()
        .shorten(body.trim(), identity.owner())
        .await?;
    let short_url = state.short_url(&shortened.code);
    Ok((created_status(&shortened), short_url).into_response())
}

pub async fn shorten_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    body: Bytes,
) -> Result<Response> {
    let request: ShortenRequest = parse_json(&body)?;
    let shortened = state
        .shortener()
        .shorten(request.url.trim(), identity.owner())
        .await?;
    let response = ShortenResponse {
        result: state.short_url(&shortened.code),
    };
    Ok((created_status(&shortened), Json(response)).into_response())
}

pub async fn shorten_batch_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    body: Bytes,
) -> Result<Response> {
    let requests: Vec<BatchShortenRequest> = parse_json(&body)?;
    let items = requests
        .into_iter()
        .map(|request| BatchItem {
            correlation_id: request.correlation_id,
            original_url: request.original_url.trim().to_string(),
        })
        .collect();

    let shortened = state
        .shortener()
        .shorten_batch(items, identity.owner())
        .await?;
    let response: Vec<_> = shortened
        .into_iter()
        .map(|item| BatchShortenResponse {
            short_url: state.short_url(&item.code),
            correlation_id: item.correlation_id,
        })
        .collect();
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

pub async fn resolve_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Response> {
    let code = ShortCode::new(code.as_str()).map_err(|_| ShortenerError::NotFound(code))?;
    let original_url = state.shortener().resolve(&code).await?;
    let location = HeaderValue::from_str(&original_url)
        .map_err(|err| AppError::Internal(format!("stored url is not a valid header: {err}")))?;
    Ok((StatusCode::TEMPORARY_REDIRECT, [(LOCATION, location)]).into_response())
}
