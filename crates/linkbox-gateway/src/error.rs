use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use linkbox_shortener::ShortenerError;
use thiserror::Error;
use tracing::error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Shortener(#[from] ShortenerError),
    #[error("unauthorized")]
    Unauthorized,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            // Unknown codes answer 400, not 404.
            AppError::Shortener(ShortenerError::NotFound(_)) => StatusCode::BAD_REQUEST,
            AppError::Shortener(ShortenerError::Gone(_)) => StatusCode::GONE,
            AppError::Shortener(ShortenerError::InvalidUrl(_) | ShortenerError::EmptyBatch) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Shortener(
                ShortenerError::CodeSpaceExhausted { .. }
                | ShortenerError::Deletion(_)
                | ShortenerError::Storage(_),
            ) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkbox_core::StorageError;

    #[test]
    fn status_mapping() {
        let cases = [
            (ShortenerError::NotFound("x".into()), StatusCode::BAD_REQUEST),
            (ShortenerError::Gone("x".into()), StatusCode::GONE),
            (ShortenerError::InvalidUrl("x".into()), StatusCode::BAD_REQUEST),
            (ShortenerError::EmptyBatch, StatusCode::BAD_REQUEST),
            (
                ShortenerError::CodeSpaceExhausted { attempts: 3 },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ShortenerError::Storage(StorageError::Unavailable("down".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(AppError::from(err).status(), expected);
        }
        assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
    }
}
