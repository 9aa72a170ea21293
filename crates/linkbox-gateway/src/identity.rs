use crate::error::{AppError, Result};
use axum::extract::Request;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use linkbox_core::OwnerId;
use tracing::debug;
use uuid::Uuid;

pub const IDENTITY_COOKIE: &str = "user_id";
pub const IDENTITY_MAX_AGE_SECS: u64 = 24 * 60 * 60;

/// Owner attached to every request by [`identity_middleware`].
#[derive(Debug, Clone)]
pub struct Identity {
    owner: OwnerId,
    issued: bool,
}

impl Identity {
    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }

    /// The owner, provided the client presented it.
    pub fn presented(&self) -> Result<&OwnerId> {
        if self.issued {
            return Err(AppError::Unauthorized);
        }
        Ok(&self.owner)
    }
}

pub async fn identity_middleware(mut request: Request, next: Next) -> Result<Response> {
    let identity = match presented_owner(request.headers()) {
        Some(owner) => Identity {
            owner,
            issued: false,
        },
        None => {
            let owner = OwnerId::new(Uuid::new_v4().simple().to_string())
                .map_err(|err| AppError::Internal(err.to_string()))?;
            debug!(owner = %owner, "issued identity");
            Identity {
                owner,
                issued: true,
            }
        }
    };

    let cookie = identity.issued.then(|| identity_cookie(&identity.owner));
    request.extensions_mut().insert(identity);

    let mut response = next.run(request).await;
    if let Some(cookie) = cookie {
        let value =
            HeaderValue::from_str(&cookie).map_err(|err| AppError::Internal(err.to_string()))?;
        response.headers_mut().append(SET_COOKIE, value);
    }
    Ok(response)
}

fn identity_cookie(owner: &OwnerId) -> String {
    format!("{IDENTITY_COOKIE}={owner}; Path=/; HttpOnly; Max-Age={IDENTITY_MAX_AGE_SECS}")
}

fn presented_owner(headers: &HeaderMap) -> Option<OwnerId> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == IDENTITY_COOKIE)
        .and_then(|(_, value)| OwnerId::new(value).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(cookies: &[&str]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for cookie in cookies {
            headers.append(COOKIE, HeaderValue::from_str(cookie).unwrap());
        }
        headers
    }

    #[test]
    fn finds_identity_among_other_cookies() {
        let owner = presented_owner(&headers(&["theme=dark; user_id=abc123; lang=en"]));
        assert_eq!(owner.unwrap().as_str(), "abc123");
    }

    #[test]
    fn looks_through_every_cookie_header() {
        let owner = presented_owner(&headers(&["theme=dark", "user_id=u2"]));
        assert_eq!(owner.unwrap().as_str(), "u2");
    }

    #[test]
    fn empty_or_missing_identity_is_absent() {
        assert!(presented_owner(&headers(&["user_id="])).is_none());
        assert!(presented_owner(&headers(&["session=xyz"])).is_none());
        assert!(presented_owner(&HeaderMap::new()).is_none());
    }

    #[test]
    fn issued_identity_is_not_presented() {
        let identity = Identity {
            owner: OwnerId::new("u1").unwrap(),
            issued: true,
        };
        assert!(matches!(identity.presented(), Err(AppError::Unauthorized)));
    }

    #[test]
    fn cookie_attributes() {
        let cookie = identity_cookie(&OwnerId::new("u1").unwrap());
        assert_eq!(cookie, "user_id=u1; Path=/; HttpOnly; Max-Age=86400");
    }
}
