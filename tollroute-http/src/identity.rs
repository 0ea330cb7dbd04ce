//! Caller identity taken from request headers.

use std::convert::Infallible;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use tollroute_core::Caller;

/// Header carrying the public token id.
pub const PUBLIC_TOKEN_HEADER: &str = "x-public-token-id";
/// Header carrying the authenticated user id.
pub const USER_HEADER: &str = "x-user-id";

/// Caller identity; absent or unparsable headers read as `None` and are
/// rejected by the planner where an id is required.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity(pub Caller);

fn header_id(headers: &HeaderMap, name: &str) -> Option<i64> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| raw.trim().parse().ok())
}

impl Identity {
    /// Identity carried by `headers`.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self(Caller {
            public_token_id: header_id(headers, PUBLIC_TOKEN_HEADER),
            user_id: header_id(headers, USER_HEADER),
        })
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Identity {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use rstest::rstest;

    #[rstest]
    #[case(Some("42"), None, Caller { public_token_id: None, user_id: Some(42) })]
    #[case(None, Some(" 7 "), Caller { public_token_id: Some(7), user_id: None })]
    #[case(Some("abc"), None, Caller::default())]
    #[case(None, None, Caller::default())]
    fn reads_identity_headers(
        #[case] user: Option<&'static str>,
        #[case] token: Option<&'static str>,
        #[case] expected: Caller,
    ) {
        let mut headers = HeaderMap::new();
        if let Some(value) = user {
            headers.insert(USER_HEADER, HeaderValue::from_static(value));
        }
        if let Some(value) = token {
            headers.insert(PUBLIC_TOKEN_HEADER, HeaderValue::from_static(value));
        }
        assert_eq!(Identity::from_headers(&headers), Identity(expected));
    }
}
