use super::state::ServerState;
use crate::session::{SessionHandle, SessionLookup};

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::IntoResponse,
};
use axum_extra::extract::cookie::CookieJar;
use std::convert::Infallible;
use tracing::{debug, error};

pub const COOKIE_SESSION_TOKEN_KEY: &str = "session_token";
pub const HEADER_SESSION_TOKEN_KEY: &str = "Authorization";

pub enum SessionExtractionError {
    StoreUnavailable,
}

impl IntoResponse for SessionExtractionError {
    fn into_response(self) -> axum::response::Response {
        match self {
            SessionExtractionError::StoreUnavailable => {
                StatusCode::SERVICE_UNAVAILABLE.into_response()
            }
        }
    }
}

fn extract_session_token_from_cookies(parts: &Parts) -> Option<String> {
    CookieJar::from_headers(&parts.headers)
        .get(COOKIE_SESSION_TOKEN_KEY)
        .map(|cookie| cookie.value().to_string())
}

fn extract_session_token_from_headers(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(HEADER_SESSION_TOKEN_KEY)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
}

/// The session handle presented by the client, valid or not.
pub struct SessionToken(pub Option<SessionHandle>);

impl<S: Send + Sync> FromRequestParts<S> for SessionToken {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
        let token = extract_session_token_from_cookies(parts)
            .or_else(|| extract_session_token_from_headers(parts))
            .filter(|token| !token.is_empty())
            .map(SessionHandle);
        if token.is_none() {
            debug!("No token in cookies nor headers.");
        }
        Ok(SessionToken(token))
    }
}

impl FromRequestParts<ServerState> for SessionLookup {
    type Rejection = SessionExtractionError;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        let SessionToken(token) = match SessionToken::from_request_parts(parts, ctx).await {
            Ok(token) => token,
            Err(never) => match never {},
        };
        ctx.portal.resolve(token.as_ref()).map_err(|err| {
            error!("Failed to resolve session: {}", err);
            SessionExtractionError::StoreUnavailable
        })
    }
}
