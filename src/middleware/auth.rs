use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::{Key, PrivateCookieJar};
use std::convert::Infallible;

use crate::error::DoughError;
use crate::router::DoughState;
use crate::types::User;

pub const SESSION_COOKIE: &str = "__session";

/// Resolves the caller's identity from request context. Sessions are issued
/// elsewhere; implementations only read them.
pub trait IdentityResolver: Send + Sync {
    fn resolve(&self, parts: &Parts) -> Option<User>;
}

/// Reads the user id from the encrypted `__session` cookie.
pub struct SessionCookieResolver {
    key: Key,
}

impl SessionCookieResolver {
    pub fn new(key: Key) -> Self {
        Self { key }
    }

    /// `secret` must hold at least 64 bytes of key material.
    pub fn from_secret(secret: &str) -> Result<Self, DoughError> {
        let key = Key::try_from(secret.as_bytes())
            .map_err(|e| DoughError::Config(format!("session secret: {e}")))?;
        Ok(Self::new(key))
    }
}

impl IdentityResolver for SessionCookieResolver {
    fn resolve(&self, parts: &Parts) -> Option<User> {
        let jar: PrivateCookieJar =
            PrivateCookieJar::from_headers(&parts.headers, self.key.clone());
        let cookie = jar.get(SESSION_COOKIE)?;
        let id = cookie.value().trim();
        (!id.is_empty()).then(|| User::new(id))
    }
}

/// The caller, if signed in. Never rejects; intents that need a user turn
/// `None` into `Unauthorized` themselves.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<User>);

impl FromRequestParts<DoughState> for CurrentUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &DoughState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(state.identity.resolve(parts)))
    }
}
