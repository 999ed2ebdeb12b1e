//! Client-side link flow.
//!
//! Mirrors what the browser does around Plaid's hosted Link UI: obtain a link
//! token (or reuse a cached one), open Link, resume after an OAuth redirect,
//! and report the public token back. The link token lives in client storage
//! only; the server never records it.

use chrono::{DateTime, TimeDelta, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use crate::service::link_orchestrator::LinkStatus;
use crate::types::intent::{IntentForm, LinkTokenResponse};
use crate::types::plaid::LinkToken;

pub const LINK_TOKEN_KEY: &str = "plaid_link_token";
pub const OAUTH_STATE_PARAM: &str = "oauth_state_id";

/// A cached token is dropped this many seconds before Plaid's stated expiration.
pub const REFRESH_MARGIN_SECS: i64 = 300;

/// Key/value storage that survives a page reload (browser local storage).
pub trait LinkTokenStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn remove(&self, key: &str);
}

#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl LinkTokenStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), value);
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LinkState {
    Unlinked,
    LinkPending(LinkToken),
    Linked,
}

/// What the page should do after loading.
#[derive(Debug, Clone, PartialEq)]
pub enum PageAction {
    /// Not signed in; offer sign in / sign up.
    SignIn,
    /// Already linked; nothing to do.
    ShowLinked,
    /// Submit this intent to obtain a link token.
    RequestLinkToken(IntentForm),
    /// A usable token is cached; Link can be opened right away.
    OpenLink(HostedLinkConfig),
}

/// Initialization parameters for Plaid's hosted Link UI.
#[derive(Debug, Clone, PartialEq)]
pub struct HostedLinkConfig {
    pub token: String,
    /// Full current URL when resuming after an OAuth redirect.
    pub received_redirect_uri: Option<String>,
}

/// Error reported by Link when the user leaves without finishing.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkExitError {
    pub error_type: String,
    pub error_code: String,
    pub error_message: String,
}

pub struct ClientLinkSession<S: LinkTokenStorage> {
    storage: S,
    state: LinkState,
    current_url: Url,
}

impl<S: LinkTokenStorage> ClientLinkSession<S> {
    pub fn new(storage: S, current_url: Url) -> Self {
        Self {
            storage,
            state: LinkState::Unlinked,
            current_url,
        }
    }

    pub fn state(&self) -> &LinkState {
        &self.state
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// True when the current URL is Plaid redirecting back mid-OAuth.
    pub fn is_oauth_resumption(&self) -> bool {
        self.current_url
            .query_pairs()
            .any(|(k, _)| k == OAUTH_STATE_PARAM)
    }

    pub fn call_to_action(&self) -> &'static str {
        if self.is_oauth_resumption() {
            "Finish connecting to Plaid"
        } else {
            "Connect to Plaid"
        }
    }

    pub fn on_page_load(
        &mut self,
        signed_in: bool,
        has_access_token: bool,
        now: DateTime<Utc>,
    ) -> PageAction {
        if !signed_in {
            self.state = LinkState::Unlinked;
            return PageAction::SignIn;
        }
        if has_access_token {
            self.state = LinkState::Linked;
            return PageAction::ShowLinked;
        }
        match self.cached_token(now) {
            Some(token) => {
                debug!(expiration = %token.expiration, "reusing cached link token");
                let config = self.hosted_link_config(&token);
                self.state = LinkState::LinkPending(token);
                PageAction::OpenLink(config)
            }
            None => {
                self.state = LinkState::Unlinked;
                PageAction::RequestLinkToken(IntentForm::link_token())
            }
        }
    }

    /// Handle the server's answer to the link token intent. `None` means the
    /// provider failed and the UI should offer a manual retry.
    pub fn on_link_token_response(
        &mut self,
        response: LinkTokenResponse,
    ) -> Option<HostedLinkConfig> {
        let Some(token) = response.link_token else {
            warn!("server returned no link token");
            self.state = LinkState::Unlinked;
            return None;
        };
        match serde_json::to_string(&token) {
            Ok(raw) => self.storage.set(LINK_TOKEN_KEY, raw),
            Err(e) => warn!(error = %e, "failed to cache link token"),
        }
        let config = self.hosted_link_config(&token);
        self.state = LinkState::LinkPending(token);
        Some(config)
    }

    /// Link finished; the returned intent must be submitted right away.
    pub fn on_success(&mut self, public_token: &str, metadata: &Value) -> IntentForm {
        info!(institution = ?metadata.get("institution"), "Plaid Link succeeded");
        IntentForm::exchange(public_token)
    }

    pub fn on_exchange_response(&mut self, status: LinkStatus) {
        if status.has_access_token {
            self.state = LinkState::Linked;
        }
    }

    /// The user left Link. Logged only; there is no automatic retry.
    pub fn on_exit(&mut self, error: Option<&LinkExitError>, metadata: &Value) {
        warn!(error = ?error, metadata = %metadata, "Plaid Link exited");
        if matches!(self.state, LinkState::LinkPending(_)) {
            self.storage.remove(LINK_TOKEN_KEY);
            self.state = LinkState::Unlinked;
        }
    }

    fn hosted_link_config(&self, token: &LinkToken) -> HostedLinkConfig {
        HostedLinkConfig {
            token: token.link_token.clone(),
            received_redirect_uri: self
                .is_oauth_resumption()
                .then(|| self.current_url.to_string()),
        }
    }

    fn cached_token(&self, now: DateTime<Utc>) -> Option<LinkToken> {
        let raw = self.storage.get(LINK_TOKEN_KEY)?;
        let token = match serde_json::from_str::<LinkToken>(&raw) {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "discarding unreadable cached link token");
                self.storage.remove(LINK_TOKEN_KEY);
                return None;
            }
        };
        if now + TimeDelta::seconds(REFRESH_MARGIN_SECS) >= token.expiration {
            debug!(expiration = %token.expiration, "cached link token expired");
            self.storage.remove(LINK_TOKEN_KEY);
            return None;
        }
        Some(token)
    }
}
