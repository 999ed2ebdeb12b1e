//! Form intents and response bodies shared by the HTTP handlers and the
//! client link session.

use serde::{Deserialize, Serialize};

use super::plaid::LinkToken;
use crate::service::link_orchestrator::LinkStatus;

pub const INTENT_LINK_TOKEN: &str = "plaidLinkToken";
pub const INTENT_EXCHANGE: &str = "plaidExchange";

/// URL-encoded body of `POST /`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntentForm {
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub public_token: Option<String>,
}

impl IntentForm {
    pub fn link_token() -> Self {
        Self {
            intent: Some(INTENT_LINK_TOKEN.to_string()),
            public_token: None,
        }
    }

    pub fn exchange(public_token: impl Into<String>) -> Self {
        Self {
            intent: Some(INTENT_EXCHANGE.to_string()),
            public_token: Some(public_token.into()),
        }
    }
}

/// `{ "linkToken": {...} }`, or `{}` when Plaid failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkTokenResponse {
    #[serde(rename = "linkToken", default, skip_serializing_if = "Option::is_none")]
    pub link_token: Option<LinkToken>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExchangeResponse {
    pub token: LinkStatus,
}

/// Read-path body: `{ "hasAccessToken": bool }`, or `{}` for anonymous callers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoaderResponse {
    #[serde(rename = "hasAccessToken", default, skip_serializing_if = "Option::is_none")]
    pub has_access_token: Option<bool>,
}
