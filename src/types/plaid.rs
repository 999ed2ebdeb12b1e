//! Wire types for the subset of the Plaid API this service calls.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
pub struct LinkTokenUser {
    pub client_user_id: String,
}

/// Body of `POST /link/token/create`.
#[derive(Debug, Clone, Serialize)]
pub struct LinkTokenCreateRequest {
    pub user: LinkTokenUser,
    pub client_name: String,
    pub products: Vec<String>,
    pub language: String,
    pub country_codes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
}

/// A hosted-link session handle. Returned to the client verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkToken {
    pub link_token: String,
    pub expiration: DateTime<Utc>,
    #[serde(default)]
    pub request_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublicTokenExchangeRequest {
    pub public_token: String,
}

#[derive(Deserialize)]
pub struct PublicTokenExchange {
    pub access_token: String,
    #[serde(default)]
    pub item_id: Option<String>,
    #[serde(default)]
    pub request_id: String,
}

impl std::fmt::Debug for PublicTokenExchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublicTokenExchange")
            .field("access_token", &"<redacted>")
            .field("item_id", &self.item_id)
            .field("request_id", &self.request_id)
            .finish()
    }
}

#[derive(Serialize)]
pub struct AccountsGetRequest {
    pub access_token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountList {
    pub accounts: Vec<Account>,
    #[serde(default)]
    pub item: Value,
    #[serde(default)]
    pub request_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub account_id: String,
    pub name: String,
    #[serde(default)]
    pub official_name: Option<String>,
    #[serde(default)]
    pub mask: Option<String>,
    #[serde(rename = "type")]
    pub account_type: String,
    #[serde(default)]
    pub subtype: Option<String>,
    pub balances: Balances,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balances {
    #[serde(default)]
    pub available: Option<f64>,
    #[serde(default)]
    pub current: Option<f64>,
    #[serde(default)]
    pub limit: Option<f64>,
    #[serde(default)]
    pub iso_currency_code: Option<String>,
    #[serde(default)]
    pub unverified_currency_code: Option<String>,
}

/// Error payload Plaid returns with every non-2xx response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaidError {
    pub error_type: String,
    pub error_code: String,
    pub error_message: String,
    #[serde(default)]
    pub display_message: Option<String>,
    #[serde(default)]
    pub request_id: Option<String>,
}

impl PlaidError {
    /// Stand-in for responses whose body is not a Plaid error object.
    pub fn unparsed(body: &str) -> Self {
        Self {
            error_type: "API_ERROR".to_string(),
            error_code: "UNPARSEABLE_RESPONSE".to_string(),
            error_message: body.chars().take(512).collect(),
            display_message: None,
            request_id: None,
        }
    }
}
