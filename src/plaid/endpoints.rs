use crate::config::PlaidConfig;
use crate::error::{DoughError, ProviderFailure};
use crate::types::plaid::{
    AccountList, AccountsGetRequest, LinkToken, LinkTokenCreateRequest, PlaidError,
    PublicTokenExchange, PublicTokenExchangeRequest,
};

use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

const PLAID_CLIENT_ID: HeaderName = HeaderName::from_static("plaid-client-id");
const PLAID_SECRET: HeaderName = HeaderName::from_static("plaid-secret");

/// The Plaid calls the gateway depends on.
#[async_trait]
pub trait PlaidApi: Send + Sync {
    async fn link_token_create(
        &self,
        request: &LinkTokenCreateRequest,
    ) -> Result<LinkToken, ProviderFailure>;

    async fn item_public_token_exchange(
        &self,
        public_token: &str,
    ) -> Result<PublicTokenExchange, ProviderFailure>;

    async fn accounts_get(&self, access_token: &str) -> Result<AccountList, ProviderFailure>;
}

/// reqwest-backed Plaid client bound to one environment.
#[derive(Clone)]
pub struct PlaidClient {
    http: reqwest::Client,
    base_url: String,
}

impl PlaidClient {
    pub fn new(cfg: &PlaidConfig) -> Result<Self, DoughError> {
        let secret = cfg
            .secret()
            .ok_or_else(|| DoughError::Config("missing Plaid secret".to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(PLAID_CLIENT_ID, header_value(&cfg.client_id, false)?);
        headers.insert(PLAID_SECRET, header_value(secret, true)?);

        let http = reqwest::Client::builder()
            .user_agent(concat!("dough/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(cfg.connect_timeout())
            .timeout(cfg.timeout())
            .default_headers(headers)
            .build()
            .map_err(|e| DoughError::Config(format!("Plaid HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: cfg.base_url(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ProviderFailure>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let resp = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            debug!(path, %status, "Plaid call succeeded");
            return Ok(resp.json::<T>().await?);
        }

        let text = resp.text().await.unwrap_or_default();
        let error = serde_json::from_str::<PlaidError>(&text)
            .unwrap_or_else(|_| PlaidError::unparsed(&text));
        Err(ProviderFailure::Api { status, error })
    }
}

fn header_value(value: &str, sensitive: bool) -> Result<HeaderValue, DoughError> {
    let mut hv = HeaderValue::from_str(value)
        .map_err(|e| DoughError::Config(format!("invalid Plaid header value: {e}")))?;
    hv.set_sensitive(sensitive);
    Ok(hv)
}

#[async_trait]
impl PlaidApi for PlaidClient {
    async fn link_token_create(
        &self,
        request: &LinkTokenCreateRequest,
    ) -> Result<LinkToken, ProviderFailure> {
        self.post("/link/token/create", request).await
    }

    async fn item_public_token_exchange(
        &self,
        public_token: &str,
    ) -> Result<PublicTokenExchange, ProviderFailure> {
        let body = PublicTokenExchangeRequest {
            public_token: public_token.to_string(),
        };
        self.post("/item/public_token/exchange", &body).await
    }

    async fn accounts_get(&self, access_token: &str) -> Result<AccountList, ProviderFailure> {
        let body = AccountsGetRequest {
            access_token: access_token.to_string(),
        };
        self.post("/accounts/get", &body).await
    }
}
