use super::credentials::AccessCredential;
use super::endpoints::PlaidApi;
use crate::config::PlaidConfig;
use crate::db::AccessTokenStorage;
use crate::error::DoughError;
use crate::types::UserId;
use crate::types::plaid::{AccountList, LinkToken, LinkTokenCreateRequest, LinkTokenUser};

use std::sync::Arc;
use tracing::{info, warn};

/// Fixed parameters of every link token request.
#[derive(Debug, Clone)]
pub struct LinkSettings {
    pub client_name: String,
    pub products: Vec<String>,
    pub language: String,
    pub country_codes: Vec<String>,
    pub redirect_uri: Option<String>,
}

impl LinkSettings {
    fn request_for(&self, user_id: &UserId) -> LinkTokenCreateRequest {
        LinkTokenCreateRequest {
            user: LinkTokenUser {
                client_user_id: user_id.to_string(),
            },
            client_name: self.client_name.clone(),
            products: self.products.clone(),
            language: self.language.clone(),
            country_codes: self.country_codes.clone(),
            redirect_uri: self.redirect_uri.clone(),
        }
    }
}

impl From<&PlaidConfig> for LinkSettings {
    fn from(cfg: &PlaidConfig) -> Self {
        Self {
            client_name: cfg.client_name.clone(),
            products: cfg.products.clone(),
            language: cfg.language.clone(),
            country_codes: cfg.country_codes.clone(),
            redirect_uri: cfg.redirect_uri.clone(),
        }
    }
}

/// Sole point of contact with Plaid; writes exchanged tokens to storage.
#[derive(Clone)]
pub struct ProviderGateway {
    api: Arc<dyn PlaidApi>,
    storage: AccessTokenStorage,
    settings: LinkSettings,
}

impl ProviderGateway {
    pub fn new(
        api: Arc<dyn PlaidApi>,
        storage: AccessTokenStorage,
        settings: LinkSettings,
    ) -> Self {
        Self {
            api,
            storage,
            settings,
        }
    }

    pub fn storage(&self) -> &AccessTokenStorage {
        &self.storage
    }

    /// Start a hosted-link session for `user_id`.
    ///
    /// Provider failures are logged with their raw payload and returned as
    /// `ProviderUnavailable`; the payload never reaches the end user.
    pub async fn create_link_session(&self, user_id: &UserId) -> Result<LinkToken, DoughError> {
        let request = self.settings.request_for(user_id);
        match self.api.link_token_create(&request).await {
            Ok(token) => {
                info!(
                    user_id = %user_id,
                    request_id = %token.request_id,
                    expiration = %token.expiration,
                    "link token created"
                );
                Ok(token)
            }
            Err(failure) => {
                warn!(
                    user_id = %user_id,
                    error = %failure,
                    payload = ?failure.payload(),
                    "link token creation failed"
                );
                Err(failure.into())
            }
        }
    }

    /// Trade a one-time public token for an access token and store it.
    pub async fn exchange_public_token(
        &self,
        user_id: &UserId,
        public_token: &str,
    ) -> Result<AccessCredential, DoughError> {
        if public_token.trim().is_empty() {
            return Err(DoughError::InvalidToken);
        }

        let exchange = self
            .api
            .item_public_token_exchange(public_token)
            .await
            .inspect_err(|failure| {
                warn!(
                    user_id = %user_id,
                    error = %failure,
                    payload = ?failure.payload(),
                    "public token exchange failed"
                );
            })?;

        let credential = self
            .storage
            .upsert(user_id, &exchange.access_token, exchange.item_id.as_deref())
            .await?;
        info!(
            user_id = %user_id,
            item_id = ?credential.item_id,
            request_id = %exchange.request_id,
            "access token stored"
        );
        Ok(credential)
    }

    /// Fetch the linked accounts. Fails with `NoCredential` before touching
    /// the network when the user has never linked.
    pub async fn get_accounts(&self, user_id: &UserId) -> Result<AccountList, DoughError> {
        let credential = self
            .storage
            .get_by_user(user_id)
            .await?
            .ok_or(DoughError::NoCredential)?;

        let accounts = self
            .api
            .accounts_get(credential.token())
            .await
            .inspect_err(|failure| {
                warn!(
                    user_id = %user_id,
                    error = %failure,
                    payload = ?failure.payload(),
                    "accounts fetch failed"
                );
            })?;
        info!(user_id = %user_id, count = accounts.accounts.len(), "accounts fetched");
        Ok(accounts)
    }
}
