use crate::db::AccessTokenStorage;
use crate::error::DoughError;
use crate::plaid::ProviderGateway;
use crate::types::User;
use crate::types::plaid::{AccountList, LinkToken};

use serde::Serialize;
use tracing::{info, warn};

/// Whether the caller already has a stored access token. Never carries the token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkStatus {
    pub has_access_token: bool,
}

/// Authorization and sequencing boundary between HTTP handlers and the
/// gateway/store pair.
#[derive(Clone)]
pub struct LinkOrchestrator {
    gateway: ProviderGateway,
}

impl LinkOrchestrator {
    pub fn new(gateway: ProviderGateway) -> Self {
        Self { gateway }
    }

    fn storage(&self) -> &AccessTokenStorage {
        self.gateway.storage()
    }

    /// `None` when Plaid could not issue a token; the UI offers a retry.
    pub async fn request_link_token(
        &self,
        user: Option<&User>,
    ) -> Result<Option<LinkToken>, DoughError> {
        let user = user.ok_or(DoughError::Unauthorized)?;
        match self.gateway.create_link_session(&user.id).await {
            Ok(token) => Ok(Some(token)),
            Err(DoughError::ProviderUnavailable(_)) => {
                warn!(user_id = %user.id, "returning empty link token result");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn exchange_public_token(
        &self,
        user: Option<&User>,
        public_token: Option<&str>,
    ) -> Result<LinkStatus, DoughError> {
        let user = user.ok_or(DoughError::Unauthorized)?;
        let public_token = public_token.ok_or(DoughError::InvalidToken)?;
        self.gateway
            .exchange_public_token(&user.id, public_token)
            .await?;
        info!(user_id = %user.id, "bank account linked");
        Ok(LinkStatus {
            has_access_token: true,
        })
    }

    /// Page-load read path. Anonymous callers get `None`.
    pub async fn link_status(&self, user: Option<&User>) -> Result<Option<LinkStatus>, DoughError> {
        let Some(user) = user else {
            return Ok(None);
        };
        let credential = self.storage().get_by_user(&user.id).await?;
        Ok(Some(LinkStatus {
            has_access_token: credential.is_some(),
        }))
    }

    pub async fn accounts(&self, user: Option<&User>) -> Result<AccountList, DoughError> {
        let user = user.ok_or(DoughError::Unauthorized)?;
        self.gateway.get_accounts(&user.id).await
    }
}
