use axum::{
    Form, Json,
    extract::State,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::debug;

use crate::middleware::CurrentUser;
use crate::types::intent::{
    ExchangeResponse, INTENT_EXCHANGE, INTENT_LINK_TOKEN, IntentForm, LinkTokenResponse,
    LoaderResponse,
};
use crate::types::plaid::AccountList;
use crate::{DoughError, router::DoughState};

/// GET / -> whether the signed-in user has already linked a bank account.
pub async fn index_loader(
    State(state): State<DoughState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<LoaderResponse>, DoughError> {
    let status = state.orchestrator.link_status(user.as_ref()).await?;
    Ok(Json(LoaderResponse {
        has_access_token: status.map(|s| s.has_access_token),
    }))
}

/// POST / -> dispatch on the form's `intent` field.
pub async fn index_action(
    State(state): State<DoughState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<IntentForm>,
) -> Result<Response, DoughError> {
    match form.intent.as_deref() {
        Some(INTENT_EXCHANGE) => {
            let token = state
                .orchestrator
                .exchange_public_token(user.as_ref(), form.public_token.as_deref())
                .await?;
            Ok(Json(ExchangeResponse { token }).into_response())
        }
        Some(INTENT_LINK_TOKEN) => {
            let link_token = state.orchestrator.request_link_token(user.as_ref()).await?;
            Ok(Json(LinkTokenResponse { link_token }).into_response())
        }
        other => {
            debug!(intent = ?other, "ignoring unknown intent");
            Ok(Json(json!({})).into_response())
        }
    }
}

/// GET /accounts -> the linked accounts as reported by Plaid.
pub async fn accounts_handler(
    State(state): State<DoughState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<AccountList>, DoughError> {
    let accounts = state.orchestrator.accounts(user.as_ref()).await?;
    Ok(Json(accounts))
}
