use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::handlers::health::health_check;
use crate::handlers::link::{accounts_handler, index_action, index_loader};
use crate::middleware::IdentityResolver;
use crate::service::LinkOrchestrator;

/// Shared application state, cheap to clone per request.
#[derive(Clone)]
pub struct DoughState {
    pub orchestrator: LinkOrchestrator,
    pub identity: Arc<dyn IdentityResolver>,
}

impl DoughState {
    pub fn new(orchestrator: LinkOrchestrator, identity: Arc<dyn IdentityResolver>) -> Self {
        Self {
            orchestrator,
            identity,
        }
    }
}

pub fn dough_router(state: DoughState) -> Router {
    Router::new()
        .route("/", get(index_loader).post(index_action))
        .route("/accounts", get(accounts_handler))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
