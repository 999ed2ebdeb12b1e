pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod plaid;
pub mod router;
pub mod service;
pub mod types;

pub use error::DoughError;
pub use plaid::{AccessCredential, ProviderGateway};
pub use service::LinkOrchestrator;
