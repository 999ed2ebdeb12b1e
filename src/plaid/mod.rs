//! Plaid provider gateway.
//!
//! - `endpoints.rs`: the `PlaidApi` seam and its reqwest-backed client
//! - `service.rs`: the gateway composing provider calls with credential storage
//! - `credentials.rs`: the stored access credential

pub mod credentials;
pub mod endpoints;
pub mod service;

pub use credentials::AccessCredential;
pub use endpoints::{PlaidApi, PlaidClient};
pub use service::{LinkSettings, ProviderGateway};
