pub mod link_orchestrator;
pub mod link_session;

pub use link_orchestrator::{LinkOrchestrator, LinkStatus};
pub use link_session::{ClientLinkSession, LinkState, MemoryStorage};
