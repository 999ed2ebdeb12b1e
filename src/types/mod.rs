pub mod intent;
pub mod plaid;
pub mod user;

pub use user::{User, UserId};
