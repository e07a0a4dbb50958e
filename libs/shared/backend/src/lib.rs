pub mod client;
pub mod models;
pub mod session;

pub use client::BackendClient;
pub use models::*;
pub use session::AuthSession;
