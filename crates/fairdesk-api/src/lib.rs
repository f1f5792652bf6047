// fairdesk-api: Async Rust client for the fairdesk hosted data service (REST + auth)

pub mod client;
pub mod error;
pub mod session;
pub mod transport;

pub use client::ServiceClient;
pub use error::Error;
pub use session::Session;
pub use transport::{TlsMode, TransportConfig};
