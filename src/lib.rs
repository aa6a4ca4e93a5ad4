// Public modules
pub mod chat;
pub mod client;
pub mod client_logger;
pub mod error;
pub mod observability;
pub mod session;
pub mod transport;
pub mod types;

// Re-exports
pub use client::Companion;
pub use client_logger::ClientLogger;
pub use error::{Error, Result};
pub use observability::register_biometrics;
pub use session::{
    CredentialStore, FileCredentialStore, MemoryCredentialStore, SessionContext, StoredSession,
};
pub use transport::{HttpTransport, Method, Request, Response, Transport};
pub use types::*;
