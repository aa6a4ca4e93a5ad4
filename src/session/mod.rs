//! Durable session state.
//!
//! A [`StoredSession`] is the token/email pair that survives restarts.  It is
//! persisted by a [`CredentialStore`] as one document so the two values can
//! never be observed apart, and it is held in memory by a [`SessionContext`]
//! that the chat controller owns.

mod context;
mod store;

pub use context::SessionContext;
pub use store::{CredentialStore, FileCredentialStore, MemoryCredentialStore, StoredSession};
