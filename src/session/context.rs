use crate::error::Result;
use crate::session::{CredentialStore, StoredSession};

/// The in-memory view of the current session.
///
/// Built either from whatever the [`CredentialStore`] holds or fresh, and
/// torn down explicitly.  Every change goes to the store first so memory and
/// disk agree on whether a session exists.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    session: Option<StoredSession>,
}

impl SessionContext {
    /// Creates a context with no session.
    pub fn fresh() -> Self {
        Self::default()
    }

    /// Creates a context from stored credentials.
    ///
    /// An unreadable or incomplete stored session is discarded and removed
    /// from the store.
    pub fn restore<S: CredentialStore + ?Sized>(store: &S) -> Self {
        match store.load() {
            Ok(Some(session)) if session.is_complete() => Self {
                session: Some(session),
            },
            Ok(None) => Self::fresh(),
            Ok(Some(_)) => {
                tracing::warn!("discarding incomplete stored session");
                Self::discard(store)
            }
            Err(err) => {
                tracing::warn!(error = %err, "discarding unreadable stored session");
                Self::discard(store)
            }
        }
    }

    fn discard<S: CredentialStore + ?Sized>(store: &S) -> Self {
        if let Err(err) = store.clear() {
            tracing::warn!(error = %err, "failed to clear stored session");
        }
        Self::fresh()
    }

    /// Stores and adopts a new session.
    ///
    /// Nothing changes if the session cannot be persisted.
    pub fn establish<S: CredentialStore + ?Sized>(
        &mut self,
        store: &S,
        token: impl Into<String>,
        email: impl Into<String>,
    ) -> Result<()> {
        let session = StoredSession::new(token, email)?;
        store.save(&session)?;
        self.session = Some(session);
        Ok(())
    }

    /// Drops the session from memory and from the store.
    ///
    /// Never fails: a store error is logged and the in-memory session is
    /// cleared regardless.
    pub fn clear<S: CredentialStore + ?Sized>(&mut self, store: &S) {
        self.session = None;
        if let Err(err) = store.clear() {
            tracing::warn!(error = %err, "failed to clear stored session");
        }
    }

    /// Returns true if a session is present.
    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    /// Returns the bearer token.
    pub fn token(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.token.as_str())
    }

    /// Returns the logged-in email.
    pub fn email(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.email.as_str())
    }

    /// Returns the whole session.
    pub fn session(&self) -> Option<&StoredSession> {
        self.session.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{FileCredentialStore, MemoryCredentialStore};
    use time::OffsetDateTime;

    #[test]
    fn fresh_has_no_session() {
        let context = SessionContext::fresh();
        assert!(!context.is_authenticated());
        assert!(context.token().is_none());
        assert!(context.email().is_none());
    }

    #[test]
    fn establish_then_clear() {
        let store = MemoryCredentialStore::new();
        let mut context = SessionContext::fresh();
        context.establish(&store, "tok123", "a@b.com").unwrap();
        assert_eq!(context.token(), Some("tok123"));
        assert_eq!(context.email(), Some("a@b.com"));
        assert_eq!(store.snapshot().unwrap().token, "tok123");

        context.clear(&store);
        assert!(!context.is_authenticated());
        assert!(store.snapshot().is_none());
    }

    #[test]
    fn establish_rejects_half_session() {
        let store = MemoryCredentialStore::new();
        let mut context = SessionContext::fresh();
        assert!(context.establish(&store, "tok123", "").is_err());
        assert!(!context.is_authenticated());
        assert!(store.snapshot().is_none());
    }

    #[test]
    fn restore_from_store() {
        let store =
            MemoryCredentialStore::with_session(StoredSession::new("tok", "a@b.com").unwrap());
        let context = SessionContext::restore(&store);
        assert_eq!(context.email(), Some("a@b.com"));
    }

    #[test]
    fn restore_discards_incomplete_session() {
        let store = MemoryCredentialStore::with_session(StoredSession {
            token: "tok".to_string(),
            email: String::new(),
            saved_at: OffsetDateTime::now_utc(),
        });
        let context = SessionContext::restore(&store);
        assert!(!context.is_authenticated());
        assert!(store.snapshot().is_none());
    }

    #[test]
    fn restore_discards_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "garbage").unwrap();
        let store = FileCredentialStore::with_path(&path);
        let context = SessionContext::restore(&store);
        assert!(!context.is_authenticated());
        assert!(!path.exists());
    }
}
