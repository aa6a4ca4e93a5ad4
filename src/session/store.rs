use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{Error, Result};

const SESSION_FILE_NAME: &str = "session.json";
const APP_DIR_NAME: &str = "companion";

/// The token and email of a logged-in user, as persisted between runs.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredSession {
    /// Opaque bearer token.
    pub token: String,
    /// Email of the logged-in account.
    pub email: String,
    /// When the session was stored.
    #[serde(with = "time::serde::rfc3339")]
    pub saved_at: OffsetDateTime,
}

impl StoredSession {
    /// Creates a session stamped with the current time.
    ///
    /// Both values are required; an empty token or email is rejected.
    pub fn new(token: impl Into<String>, email: impl Into<String>) -> Result<Self> {
        let session = Self {
            token: token.into(),
            email: email.into(),
            saved_at: OffsetDateTime::now_utc(),
        };
        if !session.is_complete() {
            return Err(Error::validation(
                "a session needs both a token and an email",
                Some("session".to_string()),
            ));
        }
        Ok(session)
    }

    /// Returns true if both the token and the email are present.
    pub fn is_complete(&self) -> bool {
        !self.token.trim().is_empty() && !self.email.trim().is_empty()
    }
}

impl fmt::Debug for StoredSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredSession")
            .field("token", &"<redacted>")
            .field("email", &self.email)
            .field("saved_at", &self.saved_at)
            .finish()
    }
}

/// Durable storage for the current session.
///
/// Implementations store the whole [`StoredSession`] atomically: after any
/// call returns, `load` yields either the complete session or nothing.
pub trait CredentialStore: Send + Sync {
    /// Reads the stored session, if any.
    fn load(&self) -> Result<Option<StoredSession>>;

    /// Replaces the stored session.
    fn save(&self, session: &StoredSession) -> Result<()>;

    /// Removes the stored session.  Clearing an empty store succeeds.
    fn clear(&self) -> Result<()>;
}

/// Stores the session as a JSON file.
///
/// The default location is `<config dir>/companion/session.json`.  Writes go
/// to a sibling temporary file that is renamed into place.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Creates a store at the default location.
    pub fn new() -> Result<Self> {
        let dir = dirs::config_dir()
            .ok_or_else(|| Error::configuration("Cannot find the user config directory"))?;
        Ok(Self::with_path(dir.join(APP_DIR_NAME).join(SESSION_FILE_NAME)))
    }

    /// Creates a store at a custom path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path of the session file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| SESSION_FILE_NAME.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<StoredSession>> {
        let content = match fs::read(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(Error::io("failed to read session file", err)),
        };
        let session = serde_json::from_slice(&content).map_err(|err| {
            Error::serialization("failed to parse session file", Some(Box::new(err)))
        })?;
        Ok(Some(session))
    }

    fn save(&self, session: &StoredSession) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|err| Error::io("failed to create session directory", err))?;
            }
        }
        let content = serde_json::to_vec_pretty(session).map_err(|err| {
            Error::serialization("failed to serialize session", Some(Box::new(err)))
        })?;
        let temp = self.temp_path();
        let written = write_private(&temp, &content).and_then(|()| {
            fs::rename(&temp, &self.path)
                .map_err(|err| Error::io("failed to move session file into place", err))
        });
        if written.is_err() {
            let _ = fs::remove_file(&temp);
        }
        written
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Error::io("failed to remove session file", err)),
        }
    }
}

/// Writes `content` to a file only its owner can read.  The mode is set
/// when the file is created, and reset if a stale file was left behind.
#[cfg(unix)]
fn write_private(path: &Path, content: &[u8]) -> Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
        .map_err(|err| Error::io("failed to write session file", err))?;
    file.set_permissions(fs::Permissions::from_mode(0o600))
        .map_err(|err| Error::io("failed to restrict session file permissions", err))?;
    file.write_all(content)
        .and_then(|()| file.sync_all())
        .map_err(|err| Error::io("failed to write session file", err))
}

#[cfg(not(unix))]
fn write_private(path: &Path, content: &[u8]) -> Result<()> {
    fs::write(path, content).map_err(|err| Error::io("failed to write session file", err))
}

/// Keeps the session in memory only; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    session: Mutex<Option<StoredSession>>,
}

impl MemoryCredentialStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `session`.
    pub fn with_session(session: StoredSession) -> Self {
        Self {
            session: Mutex::new(Some(session)),
        }
    }

    /// Returns a copy of the stored session.
    pub fn snapshot(&self) -> Option<StoredSession> {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<StoredSession>> {
        Ok(self.snapshot())
    }

    fn save(&self, session: &StoredSession) -> Result<()> {
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_session_requires_both_values() {
        assert!(StoredSession::new("tok", "a@b.com").is_ok());
        assert!(StoredSession::new("", "a@b.com").unwrap_err().is_validation());
        assert!(StoredSession::new("tok", "  ").unwrap_err().is_validation());
    }

    #[test]
    fn debug_redacts_token() {
        let session = StoredSession::new("tok123", "a@b.com").unwrap();
        let debug = format!("{session:?}");
        assert!(!debug.contains("tok123"));
        assert!(debug.contains("a@b.com"));
    }

    #[test]
    fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::with_path(dir.path().join("nested").join("session.json"));
        assert!(store.load().unwrap().is_none());

        let session = StoredSession::new("tok123", "a@b.com").unwrap();
        store.save(&session).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.token, "tok123");
        assert_eq!(loaded.email, "a@b.com");
        assert!(!store.temp_path().exists());

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        assert!(!store.path().exists());
        store.clear().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn file_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::with_path(dir.path().join("session.json"));
        store
            .save(&StoredSession::new("tok", "a@b.com").unwrap())
            .unwrap();
        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn file_store_tightens_stale_temp_file() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::with_path(dir.path().join("session.json"));
        fs::write(store.temp_path(), "stale").unwrap();
        fs::set_permissions(store.temp_path(), fs::Permissions::from_mode(0o644)).unwrap();
        store
            .save(&StoredSession::new("tok", "a@b.com").unwrap())
            .unwrap();
        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(store.load().unwrap().unwrap().token, "tok");
    }

    #[test]
    fn failed_save_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        // A non-empty directory in the way makes the final rename fail.
        fs::create_dir(&path).unwrap();
        fs::write(path.join("occupied"), "x").unwrap();
        let store = FileCredentialStore::with_path(&path);
        let err = store
            .save(&StoredSession::new("tok", "a@b.com").unwrap())
            .unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
        assert!(!store.temp_path().exists());
        assert!(path.is_dir());
    }

    #[test]
    fn file_store_reports_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{\"token\": \"tok\"").unwrap();
        let store = FileCredentialStore::with_path(path);
        assert!(matches!(store.load(), Err(Error::Serialization { .. })));
    }

    #[test]
    fn memory_store() {
        let store = MemoryCredentialStore::new();
        assert!(store.load().unwrap().is_none());
        store
            .save(&StoredSession::new("tok", "a@b.com").unwrap())
            .unwrap();
        assert_eq!(store.snapshot().unwrap().email, "a@b.com");
        store.clear().unwrap();
        assert!(store.snapshot().is_none());
    }
}
