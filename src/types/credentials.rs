use std::fmt;

use serde::{Deserialize, Serialize};

/// Email and password sent to the register and login endpoints.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    /// Account email.
    pub email: String,
    /// Plaintext password; only ever sent over the wire.
    pub password: String,
}

impl Credentials {
    /// Creates a new set of credentials.
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

// Passwords must never end up in logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_email_and_password() {
        let credentials = Credentials::new("a@b.com", "pw");
        let json = serde_json::to_value(&credentials).unwrap();
        assert_eq!(json, serde_json::json!({"email": "a@b.com", "password": "pw"}));
    }

    #[test]
    fn debug_redacts_password() {
        let credentials = Credentials::new("a@b.com", "hunter2");
        let debug = format!("{credentials:?}");
        assert!(debug.contains("a@b.com"));
        assert!(!debug.contains("hunter2"));
    }
}
