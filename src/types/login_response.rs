use serde::{Deserialize, Serialize};

/// Successful response of `POST /auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginResponse {
    /// Opaque bearer token for authorized calls.
    pub access_token: String,
    /// The account email as known to the backend.
    pub email: String,
}
