use serde::{Deserialize, Serialize};

/// Response of the unauthenticated `GET /health` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Health {
    /// "healthy" when the backend is serving requests.
    pub status: String,
    /// Whether the backend's language model was initialized.
    #[serde(default)]
    pub ai_ready: bool,
}

impl Health {
    /// Returns true if the backend is up and able to answer chat messages.
    pub fn is_ready(&self) -> bool {
        self.status == "healthy" && self.ai_ready
    }
}
