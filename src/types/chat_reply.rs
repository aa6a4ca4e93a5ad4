use serde::{Deserialize, Serialize};

/// The companion's reply to a chat message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatReply {
    /// Reply text.
    pub response: String,
}
