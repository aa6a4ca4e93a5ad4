use serde::{Deserialize, Serialize};

use crate::types::Sender;

/// One stored message as returned by `GET /chat/history`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Message text.
    pub message: String,
    /// Who wrote it.
    pub sender: Sender,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_history_list() {
        let json = serde_json::json!([
            {"sender": "user", "message": "hello"},
            {"sender": "ai", "message": "hi there"},
        ]);
        let history: Vec<HistoryEntry> = serde_json::from_value(json).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].sender, Sender::User);
        assert_eq!(history[1].message, "hi there");
    }
}
