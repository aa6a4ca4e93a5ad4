use serde::{Deserialize, Serialize};

/// Acknowledgement body returned by register and persona updates.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiMessage {
    /// Human-readable status message, e.g. "User created successfully".
    #[serde(default)]
    pub msg: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_msg_defaults_to_empty() {
        let message: ApiMessage = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(message.msg, "");
    }
}
