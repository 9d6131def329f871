use serde::{Deserialize, Serialize};

/// Per-message metadata attached during history normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageMeta {
    /// Unix timestamp (seconds) of when the message was normalized.
    pub timestamp: i64,
    pub user: String,
    pub prompt_id: String,
}

/// One message in a conversation session.
///
/// The role is an open string ("user", "assistant", "system", "function", or
/// whatever an upstream framework hands us) rather than a closed enum, so the
/// formatter can reject roles it does not know how to label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<MessageMeta>,
}

impl ConversationMessage {
    pub fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
            meta: None,
        }
    }

    pub fn user(content: &str) -> Self {
        Self::new("user", content)
    }

    pub fn assistant(content: &str) -> Self {
        Self::new("assistant", content)
    }

    pub fn system(content: &str) -> Self {
        Self::new("system", content)
    }

    pub fn function(content: &str) -> Self {
        Self::new("function", content)
    }
}
