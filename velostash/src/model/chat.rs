use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: i64,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub seen_by: Vec<String>,
}

impl ChatMessage {
    /// A message as sent: the sender has already seen it.
    pub fn new(id: i64, sender: impl Into<String>, text: impl Into<String>, timestamp: i64) -> Self {
        let sender = sender.into();
        Self {
            id,
            seen_by: vec![sender.clone()],
            sender,
            text: text.into(),
            timestamp,
        }
    }

    pub fn is_seen_by(&self, email: &str) -> bool {
        self.seen_by.iter().any(|seen| seen.eq_ignore_ascii_case(email))
    }
}

/// Every chat thread, keyed by [`build_chat_key`](crate::build_chat_key).
pub type DirectMessages = BTreeMap<String, Vec<ChatMessage>>;

/// Summary of one thread as seen by one participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatThreadSummary {
    pub other_email: String,
    pub other_name: String,
    pub avatar: String,
    pub last_message: ChatMessage,
    pub last_timestamp: i64,
}
