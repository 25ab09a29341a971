//! Direct messages between two users.
//!
//! All threads share one `directMessages` entry, a map from the participants' canonical
//! pair key to the thread's messages in send order.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::{
    KeyValueStore, Ladder, StorageGateway,
    gateway::keys,
    model::{ChatMessage, ChatThreadSummary, DirectMessages},
};

const KEY_SEPARATOR: &str = "__";

/// The thread key shared by two users: both emails lowercased, sorted, joined by `__`.
///
/// ```
/// assert_eq!(
///     velostash::build_chat_key("Bob@x.io", "alice@x.io"),
///     velostash::build_chat_key("alice@x.io", "bob@X.io"),
/// );
/// ```
pub fn build_chat_key(a: &str, b: &str) -> String {
    let mut pair = [a.to_lowercase(), b.to_lowercase()];
    pair.sort();
    pair.join(KEY_SEPARATOR)
}

impl<P: KeyValueStore, S: KeyValueStore> StorageGateway<P, S> {
    /// Appends `message` to the thread between `a` and `b`.
    ///
    /// An unreadable message map is replaced by one holding only this thread. Returns
    /// whether the write went through.
    pub fn append_chat_message(&mut self, a: &str, b: &str, message: ChatMessage) -> bool {
        let key = build_chat_key(a, b);
        if let Err(err) = self.read::<DirectMessages>(keys::DIRECT_MESSAGES) {
            warn!(error = ?err, "chat store unreadable, starting over with this thread");
        }
        self.update_with_ladder(
            keys::DIRECT_MESSAGES,
            &Ladder::standard(),
            |messages: &mut DirectMessages| {
                messages.entry(key.clone()).or_default().push(message.clone());
            },
        )
        .is_ok()
    }

    /// Sends `text` from `sender` to `recipient`, stamped with the current time.
    pub fn send_chat_message(
        &mut self,
        sender: &str,
        recipient: &str,
        text: &str,
    ) -> Option<ChatMessage> {
        let now = self.now();
        let message = ChatMessage::new(now, sender.trim().to_lowercase(), text, now);
        self.append_chat_message(sender, recipient, message.clone())
            .then_some(message)
    }

    /// Messages between `a` and `b` in send order.
    pub fn chat_history(&self, a: &str, b: &str) -> Vec<ChatMessage> {
        self.direct_messages()
            .remove(&build_chat_key(a, b))
            .unwrap_or_default()
    }

    /// Every non-empty thread `email` takes part in, most recent first.
    pub fn chat_threads_for(&self, email: &str) -> Vec<ChatThreadSummary> {
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            return Vec::new();
        }
        let users: HashMap<String, _> = self
            .users()
            .into_iter()
            .map(|user| (user.email.to_lowercase(), user))
            .collect();

        let mut threads: Vec<ChatThreadSummary> = self
            .direct_messages()
            .into_iter()
            .filter_map(|(key, mut thread)| {
                let (first, second) = key.split_once(KEY_SEPARATOR)?;
                let other = if first == email {
                    second
                } else if second == email {
                    first
                } else {
                    return None;
                };
                let last_message = thread.pop()?;
                let other_user = users.get(other);
                Some(ChatThreadSummary {
                    other_email: other.to_string(),
                    other_name: other_user
                        .map(|user| user.name.clone())
                        .filter(|name| !name.is_empty())
                        .unwrap_or_else(|| other.to_string()),
                    avatar: other_user
                        .and_then(|user| user.profile_pic_url.clone())
                        .unwrap_or_default(),
                    last_timestamp: if last_message.timestamp != 0 {
                        last_message.timestamp
                    } else {
                        last_message.id
                    },
                    last_message,
                })
            })
            .collect();
        threads.sort_by(|a, b| b.last_timestamp.cmp(&a.last_timestamp));
        threads
    }

    /// Marks every message in the thread with `other` as seen by `viewer`. Returns whether
    /// anything changed and was saved.
    pub fn mark_thread_seen(&mut self, viewer: &str, other: &str) -> bool {
        let viewer = viewer.trim().to_lowercase();
        let mut messages = self.direct_messages();
        let Some(thread) = messages.get_mut(&build_chat_key(&viewer, other)) else {
            return false;
        };
        let mut changed = false;
        for message in thread.iter_mut().filter(|m| !m.is_seen_by(&viewer)) {
            message.seen_by.push(viewer.clone());
            changed = true;
        }
        if !changed {
            return false;
        }
        debug!(%viewer, %other, "thread marked seen");
        self.save_direct_messages(&messages)
    }

    /// Threads whose latest message `email` has not seen.
    pub fn unread_thread_count(&self, email: &str) -> usize {
        self.chat_threads_for(email)
            .iter()
            .filter(|thread| !thread.last_message.is_seen_by(email.trim()))
            .count()
    }
}
