use serde::{Deserialize, Serialize};

use super::{ChatroomId, Message, Timestamp};

pub const TITLE_MAX_CHARS: usize = 30;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chatroom {
    pub id: ChatroomId,
    pub title: String,
    pub created_at: Timestamp,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Chatroom {
    pub fn new(id: ChatroomId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            created_at: Timestamp::now(),
            messages: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Builds a chatroom title from the first message text.
///
/// Returns `None` when the text is blank. Longer text is cut to
/// [`TITLE_MAX_CHARS`] characters and suffixed with `"..."`.
pub fn title_from_text(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if text.chars().count() > TITLE_MAX_CHARS {
        let mut title: String = text.chars().take(TITLE_MAX_CHARS).collect();
        title.push_str("...");
        Some(title)
    } else {
        Some(text.to_owned())
    }
}

/// Persisted `"chat-storage"` blob.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSnapshot {
    #[serde(default)]
    pub chatrooms: Vec<Chatroom>,
}
