use serde::{Deserialize, Serialize};

use super::{MessageId, Timestamp};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    // Older snapshots tag replies with the model name.
    #[serde(alias = "gemini")]
    Assistant,
}

impl Sender {
    pub fn name(&self) -> &str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub content: String,
    pub sender: Sender,
    pub timestamp: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Message contents before the chat manager assigns an id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewMessage {
    pub content: String,
    pub sender: Sender,
    pub timestamp: Timestamp,
    pub image_url: Option<String>,
}

impl NewMessage {
    pub fn user(content: impl Into<String>, image_url: Option<String>) -> Self {
        Self {
            content: content.into(),
            sender: Sender::User,
            timestamp: Timestamp::now(),
            image_url,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            sender: Sender::Assistant,
            timestamp: Timestamp::now(),
            image_url: None,
        }
    }

    pub fn into_message(self, id: MessageId) -> Message {
        Message {
            id,
            content: self.content,
            sender: self.sender,
            timestamp: self.timestamp,
            image_url: self.image_url,
        }
    }
}

impl Message {
    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }
}
