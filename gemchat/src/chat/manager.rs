use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex as TokioMutex;

use crate::models::{ChatSnapshot, Chatroom, ChatroomId, Message, MessageId, NewMessage};
use crate::storage::{Storage, load_json, save_json};

use super::{ChatListener, StubListener};

pub const CHAT_KEY: &str = "chat-storage";

/// Owner of every chatroom and message. Each mutation rewrites the whole
/// `"chat-storage"` blob before returning.
///
/// Mutations apply in memory first. When the save fails the error is
/// returned, the change stays in memory (but not on disk) and the listener
/// is not notified.
pub struct ChatManager {
    storage: Arc<dyn Storage>,
    chatrooms: TokioMutex<Vec<Chatroom>>,
    listener: Arc<dyn ChatListener>,
}

impl ChatManager {
    pub async fn open(storage: Arc<dyn Storage>) -> Result<Self, anyhow::Error> {
        Self::with_listener(storage, Arc::new(StubListener)).await
    }

    pub async fn with_listener<L>(
        storage: Arc<dyn Storage>,
        listener: Arc<L>,
    ) -> Result<Self, anyhow::Error>
    where
        L: ChatListener + 'static,
    {
        let snapshot = load_json::<ChatSnapshot>(storage.as_ref(), CHAT_KEY)
            .await?
            .unwrap_or_default();
        let mut seen = HashSet::new();
        let mut chatrooms = Vec::with_capacity(snapshot.chatrooms.len());
        for chatroom in snapshot.chatrooms {
            if !seen.insert(chatroom.id.clone()) {
                tracing::warn!(chatroom_id = %chatroom.id, "Dropping duplicate chatroom");
                continue;
            }
            chatrooms.push(chatroom);
        }
        tracing::debug!(count = chatrooms.len(), "Loaded chatrooms");
        Ok(Self {
            storage,
            chatrooms: TokioMutex::new(chatrooms),
            listener,
        })
    }

    /// Creates an empty chatroom at the front of the list. On a save error the
    /// chatroom is still listed in memory.
    pub async fn create_chatroom(
        &self,
        title: impl Into<String>,
    ) -> Result<ChatroomId, anyhow::Error> {
        let chatroom = {
            let mut chatrooms = self.chatrooms.lock().await;
            let mut id = ChatroomId::generate();
            while chatrooms.iter().any(|room| room.id == id) {
                id = ChatroomId::generate();
            }
            let chatroom = Chatroom::new(id, title);
            chatrooms.insert(0, chatroom.clone());
            self.save(&chatrooms).await?;
            chatroom
        };
        tracing::debug!(chatroom_id = %chatroom.id, title = %chatroom.title, "Created chatroom");
        let id = chatroom.id.clone();
        self.listener.on_chatroom_created(chatroom).await;
        Ok(id)
    }

    /// Removes the chatroom. Returns `false` if there was nothing to remove.
    pub async fn delete_chatroom(&self, id: &ChatroomId) -> Result<bool, anyhow::Error> {
        {
            let mut chatrooms = self.chatrooms.lock().await;
            let before = chatrooms.len();
            chatrooms.retain(|room| &room.id != id);
            if chatrooms.len() == before {
                tracing::debug!(chatroom_id = %id, "Chatroom not found for delete");
                return Ok(false);
            }
            self.save(&chatrooms).await?;
        }
        tracing::debug!(chatroom_id = %id, "Deleted chatroom");
        self.listener.on_chatroom_deleted(id.clone()).await;
        Ok(true)
    }

    /// Appends a message with a fresh id. Returns `None` when the chatroom
    /// does not exist. On a save error the message is still kept in memory.
    pub async fn add_message(
        &self,
        chatroom_id: &ChatroomId,
        message: NewMessage,
    ) -> Result<Option<Message>, anyhow::Error> {
        let message = {
            let mut chatrooms = self.chatrooms.lock().await;
            let chatroom = match chatrooms.iter_mut().find(|room| &room.id == chatroom_id) {
                Some(v) => v,
                None => {
                    tracing::debug!(%chatroom_id, "Chatroom not found for message");
                    return Ok(None);
                }
            };
            let mut id = MessageId::generate();
            while chatroom.messages.iter().any(|m| m.id == id) {
                id = MessageId::generate();
            }
            let message = message.into_message(id);
            chatroom.messages.push(message.clone());
            self.save(&chatrooms).await?;
            message
        };
        tracing::debug!(
            %chatroom_id,
            message_id = %message.id,
            sender = message.sender.name(),
            "Added message",
        );
        self.listener
            .on_message_added(chatroom_id.clone(), message.clone())
            .await;
        Ok(Some(message))
    }

    pub async fn get_chatroom(&self, id: &ChatroomId) -> Option<Chatroom> {
        let chatrooms = self.chatrooms.lock().await;
        chatrooms.iter().find(|room| &room.id == id).cloned()
    }

    /// Replaces the title. Returns `false` when the chatroom does not exist.
    pub async fn update_chatroom_title(
        &self,
        id: &ChatroomId,
        title: impl Into<String>,
    ) -> Result<bool, anyhow::Error> {
        let title = title.into();
        {
            let mut chatrooms = self.chatrooms.lock().await;
            match chatrooms.iter_mut().find(|room| &room.id == id) {
                Some(room) => room.title = title.clone(),
                None => {
                    tracing::debug!(chatroom_id = %id, "Chatroom not found for rename");
                    return Ok(false);
                }
            }
            self.save(&chatrooms).await?;
        }
        tracing::debug!(chatroom_id = %id, %title, "Updated chatroom title");
        self.listener.on_title_changed(id.clone(), title).await;
        Ok(true)
    }

    /// All chatrooms, most recently created first.
    pub async fn list_chatrooms(&self) -> Vec<Chatroom> {
        self.chatrooms.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.chatrooms.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.chatrooms.lock().await.is_empty()
    }

    async fn save(&self, chatrooms: &[Chatroom]) -> Result<(), anyhow::Error> {
        #[derive(Serialize)]
        struct SnapshotRef<'a> {
            chatrooms: &'a [Chatroom],
        }
        save_json(self.storage.as_ref(), CHAT_KEY, &SnapshotRef { chatrooms }).await
    }
}
