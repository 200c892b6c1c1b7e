use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::auth::AuthManager;
use crate::chat::ChatManager;
use crate::models::{Chatroom, ChatroomId};

/// Chatroom list with title search, creation, deletion and logout.
pub struct Sidebar {
    chats: Arc<ChatManager>,
    auth: Arc<AuthManager>,
    debounce: Duration,
    input: Mutex<String>,
    query: Arc<Mutex<String>>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Sidebar {
    pub fn new(chats: Arc<ChatManager>, auth: Arc<AuthManager>, debounce: Duration) -> Self {
        Self {
            chats,
            auth,
            debounce,
            input: Mutex::new(String::new()),
            query: Arc::new(Mutex::new(String::new())),
            pending: Mutex::new(None),
        }
    }

    /// Updates the search box. The filter follows once the input has been
    /// stable for the debounce interval.
    pub fn set_query(&self, input: impl Into<String>) {
        let input = input.into();
        *self.input.lock().unwrap() = input.clone();
        let query = self.query.clone();
        let debounce = self.debounce;
        let task = tokio::spawn(async move {
            sleep(debounce).await;
            tracing::trace!(%input, "Applying search query");
            *query.lock().unwrap() = input;
        });
        if let Some(previous) = self.pending.lock().unwrap().replace(task) {
            previous.abort();
        }
    }

    /// The query currently used for filtering.
    pub fn query(&self) -> String {
        self.query.lock().unwrap().clone()
    }

    /// Chatrooms whose title contains the query, ignoring case.
    pub async fn chatrooms(&self) -> Vec<Chatroom> {
        let query = self.query().to_lowercase();
        let chatrooms = self.chats.list_chatrooms().await;
        if query.is_empty() {
            return chatrooms;
        }
        chatrooms
            .into_iter()
            .filter(|room| room.title.to_lowercase().contains(&query))
            .collect()
    }

    /// Placeholder text for an empty list.
    pub fn empty_label(&self) -> &'static str {
        if self.input.lock().unwrap().is_empty() {
            "No chats yet"
        } else {
            "No chats found"
        }
    }

    /// Creates a chatroom named after its position, e.g. `"Chat 3"`.
    pub async fn new_chat(&self) -> Result<ChatroomId, anyhow::Error> {
        let title = format!("Chat {}", self.chats.len().await + 1);
        let id = self.chats.create_chatroom(title).await?;
        tracing::info!(chatroom_id = %id, "Chatroom created");
        Ok(id)
    }

    pub async fn delete_chat(&self, id: &ChatroomId) -> Result<bool, anyhow::Error> {
        let deleted = self.chats.delete_chatroom(id).await?;
        if deleted {
            tracing::info!(chatroom_id = %id, "Chatroom deleted");
        }
        Ok(deleted)
    }

    pub async fn logout(&self) -> Result<(), anyhow::Error> {
        self.auth.logout().await
    }
}

impl Drop for Sidebar {
    fn drop(&mut self) {
        if let Some(task) = self.pending.lock().unwrap().take() {
            task.abort();
        }
    }
}
