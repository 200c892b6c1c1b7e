use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::auth::{AuthManager, OtpFlow};
use crate::chat::{CannedResponder, ChatListener, ChatManager, ChatView, Responder, ViewEvent};
use crate::config::{AppConfig, ConfigManager};
use crate::dashboard::{Route, Sidebar};
use crate::models::ChatroomId;
use crate::storage::{MemoryStorage, SqliteStorage, Storage};

/// Every state container wired to one storage.
pub struct App {
    config: AppConfig,
    storage: Arc<dyn Storage>,
    auth: Arc<AuthManager>,
    chats: Arc<ChatManager>,
    responder: Arc<dyn Responder>,
}

impl App {
    /// Opens the SQLite database under `path`.
    pub async fn open(path: &Path) -> Result<Self, anyhow::Error> {
        let storage = SqliteStorage::open(path).await?;
        Self::with_storage(Arc::new(storage)).await
    }

    /// Keeps everything in memory.
    pub async fn in_memory() -> Result<Self, anyhow::Error> {
        Self::with_storage(Arc::new(MemoryStorage::new())).await
    }

    pub async fn with_storage(storage: Arc<dyn Storage>) -> Result<Self, anyhow::Error> {
        let config = ConfigManager::new(storage.clone()).load().await?;
        let chats = Arc::new(ChatManager::open(storage.clone()).await?);
        Self::assemble(config, storage, chats).await
    }

    pub async fn with_listener<L>(
        storage: Arc<dyn Storage>,
        listener: Arc<L>,
    ) -> Result<Self, anyhow::Error>
    where
        L: ChatListener + 'static,
    {
        let config = ConfigManager::new(storage.clone()).load().await?;
        let chats = Arc::new(ChatManager::with_listener(storage.clone(), listener).await?);
        Self::assemble(config, storage, chats).await
    }

    async fn assemble(
        config: AppConfig,
        storage: Arc<dyn Storage>,
        chats: Arc<ChatManager>,
    ) -> Result<Self, anyhow::Error> {
        let auth = Arc::new(AuthManager::open(storage.clone()).await?);
        let responder: Arc<dyn Responder> = Arc::new(CannedResponder::new(config.reply_delay_range()));
        Ok(Self {
            config,
            storage,
            auth,
            chats,
            responder,
        })
    }

    /// Replaces the reply generator.
    pub fn set_responder(&mut self, responder: Arc<dyn Responder>) {
        self.responder = responder;
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn auth(&self) -> &Arc<AuthManager> {
        &self.auth
    }

    pub fn chats(&self) -> &Arc<ChatManager> {
        &self.chats
    }

    pub fn otp_flow(&self) -> OtpFlow {
        OtpFlow::new(self.auth.clone(), self.config.otp_delay())
    }

    pub fn sidebar(&self) -> Sidebar {
        Sidebar::new(
            self.chats.clone(),
            self.auth.clone(),
            self.config.search_debounce(),
        )
    }

    pub async fn resolve(&self, route: Route) -> Route {
        route.resolve(&self.auth, &self.chats).await
    }

    /// Opens a chat view if the user is signed in and the chatroom exists.
    pub async fn open_chat(
        &self,
        chatroom_id: &ChatroomId,
    ) -> Option<(ChatView, mpsc::UnboundedReceiver<ViewEvent>)> {
        match self.resolve(Route::Chat(chatroom_id.clone())).await {
            Route::Chat(_) => {}
            _ => return None,
        }
        ChatView::open(
            self.chats.clone(),
            self.responder.clone(),
            &self.config,
            chatroom_id,
        )
        .await
    }
}
