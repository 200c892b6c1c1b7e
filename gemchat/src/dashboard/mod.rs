mod sidebar;

pub use sidebar::*;

use crate::auth::AuthManager;
use crate::chat::ChatManager;
use crate::models::ChatroomId;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    /// Phone login.
    Entry,
    Dashboard,
    Chat(ChatroomId),
}

impl Route {
    /// Where a request for `self` actually lands. Signed-out users always get
    /// the entry screen; a chat that no longer exists falls back to the
    /// dashboard.
    pub async fn resolve(self, auth: &AuthManager, chats: &ChatManager) -> Route {
        if !auth.is_authenticated().await {
            return Route::Entry;
        }
        match self {
            Route::Entry => Route::Dashboard,
            Route::Dashboard => Route::Dashboard,
            Route::Chat(id) => {
                if chats.get_chatroom(&id).await.is_some() {
                    Route::Chat(id)
                } else {
                    tracing::debug!(chatroom_id = %id, "Redirecting missing chat to dashboard");
                    Route::Dashboard
                }
            }
        }
    }
}
