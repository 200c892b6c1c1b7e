use async_trait::async_trait;

use crate::models::{Chatroom, ChatroomId, Message};

/// Notified after a mutation has been applied and persisted.
#[async_trait]
pub trait ChatListener: Send + Sync {
    async fn on_chatroom_created(&self, chatroom: Chatroom);

    async fn on_chatroom_deleted(&self, chatroom_id: ChatroomId);

    async fn on_message_added(&self, chatroom_id: ChatroomId, message: Message);

    async fn on_title_changed(&self, chatroom_id: ChatroomId, title: String);
}

pub(super) struct StubListener;

#[async_trait]
impl ChatListener for StubListener {
    async fn on_chatroom_created(&self, _chatroom: Chatroom) {}

    async fn on_chatroom_deleted(&self, _chatroom_id: ChatroomId) {}

    async fn on_message_added(&self, _chatroom_id: ChatroomId, _message: Message) {}

    async fn on_title_changed(&self, _chatroom_id: ChatroomId, _title: String) {}
}
