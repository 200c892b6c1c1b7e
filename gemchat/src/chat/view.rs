use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{Mutex as TokioMutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::config::AppConfig;
use crate::error::ValidationError;
use crate::models::{ChatroomId, Message, NewMessage, title_from_text};

use super::{ChatManager, ImageAttachment, MessageWindow, Responder, ScrollAnchor};

/// Notifications for whoever renders the chat view.
#[derive(Clone, Debug, PartialEq)]
pub enum ViewEvent {
    /// Older messages were prepended. The renderer should re-render and then
    /// report the new extent to [`ChatView::restore_scroll`].
    OlderLoaded { count: usize },
    HistoryExhausted,
    MessageAppended(Message),
    ScrollToBottom,
    Typing(bool),
    TitleChanged(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded(usize),
    Exhausted,
    /// Nothing to load or a load is already running.
    Skipped,
    /// The view was closed while the load was pending.
    Cancelled,
}

/// What the user typed and attached.
#[derive(Clone, Debug, Default)]
pub struct Draft {
    pub text: String,
    pub image: Option<ImageAttachment>,
}

impl Draft {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image: None,
        }
    }
}

/// Assistant reply that is still being generated.
pub struct PendingReply {
    task: JoinHandle<Option<Message>>,
}

impl PendingReply {
    /// Waits for the reply. `None` if the chatroom vanished meanwhile.
    pub async fn wait(self) -> Option<Message> {
        match self.task.await {
            Ok(v) => v,
            Err(err) => {
                tracing::error!(?err, "Reply task failed");
                None
            }
        }
    }
}

/// Windowed view over one chatroom.
///
/// Dropping the view cancels it: pending older-page loads finish without
/// effect and pending replies are stored but no longer shown.
pub struct ChatView {
    inner: Arc<ChatViewInner>,
}

impl ChatView {
    /// Opens the chatroom showing its most recent page. Returns `None` when the
    /// chatroom does not exist.
    pub async fn open(
        chats: Arc<ChatManager>,
        responder: Arc<dyn Responder>,
        config: &AppConfig,
        chatroom_id: &ChatroomId,
    ) -> Option<(Self, mpsc::UnboundedReceiver<ViewEvent>)> {
        let chatroom = match chats.get_chatroom(chatroom_id).await {
            Some(v) => v,
            None => {
                tracing::debug!(%chatroom_id, "Cannot open missing chatroom");
                return None;
            }
        };
        let window = MessageWindow::open(&chatroom.messages, config.page_size);
        let has_more = window.has_more();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let view = Self {
            inner: Arc::new(ChatViewInner {
                chatroom_id: chatroom_id.clone(),
                chats,
                responder,
                load_delay: config.load_delay(),
                window: TokioMutex::new(window),
                has_more: AtomicBool::new(has_more),
                anchor: Mutex::new(None),
                loading: AtomicBool::new(false),
                pending_replies: AtomicUsize::new(0),
                closed: AtomicBool::new(false),
                event_tx,
            }),
        };
        Some((view, event_rx))
    }

    pub fn chatroom_id(&self) -> &ChatroomId {
        &self.inner.chatroom_id
    }

    /// Current title as stored in the chat manager.
    pub async fn title(&self) -> Option<String> {
        self.inner
            .chats
            .get_chatroom(&self.inner.chatroom_id)
            .await
            .map(|room| room.title)
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.inner.window.lock().await.messages().to_vec()
    }

    pub async fn at_beginning(&self) -> bool {
        self.inner.window.lock().await.at_beginning()
    }

    pub fn has_more(&self) -> bool {
        self.inner.has_more.load(Ordering::Acquire)
    }

    pub fn is_loading(&self) -> bool {
        self.inner.loading.load(Ordering::Acquire)
    }

    pub fn is_typing(&self) -> bool {
        self.inner.pending_replies.load(Ordering::Acquire) > 0
    }

    /// Scroll callback. Reaching the top starts a background load of the
    /// previous page. Returns whether a load was started.
    pub fn handle_scroll(&self, offset: f64, extent: f64) -> bool {
        if offset > 0.0 || !self.begin_load(extent) {
            return false;
        }
        let inner = self.inner.clone();
        tokio::spawn(async move {
            ChatViewInner::finish_load(&inner).await;
        });
        true
    }

    /// Loads the previous page in place.
    pub async fn load_older(&self, extent: f64) -> LoadOutcome {
        if !self.begin_load(extent) {
            return LoadOutcome::Skipped;
        }
        ChatViewInner::finish_load(&self.inner).await
    }

    /// Consumes the anchor captured when the last load started and returns
    /// the scroll offset that keeps the old content in place.
    pub fn restore_scroll(&self, extent: f64) -> Option<f64> {
        let anchor = self.inner.anchor.lock().unwrap().take()?;
        Some(anchor.offset_for(extent))
    }

    /// Stores the user's message and schedules the assistant reply.
    /// Returns `Ok(None)` when the chatroom no longer exists.
    pub async fn send(&self, draft: Draft) -> Result<Option<PendingReply>, anyhow::Error> {
        let text = draft.text.trim().to_owned();
        if text.is_empty() && draft.image.is_none() {
            return Err(ValidationError::EmptyMessage.into());
        }
        let inner = &self.inner;
        let image_url = draft.image.as_ref().map(|v| v.url());
        {
            let mut window = inner.window.lock().await;
            let was_empty = match inner.chats.get_chatroom(&inner.chatroom_id).await {
                Some(room) => room.is_empty(),
                None => return Ok(None),
            };
            let message = match inner
                .chats
                .add_message(&inner.chatroom_id, NewMessage::user(text.clone(), image_url))
                .await?
            {
                Some(v) => v,
                None => return Ok(None),
            };
            if was_empty {
                if let Some(title) = title_from_text(&text) {
                    // The message is already stored, so a failed rename must
                    // not hide it.
                    match inner
                        .chats
                        .update_chatroom_title(&inner.chatroom_id, title.clone())
                        .await
                    {
                        Ok(true) => inner.emit(ViewEvent::TitleChanged(title)),
                        Ok(false) => {}
                        Err(err) => tracing::warn!(?err, "Failed to update chatroom title"),
                    }
                }
            }
            window.push(message.clone());
            inner.emit(ViewEvent::MessageAppended(message));
            inner.emit(ViewEvent::ScrollToBottom);
        }
        if inner.pending_replies.fetch_add(1, Ordering::AcqRel) == 0 {
            inner.emit(ViewEvent::Typing(true));
        }
        let task_inner = inner.clone();
        let task = tokio::spawn(async move { ChatViewInner::reply(&task_inner).await });
        Ok(Some(PendingReply { task }))
    }

    /// Tears the view down. Also done on drop.
    pub fn close(&self) {
        if !self.inner.closed.swap(true, Ordering::AcqRel) {
            tracing::debug!(chatroom_id = %self.inner.chatroom_id, "Closed chat view");
        }
    }

    fn begin_load(&self, extent: f64) -> bool {
        let inner = &self.inner;
        if inner.closed.load(Ordering::Acquire) || !inner.has_more.load(Ordering::Acquire) {
            return false;
        }
        if inner
            .loading
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::trace!("Older messages already loading");
            return false;
        }
        *inner.anchor.lock().unwrap() = Some(ScrollAnchor::capture(extent));
        true
    }
}

impl Drop for ChatView {
    fn drop(&mut self) {
        self.close();
    }
}

struct ChatViewInner {
    chatroom_id: ChatroomId,
    chats: Arc<ChatManager>,
    responder: Arc<dyn Responder>,
    load_delay: Duration,
    window: TokioMutex<MessageWindow>,
    has_more: AtomicBool,
    anchor: Mutex<Option<ScrollAnchor>>,
    loading: AtomicBool,
    pending_replies: AtomicUsize,
    closed: AtomicBool,
    event_tx: mpsc::UnboundedSender<ViewEvent>,
}

impl ChatViewInner {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn emit(&self, event: ViewEvent) {
        // The renderer may already be gone.
        _ = self.event_tx.send(event);
    }

    async fn finish_load(inner: &Arc<Self>) -> LoadOutcome {
        sleep(inner.load_delay).await;
        if inner.is_closed() {
            tracing::debug!("View closed before older messages arrived");
            inner.loading.store(false, Ordering::Release);
            return LoadOutcome::Cancelled;
        }
        let mut window = inner.window.lock().await;
        let count = match inner.chats.get_chatroom(&inner.chatroom_id).await {
            Some(room) => window.load_older(&room.messages),
            None => {
                tracing::debug!(chatroom_id = %inner.chatroom_id, "Chatroom gone while loading");
                0
            }
        };
        let has_more = count > 0 && window.has_more();
        drop(window);
        inner.has_more.store(has_more, Ordering::Release);
        inner.loading.store(false, Ordering::Release);
        if count > 0 {
            tracing::debug!(count, has_more, "Loaded older messages");
            inner.emit(ViewEvent::OlderLoaded { count });
            LoadOutcome::Loaded(count)
        } else {
            inner.anchor.lock().unwrap().take();
            inner.emit(ViewEvent::HistoryExhausted);
            LoadOutcome::Exhausted
        }
    }

    async fn reply(inner: &Arc<Self>) -> Option<Message> {
        let result = Self::generate_reply(inner).await;
        if inner.pending_replies.fetch_sub(1, Ordering::AcqRel) == 1 && !inner.is_closed() {
            inner.emit(ViewEvent::Typing(false));
        }
        result
    }

    async fn generate_reply(inner: &Arc<Self>) -> Option<Message> {
        let chatroom = inner.chats.get_chatroom(&inner.chatroom_id).await?;
        let content = inner.responder.respond(&chatroom).await;
        let mut window = inner.window.lock().await;
        let message = match inner
            .chats
            .add_message(&inner.chatroom_id, NewMessage::assistant(content))
            .await
        {
            Ok(Some(v)) => v,
            Ok(None) => {
                tracing::debug!(chatroom_id = %inner.chatroom_id, "Chatroom gone before reply");
                return None;
            }
            Err(err) => {
                tracing::error!(?err, "Failed to store reply");
                return None;
            }
        };
        if inner.is_closed() {
            tracing::debug!("View closed, reply stored only");
            return Some(message);
        }
        window.push(message.clone());
        inner.emit(ViewEvent::MessageAppended(message.clone()));
        inner.emit(ViewEvent::ScrollToBottom);
        Some(message)
    }
}
