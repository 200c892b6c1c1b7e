use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use gemchat::chat::{
    CANNED_REPLIES, CannedResponder, ChatManager, ChatView, Draft, LoadOutcome, Responder,
    ViewEvent,
};
use gemchat::config::AppConfig;
use gemchat::error::ValidationError;
use gemchat::models::{Chatroom, ChatroomId, NewMessage, Sender};
use gemchat::storage::{MemoryStorage, Storage};
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("gemchat=trace")
        .try_init();
}

struct EchoResponder;

#[async_trait]
impl Responder for EchoResponder {
    async fn respond(&self, chatroom: &Chatroom) -> String {
        sleep(Duration::from_millis(2500)).await;
        let last = chatroom.messages.last().map(|m| m.content.clone());
        format!("echo: {}", last.unwrap_or_default())
    }
}

/// Memory storage whose `fail_on`-th write (1-based) fails.
struct FailingStorage {
    inner: MemoryStorage,
    writes: AtomicUsize,
    fail_on: usize,
}

#[async_trait]
impl Storage for FailingStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, anyhow::Error> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String) -> Result<(), anyhow::Error> {
        if self.writes.fetch_add(1, Ordering::SeqCst) + 1 == self.fail_on {
            anyhow::bail!("disk full");
        }
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), anyhow::Error> {
        self.inner.remove(key).await
    }
}

async fn chats_with_history(count: usize) -> (Arc<ChatManager>, ChatroomId) {
    let chats = Arc::new(
        ChatManager::open(Arc::new(MemoryStorage::new()))
            .await
            .unwrap(),
    );
    let id = chats.create_chatroom("history").await.unwrap();
    for i in 1..=count {
        chats
            .add_message(&id, NewMessage::user(format!("m{i}"), None))
            .await
            .unwrap();
    }
    (chats, id)
}

async fn open_view(
    chats: &Arc<ChatManager>,
    id: &ChatroomId,
) -> (ChatView, mpsc::UnboundedReceiver<ViewEvent>) {
    ChatView::open(
        chats.clone(),
        Arc::new(EchoResponder),
        &AppConfig::default(),
        id,
    )
    .await
    .expect("chatroom should open")
}

async fn contents(view: &ChatView) -> Vec<String> {
    view.messages()
        .await
        .into_iter()
        .map(|m| m.content)
        .collect()
}

fn drain(events: &mut mpsc::UnboundedReceiver<ViewEvent>) -> Vec<ViewEvent> {
    let mut result = Vec::new();
    while let Ok(event) = events.try_recv() {
        result.push(event);
    }
    result
}

fn range(from: usize, to: usize) -> Vec<String> {
    (from..=to).map(|i| format!("m{i}")).collect()
}

#[tokio::test(start_paused = true)]
async fn test_backward_pagination_over_45_messages() {
    init_tracing();
    let (chats, id) = chats_with_history(45).await;
    let (view, _events) = open_view(&chats, &id).await;

    assert_eq!(contents(&view).await, range(26, 45));
    assert!(view.has_more());
    assert!(!view.at_beginning().await);

    assert_eq!(view.load_older(1000.0).await, LoadOutcome::Loaded(20));
    assert_eq!(contents(&view).await, range(6, 45));
    assert!(view.has_more());

    assert_eq!(view.load_older(2000.0).await, LoadOutcome::Loaded(5));
    assert_eq!(contents(&view).await, range(1, 45));
    assert!(!view.has_more());
    assert!(view.at_beginning().await);

    assert_eq!(view.load_older(2500.0).await, LoadOutcome::Skipped);
}

#[tokio::test(start_paused = true)]
async fn test_load_waits_for_simulated_latency() {
    let (chats, id) = chats_with_history(30).await;
    let (view, _events) = open_view(&chats, &id).await;
    let started = Instant::now();
    assert_eq!(view.load_older(0.0).await, LoadOutcome::Loaded(10));
    assert!(started.elapsed() >= AppConfig::default().load_delay());
    assert!(!view.is_loading());
}

#[tokio::test(start_paused = true)]
async fn test_rapid_scroll_triggers_single_load() {
    let (chats, id) = chats_with_history(45).await;
    let (view, mut events) = open_view(&chats, &id).await;

    assert!(view.handle_scroll(0.0, 1000.0));
    assert!(view.is_loading());
    assert!(!view.handle_scroll(0.0, 1000.0));

    let event = events.recv().await.expect("event channel closed");
    assert_eq!(event, ViewEvent::OlderLoaded { count: 20 });
    assert_eq!(view.messages().await.len(), 40);
    assert!(!view.is_loading());

    sleep(Duration::from_secs(5)).await;
    assert!(drain(&mut events).is_empty(), "second load must not run");
    assert_eq!(view.messages().await.len(), 40);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_load_calls_run_once() {
    let (chats, id) = chats_with_history(45).await;
    let (view, _events) = open_view(&chats, &id).await;
    let (a, b) = tokio::join!(view.load_older(100.0), view.load_older(100.0));
    assert_eq!(a, LoadOutcome::Loaded(20));
    assert_eq!(b, LoadOutcome::Skipped);
    assert_eq!(view.messages().await.len(), 40);
}

#[tokio::test(start_paused = true)]
async fn test_scroll_below_top_does_not_load() {
    let (chats, id) = chats_with_history(45).await;
    let (view, _events) = open_view(&chats, &id).await;
    assert!(!view.handle_scroll(12.0, 1000.0));
    assert!(!view.is_loading());
}

#[tokio::test(start_paused = true)]
async fn test_scroll_anchor_restored_after_load() {
    let (chats, id) = chats_with_history(45).await;
    let (view, _events) = open_view(&chats, &id).await;
    assert_eq!(view.restore_scroll(500.0), None);
    assert_eq!(view.load_older(800.0).await, LoadOutcome::Loaded(20));
    assert_eq!(view.restore_scroll(1600.0), Some(800.0));
    assert_eq!(view.restore_scroll(1600.0), None);
}

#[tokio::test(start_paused = true)]
async fn test_empty_chatroom_never_pages() {
    let (chats, id) = chats_with_history(0).await;
    let (view, _events) = open_view(&chats, &id).await;
    assert!(view.messages().await.is_empty());
    assert!(!view.has_more());
    assert!(!view.at_beginning().await);
    assert!(!view.handle_scroll(0.0, 0.0));
    assert_eq!(view.load_older(0.0).await, LoadOutcome::Skipped);
}

#[tokio::test(start_paused = true)]
async fn test_reopen_resets_paging() {
    let (chats, id) = chats_with_history(45).await;
    {
        let (view, _events) = open_view(&chats, &id).await;
        view.load_older(0.0).await;
        view.load_older(0.0).await;
        assert_eq!(view.messages().await.len(), 45);
    }
    let (view, _events) = open_view(&chats, &id).await;
    assert_eq!(contents(&view).await, range(26, 45));
    assert!(view.has_more());
}

#[tokio::test(start_paused = true)]
async fn test_open_missing_chatroom() {
    let (chats, _id) = chats_with_history(0).await;
    let view = ChatView::open(
        chats.clone(),
        Arc::new(EchoResponder),
        &AppConfig::default(),
        &ChatroomId::from("missing"),
    )
    .await;
    assert!(view.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_send_appends_and_reply_follows() {
    init_tracing();
    let (chats, id) = chats_with_history(0).await;
    let (view, mut events) = open_view(&chats, &id).await;

    let pending = view
        .send(Draft::text("  Hello world, this is a long message exceeding thirty chars "))
        .await
        .unwrap()
        .expect("chatroom exists");
    assert!(view.is_typing());
    assert_eq!(
        view.title().await.as_deref(),
        Some("Hello world, this is a long me...")
    );

    let reply = pending.wait().await.expect("reply stored");
    assert_eq!(reply.sender, Sender::Assistant);
    assert_eq!(
        reply.content,
        "echo: Hello world, this is a long message exceeding thirty chars"
    );
    assert!(!view.is_typing());

    let messages = view.messages().await;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].sender, Sender::User);
    assert_eq!(messages[1], reply);
    assert_eq!(chats.get_chatroom(&id).await.unwrap().messages, messages);

    let events = drain(&mut events);
    assert_eq!(
        events[0],
        ViewEvent::TitleChanged("Hello world, this is a long me...".into())
    );
    assert!(matches!(events[1], ViewEvent::MessageAppended(ref m) if m.sender == Sender::User));
    assert_eq!(events[2], ViewEvent::ScrollToBottom);
    assert_eq!(events[3], ViewEvent::Typing(true));
    assert_eq!(events[4], ViewEvent::MessageAppended(reply));
    assert_eq!(events[5], ViewEvent::ScrollToBottom);
    assert_eq!(events[6], ViewEvent::Typing(false));

    let pending = view.send(Draft::text("second message")).await.unwrap().unwrap();
    pending.wait().await;
    assert_eq!(
        view.title().await.as_deref(),
        Some("Hello world, this is a long me...")
    );
}

#[tokio::test(start_paused = true)]
async fn test_short_first_message_becomes_title() {
    let (chats, id) = chats_with_history(0).await;
    let (view, _events) = open_view(&chats, &id).await;
    view.send(Draft::text("Hi there")).await.unwrap();
    assert_eq!(view.title().await.as_deref(), Some("Hi there"));
}

#[tokio::test(start_paused = true)]
async fn test_title_not_changed_for_existing_history() {
    let (chats, id) = chats_with_history(3).await;
    let (view, _events) = open_view(&chats, &id).await;
    view.send(Draft::text("not the first")).await.unwrap();
    assert_eq!(view.title().await.as_deref(), Some("history"));
}

#[tokio::test(start_paused = true)]
async fn test_failed_title_save_still_shows_message() {
    init_tracing();
    // Writes: create chatroom, store the message, then the title update fails.
    let storage = Arc::new(FailingStorage {
        inner: MemoryStorage::new(),
        writes: AtomicUsize::new(0),
        fail_on: 3,
    });
    let chats = Arc::new(ChatManager::open(storage).await.unwrap());
    let id = chats.create_chatroom("Chat 1").await.unwrap();
    let (view, mut events) = open_view(&chats, &id).await;

    let pending = view.send(Draft::text("hello")).await.unwrap();
    assert!(pending.is_some());
    assert_eq!(contents(&view).await, vec!["hello"]);
    let events = drain(&mut events);
    assert!(matches!(&events[0], ViewEvent::MessageAppended(m) if m.content == "hello"));
    assert!(!events.iter().any(|e| matches!(e, ViewEvent::TitleChanged(_))));
    assert_eq!(chats.get_chatroom(&id).await.unwrap().messages.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_empty_draft_rejected() {
    let (chats, id) = chats_with_history(0).await;
    let (view, _events) = open_view(&chats, &id).await;
    let err = view.send(Draft::text("   ")).await.err().expect("should fail");
    assert_eq!(
        err.downcast_ref::<ValidationError>(),
        Some(&ValidationError::EmptyMessage)
    );
    assert!(chats.get_chatroom(&id).await.unwrap().is_empty());
    assert!(!view.is_typing());
}

#[tokio::test(start_paused = true)]
async fn test_sending_does_not_disturb_paging() {
    let (chats, id) = chats_with_history(30).await;
    let (view, _events) = open_view(&chats, &id).await;
    view.send(Draft::text("m31"))
        .await
        .unwrap()
        .unwrap()
        .wait()
        .await;
    assert_eq!(view.messages().await.len(), 22);
    assert!(view.has_more());
    assert_eq!(view.load_older(0.0).await, LoadOutcome::Loaded(10));
    let all = chats.get_chatroom(&id).await.unwrap().messages;
    assert_eq!(view.messages().await, all);
}

#[tokio::test(start_paused = true)]
async fn test_reply_after_close_is_stored_but_not_shown() {
    let (chats, id) = chats_with_history(0).await;
    let (view, mut events) = open_view(&chats, &id).await;
    let pending = view.send(Draft::text("hello")).await.unwrap().unwrap();
    drain(&mut events);
    drop(view);

    let reply = pending.wait().await.expect("reply stored");
    let room = chats.get_chatroom(&id).await.unwrap();
    assert_eq!(room.messages.len(), 2);
    assert_eq!(room.messages[1], reply);
    assert!(drain(&mut events).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_reply_from_closed_view_shows_up_in_reopened_view() {
    init_tracing();
    let (chats, id) = chats_with_history(30).await;
    let (first, _first_events) = open_view(&chats, &id).await;
    let pending = first.send(Draft::text("x")).await.unwrap().unwrap();
    drop(first);

    let (second, _second_events) = open_view(&chats, &id).await;
    assert_eq!(second.messages().await.len(), 20);
    let reply = pending.wait().await.expect("reply stored");

    assert_eq!(second.load_older(0.0).await, LoadOutcome::Loaded(11));
    let shown = second.messages().await;
    let stored = chats.get_chatroom(&id).await.unwrap().messages;
    assert_eq!(shown.len(), 32);
    assert_eq!(shown, stored);
    assert_eq!(shown.last(), Some(&reply));
    assert!(second.at_beginning().await);
}

#[tokio::test(start_paused = true)]
async fn test_load_after_close_is_noop() {
    let (chats, id) = chats_with_history(45).await;
    let (view, mut events) = open_view(&chats, &id).await;
    assert!(view.handle_scroll(0.0, 100.0));
    view.close();
    sleep(Duration::from_secs(2)).await;
    assert!(drain(&mut events).is_empty());
    assert_eq!(view.messages().await.len(), 20);
    assert!(!view.is_loading());
}

#[tokio::test(start_paused = true)]
async fn test_send_to_deleted_chatroom() {
    let (chats, id) = chats_with_history(2).await;
    let (view, _events) = open_view(&chats, &id).await;
    chats.delete_chatroom(&id).await.unwrap();
    assert!(view.send(Draft::text("anyone?")).await.unwrap().is_none());
    assert_eq!(view.messages().await.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_canned_responder_picks_from_catalog() {
    let responder = CannedResponder::new(2000..3000);
    let room = Chatroom::new(ChatroomId::from("r"), "room");
    for _ in 0..10 {
        let started = Instant::now();
        let reply = responder.respond(&room).await;
        let elapsed = started.elapsed();
        assert!(CANNED_REPLIES.contains(&reply.as_str()));
        assert!(elapsed >= Duration::from_millis(2000));
        assert!(elapsed < Duration::from_millis(3001));
    }
}
