use std::ops::Range;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng as _;
use rand::seq::SliceRandom as _;
use tokio::time::sleep;

use crate::models::Chatroom;

pub const CANNED_REPLIES: &[&str] = &[
    "That's an interesting question! Let me help you with that.",
    "I understand what you're asking. Here's what I think...",
    "Great point! From my perspective, I would say...",
    "Let me break that down for you in a clear way.",
    "That's a thoughtful query. Based on the information available...",
    "I'd be happy to help you with that! Here's my take...",
    "Excellent question! Let me provide some insights on that.",
    "I see where you're coming from. Here's how I would approach this...",
];

/// Produces the assistant's answer to a conversation.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(&self, chatroom: &Chatroom) -> String;
}

/// Waits a random delay, then answers with a random line from a fixed
/// catalog. Never fails.
pub struct CannedResponder {
    replies: Vec<String>,
    delay_ms: Range<u64>,
}

impl CannedResponder {
    pub fn new(delay_ms: Range<u64>) -> Self {
        Self::with_replies(CANNED_REPLIES.iter().map(|s| s.to_string()).collect(), delay_ms)
    }

    pub fn with_replies(replies: Vec<String>, delay_ms: Range<u64>) -> Self {
        let delay_ms = if !delay_ms.is_empty() {
            delay_ms
        } else {
            let start = delay_ms.start;
            match start.checked_add(1) {
                Some(end) => start..end,
                None => start - 1..start,
            }
        };
        Self { replies, delay_ms }
    }

    fn next_delay(&self) -> Duration {
        Duration::from_millis(rand::thread_rng().gen_range(self.delay_ms.clone()))
    }

    fn pick(&self) -> String {
        self.replies
            .choose(&mut rand::thread_rng())
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl Responder for CannedResponder {
    async fn respond(&self, chatroom: &Chatroom) -> String {
        let delay = self.next_delay();
        tracing::trace!(
            chatroom_id = %chatroom.id,
            history = chatroom.messages.len(),
            ?delay,
            "Generating reply",
        );
        sleep(delay).await;
        self.pick()
    }
}
