use crate::models::Message;

/// The slice of a chatroom's history currently shown, extended backward a
/// page at a time.
///
/// Opening shows the last `page_size` messages. Each [`MessageWindow::load_older`]
/// reveals `messages[next_start..end]` where
/// `next_start = total - (page + 1) * page_size` (clamped at zero) and `end`
/// is the history index of the first shown message. Messages appended while
/// the window is open are pushed straight onto the end and do not touch the
/// page counter. Each load also re-reads the tail, so messages stored by
/// someone else show up instead of shifting the revealed slice.
#[derive(Clone, Debug)]
pub struct MessageWindow {
    page_size: usize,
    page: usize,
    has_more: bool,
    start: usize,
    displayed: Vec<Message>,
}

impl MessageWindow {
    pub fn open(messages: &[Message], page_size: usize) -> Self {
        let page_size = page_size.max(1);
        let start = messages.len().saturating_sub(page_size);
        tracing::trace!(total = messages.len(), start, "Opening message window");
        Self {
            page_size,
            page: 1,
            has_more: start > 0,
            start,
            displayed: messages[start..].to_vec(),
        }
    }

    /// Prepends the next older page out of `messages`, the chatroom's full
    /// history. Returns how many messages were revealed.
    pub fn load_older(&mut self, messages: &[Message]) -> usize {
        let total = messages.len();
        let next_page = self.page + 1;
        let next_start = total.saturating_sub(next_page.saturating_mul(self.page_size));
        let end = self.start.min(total);
        tracing::trace!(total, next_start, end, page = self.page, "Loading older messages");
        if next_start >= end {
            self.has_more = false;
            return 0;
        }
        if self.displayed.len() != total - end {
            tracing::debug!(
                shown = self.displayed.len(),
                stored = total - end,
                "Resyncing window tail with history",
            );
        }
        self.displayed = messages[next_start..].to_vec();
        self.start = next_start;
        self.page = next_page;
        self.has_more = next_start > 0;
        end - next_start
    }

    pub fn push(&mut self, message: Message) {
        self.displayed.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.displayed
    }

    pub fn len(&self) -> usize {
        self.displayed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.displayed.is_empty()
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// The whole history is shown.
    pub fn at_beginning(&self) -> bool {
        !self.has_more && !self.displayed.is_empty()
    }
}

/// Scroll extent captured before older content is inserted above the
/// viewport.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScrollAnchor {
    extent_before: f64,
}

impl ScrollAnchor {
    pub fn capture(extent: f64) -> Self {
        Self {
            extent_before: extent,
        }
    }

    /// Offset that keeps the previously visible content in place once the
    /// view has grown to `extent_after`.
    pub fn offset_for(&self, extent_after: f64) -> f64 {
        (extent_after - self.extent_before).max(0.0)
    }
}
