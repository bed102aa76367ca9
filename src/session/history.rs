use std::collections::{vec_deque, VecDeque};
use tracing::debug;

use super::message::Message;
use crate::constants::HISTORY_EVICTION_THRESHOLD;

/// Sliding window over the most recent messages of one conversation
///
/// The overflow check runs before the new message is pushed, so once the
/// buffer is full it holds `HISTORY_EVICTION_THRESHOLD + 1` messages.
#[derive(Debug, Clone, Default)]
pub struct HistoryBuffer {
    messages: VecDeque<Message>,
}

impl HistoryBuffer {
    pub fn new() -> Self {
        Self {
            messages: VecDeque::with_capacity(HISTORY_EVICTION_THRESHOLD + 1),
        }
    }

    /// Add a message, dropping the oldest one first if the window is full
    pub fn append(&mut self, message: Message) {
        if self.messages.len() > HISTORY_EVICTION_THRESHOLD {
            self.evict_oldest();
        }
        self.messages.push_back(message);
    }

    /// Drop the oldest message. Does nothing on an empty buffer.
    pub fn evict_oldest(&mut self) {
        if let Some(dropped) = self.messages.pop_front() {
            debug!(
                "Dropping oldest {} message from chat history ({} remain)",
                dropped.role().as_str(),
                self.messages.len()
            );
        }
    }

    /// All message contents joined by single spaces, oldest first
    pub fn render(&self) -> String {
        self.messages
            .iter()
            .map(Message::content)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Messages oldest first. Clone the iterator to walk it again.
    pub fn all(&self) -> vec_deque::Iter<'_, Message> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
