use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use ringbuffer::{AllocRingBuffer, RingBuffer};

use super::models::ChatMessage;

pub const DEFAULT_CAPACITY: usize = 50;

struct InboxState {
    buffer: AllocRingBuffer<ChatMessage>,
    last_received: Option<Instant>,
    unread: usize,
}

/// Capped buffer of inbound messages shared between the socket reader and
/// the environment. Once full, the oldest message is dropped.
#[derive(Clone)]
pub struct Inbox {
    state: Arc<Mutex<InboxState>>,
}

impl Inbox {
    pub fn new(capacity: usize) -> Self {
        Inbox {
            state: Arc::new(Mutex::new(InboxState {
                buffer: AllocRingBuffer::new(capacity.max(1)),
                last_received: None,
                unread: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, InboxState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, message: ChatMessage) {
        let mut state = self.lock();
        state.buffer.push(message);
        state.last_received = Some(Instant::now());
        state.unread += 1;
    }

    pub fn len(&self) -> usize {
        self.lock().buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.lock().buffer.capacity()
    }

    pub fn last(&self) -> Option<ChatMessage> {
        self.lock().buffer.back().cloned()
    }

    /// The `n` most recent messages, oldest first.
    pub fn recent(&self, n: usize) -> Vec<ChatMessage> {
        let state = self.lock();
        let all: Vec<&ChatMessage> = state.buffer.iter().collect();
        let start = all.len().saturating_sub(n);
        all[start..].iter().map(|m| (*m).clone()).collect()
    }

    pub fn since_last(&self) -> Option<Duration> {
        self.lock().last_received.map(|t| t.elapsed())
    }

    /// Messages received since the last [`Inbox::mark_read`].
    pub fn unread(&self) -> usize {
        self.lock().unread
    }

    pub fn mark_read(&self) {
        self.lock().unread = 0;
    }

    pub fn clear(&self) {
        let mut state = self.lock();
        state.buffer.clear();
        state.last_received = None;
        state.unread = 0;
    }
}

impl Default for Inbox {
    fn default() -> Self {
        Inbox::new(DEFAULT_CAPACITY)
    }
}
