//! Bounded inbound event buffer
//!
//! Decouples session callback threads from event dispatch. Producers perform
//! a non-blocking push and return immediately; a single consumer drains the
//! queue for the hub's lifetime, which gives dispatch a global cross-adapter
//! FIFO ordering relative to enqueue order.

use crate::config::OverflowPolicy;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Notify;
use types::{DepthEvent, TopOfBookEvent, TradeEvent};

/// Translated-but-undispatched work item carried on the buffer
///
/// Data events and session lifecycle signals share one queue so the consumer
/// observes them in arrival order.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    /// Normalized trade from a session callback
    Trade {
        /// Adapter that produced the event
        adapter: String,
        /// The translated event
        event: TradeEvent,
    },
    /// Order book depth change
    Depth {
        /// Adapter that produced the event
        adapter: String,
        /// The translated event
        event: DepthEvent,
    },
    /// Top-of-book quote update
    TopOfBook {
        /// Adapter that produced the event
        adapter: String,
        /// The translated event
        event: TopOfBookEvent,
    },
    /// Session established its connection
    Connected {
        /// Adapter whose session connected
        adapter: String,
    },
    /// Session lost its connection unexpectedly
    Disconnected {
        /// Adapter whose session dropped
        adapter: String,
        /// Venue-supplied reason, when available
        reason: Option<String>,
    },
    /// Session-level error while connected
    Error {
        /// Adapter whose session errored
        adapter: String,
        /// Description from the session
        reason: String,
    },
}

impl InboundEvent {
    /// Adapter id this event originated from
    pub fn adapter(&self) -> &str {
        match self {
            InboundEvent::Trade { adapter, .. }
            | InboundEvent::Depth { adapter, .. }
            | InboundEvent::TopOfBook { adapter, .. }
            | InboundEvent::Connected { adapter }
            | InboundEvent::Disconnected { adapter, .. }
            | InboundEvent::Error { adapter, .. } => adapter,
        }
    }
}

/// Counters describing buffer activity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferStats {
    /// Events currently queued
    pub depth: usize,
    /// Configured capacity
    pub capacity: usize,
    /// Events accepted since creation
    pub pushed: u64,
    /// Events dropped due to overflow since creation
    pub dropped: u64,
}

/// Bounded FIFO queue with a non-blocking producer side
pub struct EventBuffer {
    queue: Mutex<VecDeque<InboundEvent>>,
    capacity: usize,
    policy: OverflowPolicy,
    notify: Notify,
    pushed: AtomicU64,
    dropped: AtomicU64,
}

impl EventBuffer {
    /// Create a buffer with the given capacity and overflow policy
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity.min(4096))),
            capacity,
            policy,
            notify: Notify::new(),
            pushed: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Non-blocking enqueue attempt
    ///
    /// Returns false when the event was dropped under the DropNewest policy.
    /// Never blocks the caller; this is the producer path used by session
    /// callback threads.
    pub fn push(&self, event: InboundEvent) -> bool {
        {
            let mut queue = self.queue.lock();
            if queue.len() >= self.capacity {
                match self.policy {
                    OverflowPolicy::DropOldest => {
                        queue.pop_front();
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                    }
                    // Block is rejected at config validation; treat any
                    // other policy as drop-newest here
                    OverflowPolicy::DropNewest | OverflowPolicy::Block => {
                        self.dropped.fetch_add(1, Ordering::Relaxed);
                        return false;
                    }
                }
            }
            queue.push_back(event);
        }
        self.pushed.fetch_add(1, Ordering::Relaxed);
        self.notify.notify_one();
        true
    }

    /// Await and remove the next event
    ///
    /// Single-consumer: the hub runs exactly one task calling this.
    pub async fn pop(&self) -> InboundEvent {
        loop {
            if let Some(event) = self.queue.lock().pop_front() {
                return event;
            }
            self.notify.notified().await;
        }
    }

    /// Current buffer counters
    pub fn stats(&self) -> BufferStats {
        BufferStats {
            depth: self.queue.lock().len(),
            capacity: self.capacity,
            pushed: self.pushed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected(adapter: &str) -> InboundEvent {
        InboundEvent::Connected {
            adapter: adapter.to_string(),
        }
    }

    #[tokio::test]
    async fn push_pop_preserves_fifo_order() {
        let buffer = EventBuffer::new(16, OverflowPolicy::DropNewest);
        buffer.push(connected("a"));
        buffer.push(connected("b"));
        buffer.push(connected("c"));

        assert_eq!(buffer.pop().await.adapter(), "a");
        assert_eq!(buffer.pop().await.adapter(), "b");
        assert_eq!(buffer.pop().await.adapter(), "c");
    }

    #[tokio::test]
    async fn drop_newest_discards_incoming_when_full() {
        let buffer = EventBuffer::new(2, OverflowPolicy::DropNewest);
        assert!(buffer.push(connected("a")));
        assert!(buffer.push(connected("b")));
        assert!(!buffer.push(connected("c")));

        let stats = buffer.stats();
        assert_eq!(stats.depth, 2);
        assert_eq!(stats.dropped, 1);
        assert_eq!(buffer.pop().await.adapter(), "a");
        assert_eq!(buffer.pop().await.adapter(), "b");
    }

    #[tokio::test]
    async fn drop_oldest_evicts_head_when_full() {
        let buffer = EventBuffer::new(2, OverflowPolicy::DropOldest);
        assert!(buffer.push(connected("a")));
        assert!(buffer.push(connected("b")));
        assert!(buffer.push(connected("c")));

        let stats = buffer.stats();
        assert_eq!(stats.depth, 2);
        assert_eq!(stats.dropped, 1);
        assert_eq!(buffer.pop().await.adapter(), "b");
        assert_eq!(buffer.pop().await.adapter(), "c");
    }

    #[tokio::test]
    async fn producers_never_block_under_overload() {
        let buffer = std::sync::Arc::new(EventBuffer::new(8, OverflowPolicy::DropNewest));

        // No consumer draining: every push must still return promptly
        let producer = {
            let buffer = buffer.clone();
            std::thread::spawn(move || {
                for _ in 0..10_000 {
                    buffer.push(connected("x"));
                }
            })
        };
        producer.join().unwrap();

        let stats = buffer.stats();
        assert_eq!(stats.pushed + stats.dropped, 10_000);
        assert!(stats.depth <= 8);
    }

    #[tokio::test]
    async fn pop_wakes_on_late_push() {
        let buffer = std::sync::Arc::new(EventBuffer::new(4, OverflowPolicy::DropNewest));
        let consumer = {
            let buffer = buffer.clone();
            tokio::spawn(async move { buffer.pop().await })
        };

        tokio::task::yield_now().await;
        buffer.push(connected("late"));

        let event = consumer.await.unwrap();
        assert_eq!(event.adapter(), "late");
    }
}
