//! Error reports and handshake notifications.
//!
//! Both are delivered through bounded, best-effort queues. Pushing never
//! blocks the dispatch path: when a queue is full the configured
//! [`OverflowPolicy`] decides which event is discarded, the discard is
//! counted and logged. With nobody draining a queue the state machine keeps
//! serving; the most recent (or oldest) `capacity` events remain available.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::config::{EventConfig, OverflowPolicy};
use crate::error::SmError;
use crate::protocol::{ConnRef, Message};

/// A reportable failure
pub struct ErrorReport {
    /// What went wrong
    pub error: SmError,
    /// Offending message, if any
    pub message: Option<Message>,
    /// Connection it happened on, if any
    pub conn: Option<ConnRef>,
}

impl ErrorReport {
    /// Report without message or connection
    pub fn new(error: SmError) -> Self {
        Self {
            error,
            message: None,
            conn: None,
        }
    }

    /// Attach the offending message
    pub fn with_message(mut self, message: &Message) -> Self {
        self.message = Some(message.clone());
        self
    }

    /// Attach the connection
    pub fn with_conn(mut self, conn: &ConnRef) -> Self {
        self.conn = Some(ConnRef::clone(conn));
        self
    }
}

impl fmt::Debug for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorReport")
            .field("error", &self.error)
            .field("message", &self.message.as_ref().map(Message::command_index))
            .field("remote_addr", &self.conn.as_ref().and_then(|c| c.remote_addr()))
            .finish()
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

struct Shared<T> {
    name: &'static str,
    items: Mutex<VecDeque<T>>,
    notify: Notify,
    capacity: usize,
    policy: OverflowPolicy,
    dropped: AtomicU64,
    closed: AtomicBool,
}

/// Producer side of an event queue. Dropping it closes the queue.
pub struct EventSender<T> {
    shared: Arc<Shared<T>>,
}

/// Consumer side of an event queue. Clones compete for the same events.
pub struct EventReceiver<T> {
    shared: Arc<Shared<T>>,
}

/// Create a bounded event queue
pub fn queue<T>(name: &'static str, config: &EventConfig) -> (EventSender<T>, EventReceiver<T>) {
    let capacity = config.capacity.max(1);
    let shared = Arc::new(Shared {
        name,
        items: Mutex::new(VecDeque::with_capacity(capacity)),
        notify: Notify::new(),
        capacity,
        policy: config.overflow,
        dropped: AtomicU64::new(0),
        closed: AtomicBool::new(false),
    });
    (
        EventSender {
            shared: Arc::clone(&shared),
        },
        EventReceiver { shared },
    )
}

impl<T> EventSender<T> {
    /// Queue an event without blocking. Returns false if this event was
    /// discarded (drop-newest on a full queue).
    pub fn push(&self, event: T) -> bool {
        let shared = &self.shared;
        let (accepted, overflowed) = {
            let mut items = shared.items.lock();
            if items.len() < shared.capacity {
                items.push_back(event);
                (true, false)
            } else {
                match shared.policy {
                    OverflowPolicy::DropNewest => (false, true),
                    OverflowPolicy::DropOldest => {
                        items.pop_front();
                        items.push_back(event);
                        (true, true)
                    },
                }
            }
        };

        if overflowed {
            let total = shared.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::warn!(
                "{} queue full ({}), {:?}: {} event(s) discarded",
                shared.name,
                shared.capacity,
                shared.policy,
                total
            );
        }
        if accepted {
            shared.notify.notify_one();
        }
        accepted
    }

    /// Events discarded so far
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }
}

impl<T> Drop for EventSender<T> {
    fn drop(&mut self) {
        self.shared.closed.store(true, Ordering::Release);
        self.shared.notify.notify_waiters();
        self.shared.notify.notify_one();
    }
}

impl<T> EventReceiver<T> {
    /// Wait for the next event. Returns `None` once the sender is gone and
    /// the queue is drained.
    pub async fn recv(&self) -> Option<T> {
        loop {
            let notified = self.shared.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(event) = self.try_recv() {
                return Some(event);
            }
            if self.shared.closed.load(Ordering::Acquire) {
                return None;
            }
            notified.await;
        }
    }

    /// Take the next event if one is queued
    pub fn try_recv(&self) -> Option<T> {
        self.shared.items.lock().pop_front()
    }

    /// Queued events
    pub fn len(&self) -> usize {
        self.shared.items.lock().len()
    }

    /// Check if no event is queued
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Events discarded so far
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    /// Queue name, for logging
    pub fn name(&self) -> &'static str {
        self.shared.name
    }
}

impl<T> Clone for EventReceiver<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::protocol::{avp, CommandIndex, RE_AUTH};
    use crate::transport::MemoryConn;

    fn config(capacity: usize, overflow: OverflowPolicy) -> EventConfig {
        EventConfig { capacity, overflow }
    }

    #[test]
    fn test_drop_oldest() {
        let (tx, rx) = queue("test", &config(2, OverflowPolicy::DropOldest));
        assert!(tx.push(1));
        assert!(tx.push(2));
        assert!(tx.push(3));

        assert_eq!(rx.len(), 2);
        assert_eq!(rx.dropped(), 1);
        assert_eq!(rx.try_recv(), Some(2));
        assert_eq!(rx.try_recv(), Some(3));
        assert_eq!(rx.try_recv(), None);
    }

    #[test]
    fn test_drop_newest() {
        let (tx, rx) = queue("test", &config(2, OverflowPolicy::DropNewest));
        assert!(tx.push(1));
        assert!(tx.push(2));
        assert!(!tx.push(3));

        assert_eq!(tx.dropped(), 1);
        assert_eq!(rx.try_recv(), Some(1));
        assert_eq!(rx.try_recv(), Some(2));
        assert!(rx.is_empty());
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let (tx, rx) = queue("test", &config(0, OverflowPolicy::DropNewest));
        assert!(tx.push("a"));
        assert!(!tx.push("b"));
        assert_eq!(rx.try_recv(), Some("a"));
    }

    #[tokio::test]
    async fn test_recv_wakes_on_push() {
        let (tx, rx) = queue("test", &EventConfig::default());
        let waiter = tokio::spawn({
            let rx = rx.clone();
            async move { rx.recv().await }
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        tx.push(42);

        let got = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("receiver not woken")
            .unwrap();
        assert_eq!(got, Some(42));
    }

    #[tokio::test]
    async fn test_recv_none_after_close() {
        let (tx, rx) = queue("test", &EventConfig::default());
        tx.push(1);
        drop(tx);

        assert_eq!(rx.recv().await, Some(1));
        assert_eq!(rx.recv().await, None);
    }

    #[test]
    fn test_error_report_debug() {
        let conn: ConnRef = MemoryConn::with_addrs(
            "127.0.0.1:3868".parse().unwrap(),
            "127.0.0.1:40000".parse().unwrap(),
        );
        let msg = crate::protocol::Message::request(RE_AUTH, 0, 1, 1);
        let report = ErrorReport::new(SmError::MissingAvp {
            name: "Origin-Host",
            code: avp::ORIGIN_HOST,
        })
        .with_message(&msg)
        .with_conn(&conn);

        assert_eq!(report.to_string(), "missing AVP: Origin-Host");
        assert_eq!(
            report.message.as_ref().map(Message::command_index),
            Some(CommandIndex::new(0, RE_AUTH, true))
        );
        let debug = format!("{report:?}");
        assert!(debug.contains("40000"));
    }
}
