//! Per-batch status feeds.
//!
//! Every batch gets its own unbounded channel keyed by [`BatchId`]. The relay
//! retains the receiving ends of recent batches so a browser can attach after
//! the batch has started; reading is destructive, so two viewers of the same
//! batch split its messages between them.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::StreamExt;
use futures::stream::{self, BoxStream};
use tokio::sync::mpsc;

use super::models::{BatchId, StatusMessage};

/// How long a consumer waits for the next message before the stream ends.
pub const STATUS_IDLE_TIMEOUT: Duration = Duration::from_secs(1);

/// Feeds kept for batches nobody has drained yet. Oldest are dropped first.
const MAX_RETAINED_FEEDS: usize = 32;

type Feed = Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<StatusMessage>>>;

/// Producer side of one batch's feed.
#[derive(Clone)]
pub struct StatusSender {
    batch: BatchId,
    tx: mpsc::UnboundedSender<StatusMessage>,
}

impl StatusSender {
    /// A sender that is not registered with any relay, plus its receiver.
    pub fn detached() -> (Self, mpsc::UnboundedReceiver<StatusMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                batch: BatchId::new(),
                tx,
            },
            rx,
        )
    }

    pub fn batch(&self) -> BatchId {
        self.batch
    }

    pub fn emit(&self, msg: StatusMessage) {
        tracing::info!(batch = %self.batch, kind = msg.kind(), number = %msg.number(), "{}", msg);
        // Nobody listening is fine; the feed may have been evicted.
        let _ = self.tx.send(msg);
    }
}

pub struct StatusRelay {
    feeds: Mutex<VecDeque<(BatchId, Feed)>>,
    idle_timeout: Duration,
}

impl Default for StatusRelay {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusRelay {
    pub fn new() -> Self {
        Self::with_idle_timeout(STATUS_IDLE_TIMEOUT)
    }

    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            feeds: Mutex::new(VecDeque::new()),
            idle_timeout,
        }
    }

    fn feeds(&self) -> MutexGuard<'_, VecDeque<(BatchId, Feed)>> {
        // The deque is always left consistent, so a poisoned lock is still usable.
        self.feeds.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a new batch and return the sender its dialer writes to.
    pub fn open_batch(&self) -> StatusSender {
        let (tx, rx) = mpsc::unbounded_channel();
        let batch = BatchId::new();
        let mut feeds = self.feeds();
        feeds.push_back((batch, Arc::new(tokio::sync::Mutex::new(rx))));
        while feeds.len() > MAX_RETAINED_FEEDS {
            if let Some((evicted, _)) = feeds.pop_front() {
                tracing::debug!(batch = %evicted, "evicting undrained status feed");
            }
        }
        StatusSender { batch, tx }
    }

    /// The feed for `batch`, or the most recent one when `batch` is `None`.
    fn feed(&self, batch: Option<BatchId>) -> Option<(BatchId, Feed)> {
        let feeds = self.feeds();
        match batch {
            Some(id) => feeds.iter().find(|(b, _)| *b == id).cloned(),
            None => feeds.back().cloned(),
        }
    }

    fn retire(&self, batch: BatchId) {
        self.feeds().retain(|(b, _)| *b != batch);
        tracing::debug!(batch = %batch, "status feed drained and retired");
    }

    /// Number of feeds currently retained.
    pub fn retained(&self) -> usize {
        self.feeds().len()
    }

    pub fn latest_batch(&self) -> Option<BatchId> {
        self.feeds().back().map(|(b, _)| *b)
    }

    /// Drain a batch's feed. The stream ends when no message arrives within the
    /// idle timeout, or when the batch has finished and everything was read
    /// (which also retires the feed). Unknown batches yield an empty stream.
    pub fn stream(self: &Arc<Self>, batch: Option<BatchId>) -> BoxStream<'static, StatusMessage> {
        let Some((id, feed)) = self.feed(batch) else {
            return stream::empty().boxed();
        };
        let idle = self.idle_timeout;
        let relay = Arc::clone(self);

        stream::unfold(Some((relay, id, feed)), move |state| async move {
            let (relay, id, feed) = state?;
            let next = {
                let mut rx = feed.lock().await;
                tokio::time::timeout(idle, rx.recv()).await
            };
            match next {
                Ok(Some(msg)) => Some((msg, Some((relay, id, feed)))),
                Ok(None) => {
                    relay.retire(id);
                    None
                }
                Err(_) => None,
            }
        })
        .boxed()
    }
}
