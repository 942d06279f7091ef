//! Bounded work queue between the manifest producer and the worker pool.
//!
//! When the buffer is full, the sender blocks, providing backpressure so the
//! producer never reads more of the manifest than the workers can absorb.
//! Dropping the last sender closes the queue; receivers drain what is left and
//! then see `None`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use crate::types::WorkItem;

/// Create a bounded work queue with room for `capacity` undelivered items.
///
/// Panics if `capacity` is zero; configuration validation rules that out.
pub fn work_queue(capacity: usize) -> (QueueSender, QueueReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    let sender = QueueSender {
        tx,
        peak: Arc::new(AtomicUsize::new(0)),
    };
    let receiver = QueueReceiver {
        rx: Arc::new(Mutex::new(rx)),
    };
    (sender, receiver)
}

/// Producer side of the work queue.
pub struct QueueSender {
    tx: mpsc::Sender<WorkItem>,
    peak: Arc<AtomicUsize>,
}

impl QueueSender {
    /// Push an item, blocking the current thread while the queue is full.
    ///
    /// Must be called from a blocking context (a plain thread or
    /// `spawn_blocking`), never from async code. Returns the item back if every
    /// receiver is gone.
    pub fn push_blocking(&self, item: WorkItem) -> Result<(), WorkItem> {
        self.tx.blocking_send(item).map_err(|e| e.0)?;
        self.record_depth();
        Ok(())
    }

    /// Async variant of [`push_blocking`](Self::push_blocking).
    pub async fn push(&self, item: WorkItem) -> Result<(), WorkItem> {
        self.tx.send(item).await.map_err(|e| e.0)?;
        self.record_depth();
        Ok(())
    }

    /// Number of items currently buffered and not yet taken by a worker.
    pub fn depth(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    /// Configured queue capacity.
    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    /// Handle for reading the high-water mark after the sender is dropped.
    pub fn monitor(&self) -> QueueMonitor {
        QueueMonitor {
            peak: self.peak.clone(),
        }
    }

    fn record_depth(&self) {
        self.peak.fetch_max(self.depth(), Ordering::Relaxed);
    }
}

/// Read-only view of queue instrumentation.
#[derive(Clone)]
pub struct QueueMonitor {
    peak: Arc<AtomicUsize>,
}

impl QueueMonitor {
    /// Highest depth observed right after a push.
    pub fn peak_depth(&self) -> usize {
        self.peak.load(Ordering::Relaxed)
    }
}

/// Consumer side of the work queue, shared by all workers.
#[derive(Clone)]
pub struct QueueReceiver {
    rx: Arc<Mutex<mpsc::Receiver<WorkItem>>>,
}

impl QueueReceiver {
    /// Wait for the next item.
    ///
    /// An empty queue whose producer is still alive parks the caller; `None`
    /// means the queue is closed and fully drained.
    pub async fn recv(&self) -> Option<WorkItem> {
        self.rx.lock().await.recv().await
    }
}
