//! Many-producer/single-consumer command queues feeding the worker.
//!
//! Producers enqueue from the owner context without ever blocking; the
//! worker is the sole consumer. Every successful enqueue pokes the worker's
//! wake signal so an idle loop picks the item up immediately instead of on
//! the next timeout tick.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::Notify;

/// Producer endpoint. Cheap to clone; all clones feed the same drain.
pub struct CommandQueue<T> {
    tx: mpsc::UnboundedSender<T>,
    wake: Arc<Notify>,
}

impl<T> Clone for CommandQueue<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            wake: self.wake.clone(),
        }
    }
}

impl<T> CommandQueue<T> {
    /// Enqueue an item and wake the worker. Returns `false` once the worker
    /// has gone away (its drain was dropped); the item is discarded in that
    /// case, which only happens during shutdown.
    pub fn enqueue(&self, item: T) -> bool {
        if self.tx.send(item).is_err() {
            return false;
        }
        self.wake.notify_one();
        true
    }
}

/// Consumer endpoint, owned by the worker.
pub struct CommandDrain<T> {
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T> CommandDrain<T> {
    /// Pop the next queued item, if any. FIFO per queue.
    pub fn try_next(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Drain everything currently queued, preserving submission order.
    pub fn drain(&mut self) -> Vec<T> {
        let mut items = Vec::new();
        while let Some(item) = self.try_next() {
            items.push(item);
        }
        items
    }
}

/// Build a queue pair sharing the worker's wake signal.
pub fn command_queue<T>(wake: Arc<Notify>) -> (CommandQueue<T>, CommandDrain<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (CommandQueue { tx, wake }, CommandDrain { rx })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn preserves_fifo_order() {
        let wake = Arc::new(Notify::new());
        let (queue, mut drain) = command_queue(wake);

        for i in 0..100 {
            assert!(queue.enqueue(i));
        }
        assert_eq!(drain.drain(), (0..100).collect::<Vec<_>>());
        assert!(drain.try_next().is_none());
    }

    #[tokio::test]
    async fn producers_interleave_without_loss() {
        let wake = Arc::new(Notify::new());
        let (queue, mut drain) = command_queue(wake);

        let mut handles = Vec::new();
        for producer in 0..4 {
            let queue = queue.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..25 {
                    queue.enqueue((producer, i));
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let items = drain.drain();
        assert_eq!(items.len(), 100);
        // Per-producer FIFO even though producers interleave.
        for producer in 0..4 {
            let seen: Vec<_> = items.iter().filter(|(p, _)| *p == producer).collect();
            for (idx, (_, i)) in seen.iter().enumerate() {
                assert_eq!(*i, idx);
            }
        }
    }

    #[tokio::test]
    async fn enqueue_wakes_an_idle_waiter() {
        let wake = Arc::new(Notify::new());
        let (queue, _drain) = command_queue(wake.clone());

        let waiter = tokio::spawn(async move { wake.notified().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        queue.enqueue(1u8);

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("wake signal not delivered")
            .unwrap();
    }

    #[tokio::test]
    async fn enqueue_fails_after_drain_dropped() {
        let wake = Arc::new(Notify::new());
        let (queue, drain) = command_queue::<u8>(wake);
        drop(drain);
        assert!(!queue.enqueue(1));
    }
}
