//! Per-session result queue.
//!
//! Wraps a bus subscription on `research-results-<session>` and demuxes
//! inbound messages into an in-process channel of [`WorkerResult`]s.
//! Delivery is at-least-once; duplicates (same worker id) are accepted
//! and passed downstream untouched.
//!
//! Back-pressure: the result channel holds 100 entries. When it is full
//! the consumer drops the value but still acks, trading result loss under
//! pathological overflow for never blocking the bus.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::core::WorkerResult;
use crate::error::BusError;
use crate::hosting::{BusMessage, MessageBus, SubscriptionOptions};

use super::provisioner::results_topic;

/// Capacity of the in-process result channel.
const RESULT_CHANNEL_CAPACITY: usize = 100;
/// Capacity of the diagnostic error channel.
const ERROR_CHANNEL_CAPACITY: usize = 10;
/// Ack deadline requested on the subscription.
const ACK_DEADLINE: Duration = Duration::from_secs(30);
/// Retention requested on the subscription.
const RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

/// Subscription name for a session.
#[must_use]
pub fn subscription_name(session_id: &str) -> String {
    format!("research-results-sub-{session_id}")
}

/// Per-session async sink for worker results.
pub struct ResultQueue {
    session_id: String,
    subscribed: AtomicBool,
    result_tx: Mutex<Option<mpsc::Sender<WorkerResult>>>,
    result_rx: Mutex<Option<mpsc::Receiver<WorkerResult>>>,
    error_tx: Mutex<Option<mpsc::Sender<String>>>,
    error_rx: Mutex<Option<mpsc::Receiver<String>>>,
    cancel: CancellationToken,
}

impl ResultQueue {
    /// Creates a queue for `session_id`. Nothing is subscribed until
    /// [`ResultQueue::subscribe`] is called.
    #[must_use]
    pub fn new(session_id: &str) -> Arc<Self> {
        let (result_tx, result_rx) = mpsc::channel(RESULT_CHANNEL_CAPACITY);
        let (error_tx, error_rx) = mpsc::channel(ERROR_CHANNEL_CAPACITY);
        Arc::new(Self {
            session_id: session_id.to_string(),
            subscribed: AtomicBool::new(false),
            result_tx: Mutex::new(Some(result_tx)),
            result_rx: Mutex::new(Some(result_rx)),
            error_tx: Mutex::new(Some(error_tx)),
            error_rx: Mutex::new(Some(error_rx)),
            cancel: CancellationToken::new(),
        })
    }

    /// Ensures the topic exists, attaches the subscription, and spawns the
    /// consumer. Idempotent; later calls are no-ops.
    ///
    /// # Errors
    ///
    /// Returns [`BusError`] if the topic or subscription could not be set
    /// up. The subscribed flag is reset so the call can be retried.
    pub async fn subscribe(self: &Arc<Self>, bus: &dyn MessageBus) -> Result<(), BusError> {
        if self.subscribed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let topic = results_topic(&self.session_id);
        if let Err(e) = bus.ensure_topic(&topic).await {
            self.subscribed.store(false, Ordering::SeqCst);
            return Err(e);
        }

        let options = SubscriptionOptions {
            ack_deadline: ACK_DEADLINE,
            retention: RETENTION,
            ordered: true,
        };
        let receiver = match bus
            .subscribe(&topic, &subscription_name(&self.session_id), options)
            .await
        {
            Ok(receiver) => receiver,
            Err(e) => {
                self.subscribed.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        // The consumer owns clones of the senders; together with `close`
        // dropping the stored halves, consumer exit closes both channels.
        let result_tx = self.result_tx.lock().ok().and_then(|g| (*g).clone());
        let error_tx = self.error_tx.lock().ok().and_then(|g| (*g).clone());
        let (Some(result_tx), Some(error_tx)) = (result_tx, error_tx) else {
            return Err(BusError::Subscribe {
                subscription: subscription_name(&self.session_id),
                topic,
                message: "queue already closed".to_string(),
            });
        };

        let session_id = self.session_id.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(consume(session_id, receiver, result_tx, error_tx, cancel));
        Ok(())
    }

    /// Takes the read side of the result channel. `None` after the first
    /// call; there is a single consumer.
    #[must_use]
    pub fn take_result_channel(&self) -> Option<mpsc::Receiver<WorkerResult>> {
        self.result_rx.lock().ok().and_then(|mut g| g.take())
    }

    /// Takes the read side of the diagnostic error channel.
    #[must_use]
    pub fn take_error_channel(&self) -> Option<mpsc::Receiver<String>> {
        self.error_rx.lock().ok().and_then(|mut g| g.take())
    }

    /// Stops the consumer and closes both channels.
    pub fn close(&self) {
        self.cancel.cancel();
        if let Ok(mut guard) = self.result_tx.lock() {
            guard.take();
        }
        if let Ok(mut guard) = self.error_tx.lock() {
            guard.take();
        }
    }
}

impl Drop for ResultQueue {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn consume(
    session_id: String,
    mut receiver: mpsc::Receiver<BusMessage>,
    result_tx: mpsc::Sender<WorkerResult>,
    error_tx: mpsc::Sender<String>,
    cancel: CancellationToken,
) {
    loop {
        let message = tokio::select! {
            () = cancel.cancelled() => return,
            msg = receiver.recv() => match msg {
                Some(msg) => msg,
                None => return,
            },
        };

        match serde_json::from_slice::<WorkerResult>(&message.data) {
            Ok(result) => {
                if result_tx.try_send(result).is_err() {
                    // Channel full: drop on the floor but still ack.
                    warn!(%session_id, "result channel full, dropping result");
                }
                message.ack();
            }
            Err(e) => {
                message.nack();
                let diagnostic = format!("failed to unmarshal result: {e}");
                debug!(%session_id, %diagnostic);
                let _ = error_tx.try_send(diagnostic);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::core::WorkerOutcome;
    use crate::hosting::Ack;
    use crate::hosting::memory::InMemoryBus;

    fn result_payload(worker: &str) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "drone_id": worker,
            "status": "completed",
            "data": {"k": "v"},
        }))
        .expect("payload")
    }

    #[tokio::test]
    async fn test_n_published_results_in_n_out() {
        let bus = InMemoryBus::new();
        let queue = ResultQueue::new("s-1");
        queue.subscribe(&bus).await.expect("subscribe");
        let mut results = queue.take_result_channel().expect("channel");

        // Three publishers, four messages each.
        let publish = |worker: String| {
            let bus = &bus;
            async move {
                for _ in 0..4 {
                    bus.publish(
                        "research-results-s-1",
                        result_payload(&worker),
                        HashMap::new(),
                    )
                    .await
                    .expect("publish");
                }
            }
        };

        let consumer = async {
            let mut collected = Vec::new();
            for _ in 0..12 {
                collected.push(results.recv().await.expect("result"));
            }
            collected
        };

        let (_, _, _, collected) = tokio::join!(
            publish("drone-a".to_string()),
            publish("drone-b".to_string()),
            publish("drone-c".to_string()),
            consumer,
        );

        assert_eq!(collected.len(), 12);
        assert!(collected.iter().all(|r| r.status == WorkerOutcome::Completed));
    }

    #[tokio::test]
    async fn test_decode_failure_nacks_and_reports() {
        let bus = InMemoryBus::new();
        let queue = ResultQueue::new("s-2");
        queue.subscribe(&bus).await.expect("subscribe");
        let mut errors = queue.take_error_channel().expect("errors");

        bus.publish(
            "research-results-s-2",
            b"not json".to_vec(),
            HashMap::new(),
        )
        .await
        .expect("publish");

        let diagnostic = errors.recv().await.expect("error forwarded");
        assert!(diagnostic.contains("failed to unmarshal result"));
        assert_eq!(bus.recorded_acks().await, vec![Ack::Nack]);
    }

    #[tokio::test]
    async fn test_subscribe_is_idempotent() {
        let bus = InMemoryBus::new();
        let queue = ResultQueue::new("s-3");
        queue.subscribe(&bus).await.expect("first");
        queue.subscribe(&bus).await.expect("second");
    }

    #[tokio::test]
    async fn test_overflow_drops_but_acks() {
        let bus = InMemoryBus::new();
        let queue = ResultQueue::new("s-4");
        queue.subscribe(&bus).await.expect("subscribe");
        // Intentionally never drain the result channel.

        for _ in 0..(RESULT_CHANNEL_CAPACITY + 5) {
            bus.publish(
                "research-results-s-4",
                result_payload("drone-a"),
                HashMap::new(),
            )
            .await
            .expect("publish");
        }

        let acks = bus.recorded_acks().await;
        assert_eq!(acks.len(), RESULT_CHANNEL_CAPACITY + 5);
        assert!(acks.iter().all(|a| *a == Ack::Ack));
    }

    #[tokio::test]
    async fn test_close_shuts_down_consumer() {
        let bus = InMemoryBus::new();
        let queue = ResultQueue::new("s-5");
        queue.subscribe(&bus).await.expect("subscribe");
        let mut results = queue.take_result_channel().expect("channel");

        queue.close();
        assert!(results.recv().await.is_none());
    }
}
