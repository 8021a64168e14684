//! In-memory message bus.
//!
//! Backs the CLI's local mode and the test suite. Delivery is in-process
//! fan-out to every subscription on a topic; the at-least-once contract is
//! honored in the sense that a message is handed to each live subscriber
//! exactly once and acks are observable, but crashed-subscriber redelivery
//! is out of scope for a single-process backend.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, mpsc};

use crate::error::{BusError, StoreError};

use super::{Ack, BusMessage, DocumentStore, MessageBus, SubscriptionOptions};

/// Delivery channel capacity per subscription.
const SUBSCRIPTION_BUFFER: usize = 256;

#[derive(Default)]
struct Topic {
    subscriptions: HashMap<String, mpsc::Sender<BusMessage>>,
}

/// In-process pub/sub bus.
#[derive(Default)]
pub struct InMemoryBus {
    topics: Mutex<HashMap<String, Topic>>,
    acks: Mutex<Vec<Ack>>,
}

impl InMemoryBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acks recorded so far, for assertions in tests.
    pub async fn recorded_acks(&self) -> Vec<Ack> {
        self.acks.lock().await.clone()
    }

    /// Whether a topic currently exists.
    pub async fn topic_exists(&self, topic: &str) -> bool {
        self.topics.lock().await.contains_key(topic)
    }

    /// Number of subscriptions attached to a topic. Lets tests wait for
    /// a consumer before publishing.
    pub async fn subscription_count(&self, topic: &str) -> usize {
        self.topics
            .lock()
            .await
            .get(topic)
            .map_or(0, |t| t.subscriptions.len())
    }
}

#[async_trait]
impl MessageBus for InMemoryBus {
    async fn ensure_topic(&self, topic: &str) -> Result<(), BusError> {
        self.topics
            .lock()
            .await
            .entry(topic.to_string())
            .or_default();
        Ok(())
    }

    async fn delete_topic(&self, topic: &str) -> Result<(), BusError> {
        // Dropping the senders closes every subscription channel.
        self.topics.lock().await.remove(topic);
        Ok(())
    }

    async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        attributes: HashMap<String, String>,
    ) -> Result<(), BusError> {
        let senders: Vec<mpsc::Sender<BusMessage>> = {
            let topics = self.topics.lock().await;
            let entry = topics.get(topic).ok_or_else(|| BusError::Publish {
                topic: topic.to_string(),
                message: "topic does not exist".to_string(),
            })?;
            entry.subscriptions.values().cloned().collect()
        };

        for sender in senders {
            let (msg, ack_rx) = BusMessage::new(payload.clone(), attributes.clone());
            if sender.send(msg).await.is_err() {
                continue; // subscriber went away
            }
            let acks = &self.acks;
            if let Ok(ack) = ack_rx.await {
                acks.lock().await.push(ack);
            }
        }

        Ok(())
    }

    async fn subscribe(
        &self,
        topic: &str,
        subscription: &str,
        _options: SubscriptionOptions,
    ) -> Result<mpsc::Receiver<BusMessage>, BusError> {
        let mut topics = self.topics.lock().await;
        let entry = topics.entry(topic.to_string()).or_default();

        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        entry.subscriptions.insert(subscription.to_string(), tx);
        Ok(rx)
    }
}

/// In-memory document store for tests and local runs.
#[derive(Default)]
pub struct InMemoryStore {
    documents: Mutex<HashMap<(String, String), Value>>,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.documents.lock().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.documents.lock().await.is_empty()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn put(&self, collection: &str, id: &str, document: &Value) -> Result<(), StoreError> {
        self.documents
            .lock()
            .await
            .insert((collection.to_string(), id.to_string()), document.clone());
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        Ok(self
            .documents
            .lock()
            .await
            .get(&(collection.to_string(), id.to_string()))
            .cloned())
    }
}
