//! Collaborator interfaces consumed by the orchestrator.
//!
//! The core never talks to a specific cloud provider. It provisions
//! workers through [`WorkerHost`], moves results over [`MessageBus`], and
//! persists reports through [`DocumentStore`]. Backends implement these
//! traits; the crate ships local implementations (in-memory bus, process
//! host, filesystem store) used by the CLI's local mode and the test
//! suite.

pub mod fs_store;
pub mod memory;
pub mod process;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::error::{BusError, HostError, StoreError};

/// Resource limits applied to one worker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceLimits {
    /// CPU allocation in whole-or-fractional cores.
    pub cpu: f64,
    /// Memory allocation in MiB.
    pub memory_mib: u32,
}

/// Everything a host needs to create one worker.
#[derive(Debug, Clone)]
pub struct WorkerSpec {
    /// Container image reference.
    pub image: String,
    /// Environment passed to the worker.
    pub env: HashMap<String, String>,
    /// CPU and memory limits.
    pub limits: ResourceLimits,
    /// Maximum concurrent requests the worker should accept.
    pub concurrency_limit: u32,
    /// How long the worker instance may live.
    pub timeout: Duration,
}

/// A worker endpoint as reported by the host.
#[derive(Debug, Clone)]
pub struct WorkerEndpoint {
    /// Externally reachable base URL.
    pub url: String,
    /// Whether the worker is accepting traffic.
    pub ready: bool,
}

/// Compute backend that can start and stop worker instances.
///
/// `create` is long-running and returns only when the worker is reachable.
/// The host handles its own transient retries; a returned error is final.
#[async_trait]
pub trait WorkerHost: Send + Sync {
    /// Creates a worker and returns its base URL once reachable.
    async fn create(&self, worker_id: &str, spec: &WorkerSpec) -> Result<String, HostError>;

    /// Deletes a worker. Long-running; returns once the instance is gone.
    async fn delete(&self, worker_id: &str) -> Result<(), HostError>;

    /// Looks up a worker's endpoint.
    async fn get(&self, worker_id: &str) -> Result<WorkerEndpoint, HostError>;
}

/// Acknowledgement outcome for a delivered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    /// Processed; do not redeliver.
    Ack,
    /// Not processed; eligible for redelivery.
    Nack,
}

/// A message delivered to a subscriber.
///
/// Dropping the message without calling [`BusMessage::ack`] or
/// [`BusMessage::nack`] counts as a nack.
#[derive(Debug)]
pub struct BusMessage {
    /// Message payload.
    pub data: Vec<u8>,
    /// Publisher-supplied attributes.
    pub attributes: HashMap<String, String>,
    ack_tx: Option<oneshot::Sender<Ack>>,
}

impl BusMessage {
    /// Creates a message and the channel its acknowledgement travels on.
    #[must_use]
    pub fn new(
        data: Vec<u8>,
        attributes: HashMap<String, String>,
    ) -> (Self, oneshot::Receiver<Ack>) {
        let (ack_tx, ack_rx) = oneshot::channel();
        (
            Self {
                data,
                attributes,
                ack_tx: Some(ack_tx),
            },
            ack_rx,
        )
    }

    /// Positively acknowledges the message.
    pub fn ack(mut self) {
        if let Some(tx) = self.ack_tx.take() {
            let _ = tx.send(Ack::Ack);
        }
    }

    /// Negatively acknowledges the message.
    pub fn nack(mut self) {
        if let Some(tx) = self.ack_tx.take() {
            let _ = tx.send(Ack::Nack);
        }
    }
}

impl Drop for BusMessage {
    fn drop(&mut self) {
        if let Some(tx) = self.ack_tx.take() {
            let _ = tx.send(Ack::Nack);
        }
    }
}

/// Subscription tuning passed to [`MessageBus::subscribe`].
#[derive(Debug, Clone, Copy)]
pub struct SubscriptionOptions {
    /// How long the bus waits for an ack before redelivery.
    pub ack_deadline: Duration,
    /// How long unacked messages are retained.
    pub retention: Duration,
    /// Whether per-publisher ordering is requested.
    pub ordered: bool,
}

impl Default for SubscriptionOptions {
    fn default() -> Self {
        Self {
            ack_deadline: Duration::from_secs(30),
            retention: Duration::from_secs(24 * 60 * 60),
            ordered: true,
        }
    }
}

/// At-least-once pub/sub transport.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Creates the topic if it does not already exist.
    async fn ensure_topic(&self, topic: &str) -> Result<(), BusError>;

    /// Deletes the topic and any attached subscriptions.
    async fn delete_topic(&self, topic: &str) -> Result<(), BusError>;

    /// Publishes a payload with attributes.
    async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        attributes: HashMap<String, String>,
    ) -> Result<(), BusError>;

    /// Attaches a named subscription and returns its delivery channel.
    /// Idempotent on the subscription name.
    async fn subscribe(
        &self,
        topic: &str,
        subscription: &str,
        options: SubscriptionOptions,
    ) -> Result<mpsc::Receiver<BusMessage>, BusError>;
}

/// Document persistence for completed reports.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Writes a document, replacing any previous version.
    async fn put(&self, collection: &str, id: &str, document: &Value) -> Result<(), StoreError>;

    /// Reads a document, `None` when absent.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;
}
