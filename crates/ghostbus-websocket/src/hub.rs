//! Subscriber hub
//!
//! Maintains the open set of live subscribers and fans each enriched
//! record out to all of them. Delivery is at-most-once and best-effort:
//! every subscriber gets a bounded buffer, and a subscriber whose buffer
//! is saturated (or whose connection is gone) is unregistered rather than
//! allowed to stall the producer.

use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use ghostbus_core::EnrichedRecord;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Default per-subscriber buffer capacity (records)
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 64;

/// Fan-out hub over bounded per-subscriber channels
pub struct BroadcastHub {
    clients: DashMap<Uuid, ClientState>,
    buffer_capacity: usize,
    messages_out: AtomicUsize,
    clients_dropped: AtomicUsize,
}

struct ClientState {
    tx: mpsc::Sender<String>,
    connected_at: chrono::DateTime<chrono::Utc>,
}

impl BroadcastHub {
    pub fn new(buffer_capacity: usize) -> Self {
        Self {
            clients: DashMap::new(),
            buffer_capacity,
            messages_out: AtomicUsize::new(0),
            clients_dropped: AtomicUsize::new(0),
        }
    }

    /// Register a new subscriber; returns its id and the receiving end of
    /// its bounded buffer. The receiver closing (drop or explicit) is
    /// detected on the next publish and cleans the entry up.
    pub fn subscribe(&self) -> (Uuid, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(self.buffer_capacity);
        let client_id = Uuid::new_v4();
        self.clients.insert(
            client_id,
            ClientState {
                tx,
                connected_at: chrono::Utc::now(),
            },
        );
        info!("Subscriber {} registered ({} total)", client_id, self.clients.len());
        (client_id, rx)
    }

    /// Unregister a subscriber
    pub fn unsubscribe(&self, client_id: Uuid) {
        if self.clients.remove(&client_id).is_some() {
            info!(
                "Subscriber {} unregistered ({} remaining)",
                client_id,
                self.clients.len()
            );
        }
    }

    /// Deliver a record to every currently-registered subscriber.
    ///
    /// Never blocks: a full buffer or a closed receiver unregisters that
    /// one subscriber and delivery to the others proceeds. Returns the
    /// number of subscribers the record was handed to.
    pub fn publish(&self, record: &EnrichedRecord) -> usize {
        let payload = match serde_json::to_string(record) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize record: {}", e);
                return 0;
            }
        };

        let mut delivered = 0;
        let mut dead = Vec::new();

        for entry in self.clients.iter() {
            match entry.tx.try_send(payload.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!("Subscriber {} cannot keep up, disconnecting", entry.key());
                    dead.push(*entry.key());
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!("Subscriber {} closed, disconnecting", entry.key());
                    dead.push(*entry.key());
                }
            }
        }

        for client_id in dead {
            self.clients.remove(&client_id);
            self.clients_dropped.fetch_add(1, Ordering::Relaxed);
        }

        self.messages_out.fetch_add(delivered, Ordering::Relaxed);
        delivered
    }

    /// Number of connected subscribers
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Check if a specific subscriber is still registered
    pub fn is_subscribed(&self, client_id: Uuid) -> bool {
        self.clients.contains_key(&client_id)
    }

    /// Total messages handed to subscriber buffers
    pub fn messages_out(&self) -> usize {
        self.messages_out.load(Ordering::Relaxed)
    }

    /// Subscribers dropped for falling behind or disconnecting
    pub fn clients_dropped(&self) -> usize {
        self.clients_dropped.load(Ordering::Relaxed)
    }

    /// Connection time of one subscriber, if still registered
    pub fn connected_at(&self, client_id: Uuid) -> Option<chrono::DateTime<chrono::Utc>> {
        self.clients.get(&client_id).map(|c| c.connected_at)
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new(DEFAULT_SUBSCRIBER_BUFFER)
    }
}

// ============================================================================
// TESTS
// ============================================================================
