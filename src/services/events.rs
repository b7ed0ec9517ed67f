//! Event system for relation changes
//!
//! Events are emitted only after the owner was persisted, so listeners never
//! observe a mutation that did not commit.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, trace};
use uuid::Uuid;

use crate::model::ResourceKind;

/// Relation events emitted by linkers
#[derive(Debug, Clone, PartialEq)]
pub enum RelationEvent {
    MembersAdded {
        owner_kind: ResourceKind,
        owner_id: Uuid,
        relation: &'static str,
        added: usize,
        total: usize,
    },
    MembersReplaced {
        owner_kind: ResourceKind,
        owner_id: Uuid,
        relation: &'static str,
        total: usize,
    },
    MembersRemoved {
        owner_kind: ResourceKind,
        owner_id: Uuid,
        relation: &'static str,
        removed: usize,
        total: usize,
    },
}

/// Trait for event listeners
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &RelationEvent);
}

/// Event bus for broadcasting relation events
pub struct EventBus {
    sender: broadcast::Sender<RelationEvent>,
}

impl EventBus {
    /// Create a new event bus with default capacity
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event to all subscribers
    pub fn emit(&self, event: RelationEvent) {
        trace!(event = ?event, "Emitting relation event");
        // No subscribers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RelationEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Logging event listener for audit trails
pub struct LoggingEventListener;

impl EventListener for LoggingEventListener {
    fn on_event(&self, event: &RelationEvent) {
        match event {
            RelationEvent::MembersAdded { owner_kind, owner_id, relation, added, total } => {
                info!(owner = %owner_id, kind = %owner_kind, relation, added, total, "Relation members added");
            }
            RelationEvent::MembersReplaced { owner_kind, owner_id, relation, total } => {
                info!(owner = %owner_id, kind = %owner_kind, relation, total, "Relation members replaced");
            }
            RelationEvent::MembersRemoved { owner_kind, owner_id, relation, removed, total } => {
                info!(owner = %owner_id, kind = %owner_kind, relation, removed, total, "Relation members removed");
            }
        }
    }
}

/// Spawn a background task that logs all events
pub fn spawn_logging_listener(event_bus: Arc<EventBus>) -> tokio::task::JoinHandle<()> {
    let mut receiver = event_bus.subscribe();
    let listener = LoggingEventListener;

    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(event) => listener.on_event(&event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    debug!(skipped = n, "Event listener lagged, skipped events");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed, stopping listener");
                    break;
                }
            }
        }
    })
}
