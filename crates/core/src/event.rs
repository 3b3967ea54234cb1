//! Domain event system — signals the engine emits for the host.
//!
//! The engine never talks to a human or a notification channel itself.
//! It publishes events here; the host subscribes and routes approval
//! requests and capacity warnings wherever they need to go.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::mode::{AutonomyMode, RiskTier};

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    /// An action is waiting for a human decision
    ApprovalRequested {
        conversation_id: String,
        call_id: String,
        action_name: String,
        risk: RiskTier,
        mode: AutonomyMode,
        timestamp: DateTime<Utc>,
    },

    /// A previously pending action finished
    ApprovalResolved {
        conversation_id: String,
        call_id: String,
        action_name: String,
        approved: bool,
        timestamp: DateTime<Utc>,
    },

    /// The session override changed the effective mode
    ModeChanged {
        conversation_id: String,
        from: AutonomyMode,
        to: AutonomyMode,
        timestamp: DateTime<Utc>,
    },

    /// A background action started while the cap was already reached
    BackgroundCapacityExceeded {
        conversation_id: String,
        call_id: String,
        action_name: String,
        running: usize,
        limit: u32,
        timestamp: DateTime<Utc>,
    },

    /// A durable write failed; in-memory state is still authoritative
    PersistenceFailed {
        conversation_id: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.sender.receiver_count())
            .finish()
    }
}
