//! StateStore trait — durable storage for session autonomy state.
//!
//! Keyed by conversation id. A missing record is the normal state of a
//! brand-new conversation and is reported as `Ok(None)`, never an error.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::session::{ConversationId, SessionAutonomyState};

/// The core StateStore trait.
///
/// Implementations: file (JSON per conversation), in-memory, none (no-op).
#[async_trait]
pub trait StateStore: Send + Sync {
    /// The backend name (e.g., "file", "in_memory", "none").
    fn name(&self) -> &str;

    /// Load the record for a conversation, if one exists.
    async fn load(&self, id: &ConversationId) -> Result<Option<SessionAutonomyState>, StoreError>;

    /// Write the full record, replacing any previous one.
    async fn save(&self, state: &SessionAutonomyState) -> Result<(), StoreError>;

    /// Delete a record. Returns `true` if one existed.
    async fn remove(&self, id: &ConversationId) -> Result<bool, StoreError>;
}
