//! In-memory store — useful for testing and ephemeral hosts.

use async_trait::async_trait;
use modegate_core::error::StoreError;
use modegate_core::session::{ConversationId, SessionAutonomyState};
use modegate_core::store::StateStore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Keeps records in a map for the life of the process.
///
/// Cloning shares the underlying map, so a test can hand one clone to an
/// engine and inspect or reuse another.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    records: Arc<RwLock<HashMap<ConversationId, SessionAutonomyState>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl StateStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn load(&self, id: &ConversationId) -> Result<Option<SessionAutonomyState>, StoreError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn save(&self, state: &SessionAutonomyState) -> Result<(), StoreError> {
        self.records
            .write()
            .await
            .insert(state.conversation_id.clone(), state.clone());
        Ok(())
    }

    async fn remove(&self, id: &ConversationId) -> Result<bool, StoreError> {
        Ok(self.records.write().await.remove(id).is_some())
    }
}
