//! No-op store — disables durability entirely.

use async_trait::async_trait;
use modegate_core::error::StoreError;
use modegate_core::session::{ConversationId, SessionAutonomyState};
use modegate_core::store::StateStore;

/// A store that keeps nothing. Every conversation starts fresh.
pub struct NoopStore;

#[async_trait]
impl StateStore for NoopStore {
    fn name(&self) -> &str { "none" }

    async fn load(&self, _id: &ConversationId) -> Result<Option<SessionAutonomyState>, StoreError> {
        Ok(None)
    }

    async fn save(&self, _state: &SessionAutonomyState) -> Result<(), StoreError> {
        Ok(())
    }

    async fn remove(&self, _id: &ConversationId) -> Result<bool, StoreError> {
        Ok(false)
    }
}
