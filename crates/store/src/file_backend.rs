//! File-based session store — one JSON document per conversation.
//!
//! Storage location: `~/.modegate/sessions/<conversation>.json`
//!
//! Records are human-inspectable and written atomically (temp file +
//! rename), so a crash mid-write leaves the previous record intact.

use async_trait::async_trait;
use modegate_core::error::StoreError;
use modegate_core::session::{ConversationId, SessionAutonomyState};
use modegate_core::store::StateStore;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A directory of per-conversation JSON records.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Record path for a conversation.
    ///
    /// Anything outside `[A-Za-z0-9_-]` is replaced so an id can never
    /// escape the store directory.
    pub fn path_for(&self, id: &ConversationId) -> PathBuf {
        let mut name: String = id
            .as_str()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        if name.is_empty() {
            name.push('_');
        }
        self.dir.join(format!("{name}.json"))
    }

    fn io_error(path: &Path, e: std::io::Error) -> StoreError {
        StoreError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        }
    }
}

#[async_trait]
impl StateStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn load(&self, id: &ConversationId) -> Result<Option<SessionAutonomyState>, StoreError> {
        let path = self.path_for(id);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(conversation_id = %id, "No session record yet");
                return Ok(None);
            }
            Err(e) => return Err(Self::io_error(&path, e)),
        };

        let state: SessionAutonomyState =
            serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
                conversation_id: id.to_string(),
                reason: e.to_string(),
            })?;

        debug!(conversation_id = %id, path = %path.display(), "Session record loaded");
        Ok(Some(state))
    }

    async fn save(&self, state: &SessionAutonomyState) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| Self::io_error(&self.dir, e))?;

        let json = serde_json::to_string_pretty(state)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let path = self.path_for(&state.conversation_id);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| Self::io_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| Self::io_error(&path, e))?;

        Ok(())
    }

    async fn remove(&self, id: &ConversationId) -> Result<bool, StoreError> {
        let path = self.path_for(id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Self::io_error(&path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use modegate_core::{ApprovalRecord, AutonomyMode, BackgroundAction};
    use tempfile::TempDir;

    fn populated_state(id: &str) -> SessionAutonomyState {
        let mut state = SessionAutonomyState::new(id.into(), AutonomyMode::Balanced, 3);
        state.session_override = Some(AutonomyMode::Restrictive);
        state.resolve();
        state.add_pending("call_1", "write", AutonomyMode::Restrictive);
        state.add_pending("call_2", "bash", AutonomyMode::Restrictive);
        state
            .background_actions
            .insert("bg_1".into(), BackgroundAction::start("task"));
        let mut done = BackgroundAction::start("task");
        done.finish(true);
        state.background_actions.insert("bg_2".into(), done);
        state.push_history(ApprovalRecord {
            timestamp: Utc::now(),
            action_name: "edit".into(),
            approved: true,
            mode: AutonomyMode::Balanced,
        });
        state.metrics.approvals_granted = 1;
        state
    }

    #[tokio::test]
    async fn save_and_load_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path().to_path_buf());
        let state = populated_state("conv-1");

        store.save(&state).await.unwrap();

        // Reload through a fresh store instance
        let store2 = FileStore::new(tmp.path().to_path_buf());
        let loaded = store2.load(&"conv-1".into()).await.unwrap().unwrap();
        assert_eq!(loaded, state);
    }

    #[tokio::test]
    async fn record_uses_list_encoding() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path().to_path_buf());
        store.save(&populated_state("conv-1")).await.unwrap();

        let raw = std::fs::read_to_string(store.path_for(&"conv-1".into())).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["pending_approvals"].as_array().unwrap().len(), 2);
        assert_eq!(json["background_actions"].as_array().unwrap().len(), 2);
        assert_eq!(json["session_override"], "restrictive");
    }

    #[tokio::test]
    async fn missing_record_is_none() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path().join("not-created-yet"));
        assert!(store.load(&"conv-new".into()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_record_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path().to_path_buf());
        std::fs::write(store.path_for(&"conv-1".into()), "this is not json").unwrap();

        let err = store.load(&"conv-1".into()).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn remove_deletes_record() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::new(tmp.path().to_path_buf());
        store.save(&populated_state("conv-1")).await.unwrap();

        assert!(store.remove(&"conv-1".into()).await.unwrap());
        assert!(!store.remove(&"conv-1".into()).await.unwrap());
        assert!(store.load(&"conv-1".into()).await.unwrap().is_none());
    }

    #[test]
    fn ids_cannot_escape_directory() {
        let store = FileStore::new(PathBuf::from("/data/sessions"));
        let path = store.path_for(&"../../etc/passwd".into());
        assert_eq!(path, PathBuf::from("/data/sessions/______etc_passwd.json"));

        let empty = store.path_for(&"".into());
        assert_eq!(empty, PathBuf::from("/data/sessions/_.json"));
    }
}
