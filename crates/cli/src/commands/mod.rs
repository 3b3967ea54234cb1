//! CLI command implementations.

pub mod check;
pub mod config_cmd;
pub mod execute;
pub mod message;
pub mod mode;
pub mod modes;
pub mod status;

use modegate_autonomy::AutonomyEngine;
use modegate_config::AppConfig;
use modegate_core::{ConversationId, StateStore};
use modegate_store::{FileStore, InMemoryStore, NoopStore};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Shared state for one CLI invocation.
pub struct Context {
    pub config: AppConfig,
    pub config_path: PathBuf,
    pub conversation: ConversationId,
    pub json: bool,
}

impl Context {
    pub fn new(config_path: Option<PathBuf>, conversation: String, json: bool) -> Self {
        let config_path = config_path.unwrap_or_else(AppConfig::config_path);
        Self {
            config: AppConfig::load_at(&config_path),
            config_path,
            conversation: conversation.into(),
            json,
        }
    }

    pub fn engine(&self) -> AutonomyEngine {
        let store = build_store(&self.config);
        debug!(
            conversation_id = %self.conversation,
            store = store.name(),
            config = %self.config_path.display(),
            "Starting autonomy engine"
        );
        AutonomyEngine::new(&self.config.autonomy, store)
    }

    /// Print `value` as pretty JSON when `--json` was given; otherwise run
    /// the human-readable printer.
    pub fn emit<T: Serialize>(&self, value: &T, human: impl FnOnce(&T)) -> Result<(), Box<dyn std::error::Error>> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            human(value);
        }
        Ok(())
    }
}

/// Session store selected by `storage.backend`.
pub fn build_store(config: &AppConfig) -> Arc<dyn StateStore> {
    match config.storage.backend.as_str() {
        "memory" => Arc::new(InMemoryStore::new()),
        "none" => Arc::new(NoopStore),
        _ => Arc::new(FileStore::new(config.storage.sessions_dir())),
    }
}
