//! The autonomy engine — host-facing callbacks over per-conversation state.
//!
//! Each callback resolves the conversation's state (restoring it from the
//! store on first contact), mutates it synchronously under the session map
//! lock, then persists a snapshot after the lock is released. A failed
//! write is logged and published on the event bus; the in-memory state
//! stays authoritative for the rest of the process lifetime.
//!
//! Hosts must deliver callbacks for one conversation sequentially.
//! Different conversations share no mutable state beyond the map itself.

use chrono::Utc;
use modegate_config::AutonomyConfig;
use modegate_core::{
    AutonomyMode, ConversationId, DomainEvent, Error, EventBus, Result, SessionAutonomyState,
    StateStore, Verdict,
};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::background::{self, BackgroundAdmission};
use crate::decision::{Decision, PermissionPolicy, PermissionRequest};
use crate::outcome::record_outcome;
use crate::registry::{ModeRegistry, ModeSummary};
use crate::resolution::{begin_message, set_session_override, sync_mode};
use crate::status::{AutonomyStatus, ExecutionOutcome, MessageOutcome, ModeInfo};
use crate::task::{TaskClassification, TaskClassifier};

type SessionMap = HashMap<ConversationId, SessionAutonomyState>;

pub struct AutonomyEngine {
    registry: ModeRegistry,
    policy: PermissionPolicy,
    tasks: TaskClassifier,
    store: Arc<dyn StateStore>,
    sessions: RwLock<SessionMap>,
    events: EventBus,
}

impl AutonomyEngine {
    pub fn new(config: &AutonomyConfig, store: Arc<dyn StateStore>) -> Self {
        Self {
            registry: ModeRegistry::new(config),
            policy: PermissionPolicy::new(config),
            tasks: TaskClassifier::new(&config.task_keywords),
            store,
            sessions: RwLock::new(HashMap::new()),
            events: EventBus::default(),
        }
    }

    pub fn registry(&self) -> &ModeRegistry {
        &self.registry
    }

    pub fn policy(&self) -> &PermissionPolicy {
        &self.policy
    }

    pub fn store_name(&self) -> &str {
        self.store.name()
    }

    /// Receive approval, mode and capacity signals.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.events.subscribe()
    }

    // ── Conversation lifecycle ────────────────────────────────────────

    /// Initialize or restore the conversation's state.
    pub async fn start_conversation(&self, id: &ConversationId) -> Result<ModeInfo> {
        require_id(id)?;
        self.ensure_session(id).await;
        Ok(self.read_state(id, |state| self.mode_info(state)))
    }

    /// Drop the in-memory state. The durable record is left untouched.
    pub fn end_conversation(&self, id: &ConversationId) -> bool {
        let removed = self.write_sessions().remove(id).is_some();
        if removed {
            debug!(conversation_id = %id, "Conversation state released");
        }
        removed
    }

    /// Conversations currently held in memory, sorted.
    pub fn active_sessions(&self) -> Vec<ConversationId> {
        let mut ids: Vec<ConversationId> = self.read_sessions().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Snapshot of a conversation's in-memory state, if loaded.
    pub fn session(&self, id: &ConversationId) -> Option<SessionAutonomyState> {
        self.read_sessions().get(id).cloned()
    }

    // ── Host callbacks ────────────────────────────────────────────────

    /// Message-preprocess callback: detect and strip a trigger keyword,
    /// resolve the effective mode for this message.
    pub async fn preprocess_message(&self, id: &ConversationId, text: &str) -> Result<MessageOutcome> {
        require_id(id)?;
        self.ensure_session(id).await;

        let (resolution, snapshot) = self.mutate(id, |state| {
            state.touch();
            begin_message(state, &self.registry, text)
        });
        self.persist(snapshot).await;

        if let Some(mode) = resolution.message_override {
            info!(conversation_id = %id, mode = %mode, "Message override applied");
        }

        let task = self.tasks.classify(&resolution.text);
        Ok(MessageOutcome { resolution, task })
    }

    /// Permission-check callback. Always produces a verdict; a malformed
    /// request gets a fail-safe `ask`.
    pub async fn check_permission(&self, request: &PermissionRequest) -> Decision {
        if let Err(e) = request.validate() {
            warn!(
                conversation_id = %request.conversation_id,
                action = %request.action_name,
                error = %e,
                "Invalid permission request, asking"
            );
            let mode = self
                .session(&request.conversation_id)
                .map_or(self.registry.default_mode(), |s| s.current_mode);
            return Decision::fail_safe(mode, self.policy.classifier().classify(&request.action_name));
        }

        let id = &request.conversation_id;
        self.ensure_session(id).await;

        let ((decision, newly_pending), snapshot) = self.mutate(id, |state| {
            sync_mode(state, &self.registry);
            state.touch();
            let mode = state.current_mode;
            let decision = self.policy.evaluate(mode, self.registry.profile(mode), request);
            let newly_pending = decision.verdict == Verdict::Ask
                && state.add_pending(&request.call_id, &request.action_name, mode);
            (decision, newly_pending)
        });
        self.persist(snapshot).await;

        match decision.verdict {
            Verdict::Allow => debug!(
                conversation_id = %id,
                call_id = %request.call_id,
                action = %request.action_name,
                mode = %decision.mode,
                verdict = "allow",
                "Permission granted"
            ),
            Verdict::Ask => info!(
                conversation_id = %id,
                call_id = %request.call_id,
                action = %request.action_name,
                mode = %decision.mode,
                verdict = "ask",
                reason = decision.reason.description(),
                "Approval required"
            ),
        }

        if newly_pending {
            self.events.publish(DomainEvent::ApprovalRequested {
                conversation_id: id.to_string(),
                call_id: request.call_id.clone(),
                action_name: request.action_name.clone(),
                risk: decision.risk,
                mode: decision.mode,
                timestamp: Utc::now(),
            });
        }

        decision
    }

    /// Pre-execute callback. Only background actions are tracked; `None`
    /// for foreground actions.
    pub async fn before_execute(
        &self,
        id: &ConversationId,
        action_name: &str,
        call_id: &str,
        is_background: bool,
    ) -> Result<Option<BackgroundAdmission>> {
        if !is_background {
            return Ok(None);
        }
        require_id(id)?;
        if call_id.trim().is_empty() {
            return Err(Error::MissingField("call_id"));
        }
        self.ensure_session(id).await;

        let (admission, snapshot) = self.mutate(id, |state| {
            sync_mode(state, &self.registry);
            state.touch();
            let profile = self.registry.profile(state.current_mode);
            background::admit(state, profile, action_name, call_id)
        });
        self.persist(snapshot).await;

        if admission.over_capacity {
            warn!(
                conversation_id = %id,
                call_id,
                action = action_name,
                running = admission.running,
                limit = admission.limit,
                "Background capacity exceeded"
            );
            self.events.publish(DomainEvent::BackgroundCapacityExceeded {
                conversation_id: id.to_string(),
                call_id: call_id.to_string(),
                action_name: action_name.to_string(),
                running: admission.running,
                limit: admission.limit,
                timestamp: Utc::now(),
            });
        }

        Ok(Some(admission))
    }

    /// Post-execute callback: reconcile a pending approval and finish a
    /// background action. Unknown call ids are a no-op.
    pub async fn after_execute(
        &self,
        id: &ConversationId,
        action_name: &str,
        call_id: &str,
        did_error: bool,
    ) -> Result<ExecutionOutcome> {
        require_id(id)?;
        self.ensure_session(id).await;

        let (outcome, snapshot) = self.mutate(id, |state| {
            let outcome = ExecutionOutcome {
                approval: record_outcome(state, call_id, did_error),
                background: background::complete(state, call_id, did_error),
            };
            if !outcome.is_noop() {
                state.touch();
            }
            outcome
        });
        if outcome.is_noop() {
            debug!(conversation_id = %id, call_id, action = action_name, "No tracked state for call");
            return Ok(outcome);
        }
        self.persist(snapshot).await;

        if let Some(record) = &outcome.approval {
            info!(
                conversation_id = %id,
                call_id,
                action = %record.action_name,
                approved = record.approved,
                "Approval resolved"
            );
            self.events.publish(DomainEvent::ApprovalResolved {
                conversation_id: id.to_string(),
                call_id: call_id.to_string(),
                action_name: record.action_name.clone(),
                approved: record.approved,
                timestamp: record.timestamp,
            });
        }

        Ok(outcome)
    }

    // ── Mode commands ─────────────────────────────────────────────────

    /// Set the session override. Fails on an unknown mode name, leaving
    /// state untouched.
    pub async fn set_mode(&self, id: &ConversationId, target: &str) -> Result<ModeSummary> {
        require_id(id)?;
        let mode: AutonomyMode = target.parse()?;
        self.ensure_session(id).await;

        let (previous, snapshot) = self.mutate(id, |state| {
            let previous = set_session_override(state, &self.registry, Some(mode));
            state.metrics.mode_changes += 1;
            state.touch();
            previous
        });
        self.persist(snapshot).await;

        info!(conversation_id = %id, from = %previous, to = %mode, "Session mode set");
        self.publish_mode_change(id, previous, mode);

        Ok(ModeSummary::new(mode, self.registry.profile(mode), Some(previous)))
    }

    /// Remove the session override and fall back to the default mode.
    pub async fn clear_mode(&self, id: &ConversationId) -> Result<ModeInfo> {
        require_id(id)?;
        self.ensure_session(id).await;

        let ((previous, info), snapshot) = self.mutate(id, |state| {
            let previous = set_session_override(state, &self.registry, None);
            if previous != state.current_mode {
                state.metrics.mode_changes += 1;
            }
            state.touch();
            (previous, self.mode_info(state))
        });
        self.persist(snapshot).await;

        info!(conversation_id = %id, mode = %info.mode, "Session mode cleared");
        self.publish_mode_change(id, previous, info.mode);
        Ok(info)
    }

    pub async fn get_mode(&self, id: &ConversationId) -> Result<ModeInfo> {
        require_id(id)?;
        self.ensure_session(id).await;
        Ok(self.read_state(id, |state| self.mode_info(state)))
    }

    pub async fn status(&self, id: &ConversationId) -> Result<AutonomyStatus> {
        require_id(id)?;
        self.ensure_session(id).await;
        Ok(self.read_state(id, |state| {
            AutonomyStatus::from_state(state, &self.registry.profile(state.current_mode).label)
        }))
    }

    /// All modes with their settings.
    pub fn modes(&self) -> Vec<ModeSummary> {
        self.registry.summaries()
    }

    /// Advisory classification of free text. Never affects verdicts.
    pub fn classify_task(&self, text: &str) -> TaskClassification {
        self.tasks.classify(text)
    }

    // ── Internals ─────────────────────────────────────────────────────

    fn read_sessions(&self) -> RwLockReadGuard<'_, SessionMap> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_sessions(&self) -> RwLockWriteGuard<'_, SessionMap> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn fresh_state(&self, id: &ConversationId) -> SessionAutonomyState {
        let mode = self.registry.default_mode();
        SessionAutonomyState::new(id.clone(), mode, self.registry.profile(mode).background_limit())
    }

    fn mode_info(&self, state: &SessionAutonomyState) -> ModeInfo {
        ModeInfo::from_state(state, &self.registry.profile(state.current_mode).label)
    }

    /// Make sure the conversation is in memory, restoring it from the store
    /// when possible. Store failures fall back to a fresh state.
    async fn ensure_session(&self, id: &ConversationId) {
        if self.read_sessions().contains_key(id) {
            return;
        }

        let state = match self.store.load(id).await {
            Ok(Some(mut state)) => {
                // Configuration owns the default; the record owns the overrides.
                state.default_mode = self.registry.default_mode();
                sync_mode(&mut state, &self.registry);
                debug!(conversation_id = %id, mode = %state.current_mode, "Session restored");
                state
            }
            Ok(None) => {
                debug!(conversation_id = %id, "New session");
                self.fresh_state(id)
            }
            Err(e) => {
                warn!(conversation_id = %id, error = %e, "Failed to restore session, using defaults");
                self.fresh_state(id)
            }
        };

        // A concurrent restore may have won the race; keep its state.
        self.write_sessions().entry(id.clone()).or_insert(state);
    }

    /// Apply `f` to the conversation's state and return its result together
    /// with a snapshot to persist.
    fn mutate<T>(
        &self,
        id: &ConversationId,
        f: impl FnOnce(&mut SessionAutonomyState) -> T,
    ) -> (T, SessionAutonomyState) {
        let mut sessions = self.write_sessions();
        let state = sessions
            .entry(id.clone())
            .or_insert_with(|| self.fresh_state(id));
        let out = f(state);
        (out, state.clone())
    }

    fn read_state<T>(&self, id: &ConversationId, f: impl FnOnce(&SessionAutonomyState) -> T) -> T {
        if let Some(state) = self.read_sessions().get(id) {
            return f(state);
        }
        // Released between restore and read; report what a fresh session would.
        f(&self.fresh_state(id))
    }

    async fn persist(&self, snapshot: SessionAutonomyState) {
        if let Err(e) = self.store.save(&snapshot).await {
            warn!(
                conversation_id = %snapshot.conversation_id,
                store = self.store.name(),
                error = %e,
                "Failed to persist session state"
            );
            self.events.publish(DomainEvent::PersistenceFailed {
                conversation_id: snapshot.conversation_id.to_string(),
                error_message: e.to_string(),
                timestamp: Utc::now(),
            });
        }
    }

    fn publish_mode_change(&self, id: &ConversationId, from: AutonomyMode, to: AutonomyMode) {
        if from != to {
            self.events.publish(DomainEvent::ModeChanged {
                conversation_id: id.to_string(),
                from,
                to,
                timestamp: Utc::now(),
            });
        }
    }
}

impl std::fmt::Debug for AutonomyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutonomyEngine")
            .field("default_mode", &self.registry.default_mode())
            .field("store", &self.store.name())
            .field("sessions", &self.read_sessions().len())
            .finish()
    }
}

fn require_id(id: &ConversationId) -> Result<()> {
    if id.as_str().trim().is_empty() {
        return Err(Error::MissingField("conversation_id"));
    }
    Ok(())
}
