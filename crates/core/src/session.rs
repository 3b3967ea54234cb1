//! Per-conversation autonomy state.
//!
//! One [`SessionAutonomyState`] exists per conversation. It is created
//! lazily on first contact, mutated by every host callback, and written
//! to durable storage after each mutation that must survive a restart.
//!
//! The durable encoding flattens the associative members into ordered
//! pair-lists (see [`SessionRecord`]); the in-memory form keeps maps so
//! lookups by call id stay cheap.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use uuid::Uuid;

use crate::mode::{AutonomyMode, ModeSource};

/// Maximum number of approval outcomes retained per conversation.
pub const MAX_APPROVAL_HISTORY: usize = 50;

/// Maximum number of finished background actions retained per
/// conversation. Running actions are never evicted.
pub const MAX_FINISHED_BACKGROUND: usize = 50;

/// Identifier of a conversation, supplied by the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for ConversationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ConversationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An action held for a human decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingApproval {
    pub action_name: String,
    /// Effective mode when the engine answered `ask`.
    pub mode: AutonomyMode,
    pub requested_at: DateTime<Utc>,
}

/// Lifecycle of a background action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundStatus {
    Running,
    Completed,
    Error,
}

/// A non-blocking action tracked for the concurrency cap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundAction {
    pub action_name: String,
    pub status: BackgroundStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

impl BackgroundAction {
    pub fn start(action_name: impl Into<String>) -> Self {
        Self {
            action_name: action_name.into(),
            status: BackgroundStatus::Running,
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Move out of `Running`. Returns `false` if already finished;
    /// a finished action never changes status again.
    pub fn finish(&mut self, errored: bool) -> bool {
        if self.status != BackgroundStatus::Running {
            return false;
        }
        self.status = if errored {
            BackgroundStatus::Error
        } else {
            BackgroundStatus::Completed
        };
        self.ended_at = Some(Utc::now());
        true
    }
}

/// One resolved approval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    pub timestamp: DateTime<Utc>,
    pub action_name: String,
    pub approved: bool,
    /// Mode in effect when the approval was requested.
    pub mode: AutonomyMode,
}

/// Cumulative counters. Never decrease for the life of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalMetrics {
    pub approvals_requested: u64,
    pub approvals_granted: u64,
    pub actions_blocked: u64,
    pub mode_changes: u64,
}

/// Mutable autonomy record for one conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SessionRecord", into = "SessionRecord")]
pub struct SessionAutonomyState {
    pub conversation_id: ConversationId,
    /// Effective mode for the message being processed.
    pub current_mode: AutonomyMode,
    pub default_mode: AutonomyMode,
    /// Set by an explicit command; survives across messages.
    pub session_override: Option<AutonomyMode>,
    /// Set by a keyword in the current message only.
    pub message_override: Option<AutonomyMode>,
    /// Background concurrency cap of the current mode.
    pub background_limit: u32,
    pub pending_approvals: HashMap<String, PendingApproval>,
    pub background_actions: HashMap<String, BackgroundAction>,
    pub approval_history: VecDeque<ApprovalRecord>,
    pub metrics: ApprovalMetrics,
    pub created: DateTime<Utc>,
    pub last_mode_change: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl SessionAutonomyState {
    /// Fresh state for a conversation that has no durable record.
    pub fn new(conversation_id: ConversationId, default_mode: AutonomyMode, background_limit: u32) -> Self {
        let now = Utc::now();
        Self {
            conversation_id,
            current_mode: default_mode,
            default_mode,
            session_override: None,
            message_override: None,
            background_limit,
            pending_approvals: HashMap::new(),
            background_actions: HashMap::new(),
            approval_history: VecDeque::new(),
            metrics: ApprovalMetrics::default(),
            created: now,
            last_mode_change: now,
            last_activity: now,
        }
    }

    /// `message_override ?? session_override ?? default_mode`.
    pub fn effective_mode(&self) -> AutonomyMode {
        self.message_override
            .or(self.session_override)
            .unwrap_or(self.default_mode)
    }

    /// Which tier [`Self::effective_mode`] came from.
    pub fn mode_source(&self) -> ModeSource {
        if self.message_override.is_some() {
            ModeSource::Message
        } else if self.session_override.is_some() {
            ModeSource::Session
        } else {
            ModeSource::Default
        }
    }

    /// Bring `current_mode` in line with the override tiers.
    /// Returns `true` if the effective mode changed.
    pub fn resolve(&mut self) -> bool {
        let effective = self.effective_mode();
        if effective == self.current_mode {
            return false;
        }
        self.current_mode = effective;
        self.last_mode_change = Utc::now();
        true
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    /// Register a call id awaiting approval.
    ///
    /// Re-asking for an id that is already pending does not count twice.
    pub fn add_pending(&mut self, call_id: &str, action_name: &str, mode: AutonomyMode) -> bool {
        if self.pending_approvals.contains_key(call_id) {
            return false;
        }
        self.pending_approvals.insert(
            call_id.to_string(),
            PendingApproval {
                action_name: action_name.to_string(),
                mode,
                requested_at: Utc::now(),
            },
        );
        self.metrics.approvals_requested += 1;
        true
    }

    /// Remove a pending call id. `None` if it was never pending or was
    /// already reconciled.
    pub fn take_pending(&mut self, call_id: &str) -> Option<PendingApproval> {
        self.pending_approvals.remove(call_id)
    }

    /// Append to the approval log, evicting the oldest entries past the cap.
    pub fn push_history(&mut self, record: ApprovalRecord) {
        self.approval_history.push_back(record);
        while self.approval_history.len() > MAX_APPROVAL_HISTORY {
            self.approval_history.pop_front();
        }
    }

    /// Drop the oldest finished background actions past
    /// [`MAX_FINISHED_BACKGROUND`]. Returns how many were removed.
    pub fn prune_finished_background(&mut self) -> usize {
        let mut finished: Vec<(DateTime<Utc>, String)> = self
            .background_actions
            .iter()
            .filter(|(_, a)| a.status != BackgroundStatus::Running)
            .map(|(id, a)| (a.ended_at.unwrap_or(a.started_at), id.clone()))
            .collect();
        if finished.len() <= MAX_FINISHED_BACKGROUND {
            return 0;
        }
        finished.sort();
        let excess = finished.len() - MAX_FINISHED_BACKGROUND;
        for (_, id) in finished.into_iter().take(excess) {
            self.background_actions.remove(&id);
        }
        excess
    }

    /// Background actions still in `Running`.
    pub fn running_background(&self) -> usize {
        self.background_actions
            .values()
            .filter(|a| a.status == BackgroundStatus::Running)
            .count()
    }
}

/// Durable encoding of [`SessionAutonomyState`].
///
/// Maps become pair-lists ordered by time so the document diffs cleanly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub conversation_id: ConversationId,
    pub current_mode: AutonomyMode,
    pub default_mode: AutonomyMode,
    #[serde(default)]
    pub session_override: Option<AutonomyMode>,
    #[serde(default)]
    pub message_override: Option<AutonomyMode>,
    #[serde(default)]
    pub background_limit: u32,
    #[serde(default)]
    pub pending_approvals: Vec<(String, PendingApproval)>,
    #[serde(default)]
    pub background_actions: Vec<(String, BackgroundAction)>,
    #[serde(default)]
    pub approval_history: Vec<ApprovalRecord>,
    #[serde(default)]
    pub metrics: ApprovalMetrics,
    pub created: DateTime<Utc>,
    pub last_mode_change: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl From<SessionAutonomyState> for SessionRecord {
    fn from(state: SessionAutonomyState) -> Self {
        let mut pending: Vec<_> = state.pending_approvals.into_iter().collect();
        pending.sort_by(|a, b| a.1.requested_at.cmp(&b.1.requested_at).then_with(|| a.0.cmp(&b.0)));

        let mut background: Vec<_> = state.background_actions.into_iter().collect();
        background.sort_by(|a, b| a.1.started_at.cmp(&b.1.started_at).then_with(|| a.0.cmp(&b.0)));

        Self {
            conversation_id: state.conversation_id,
            current_mode: state.current_mode,
            default_mode: state.default_mode,
            session_override: state.session_override,
            message_override: state.message_override,
            background_limit: state.background_limit,
            pending_approvals: pending,
            background_actions: background,
            approval_history: state.approval_history.into_iter().collect(),
            metrics: state.metrics,
            created: state.created,
            last_mode_change: state.last_mode_change,
            last_activity: state.last_activity,
        }
    }
}

impl From<SessionRecord> for SessionAutonomyState {
    fn from(record: SessionRecord) -> Self {
        let mut history: VecDeque<ApprovalRecord> = record.approval_history.into();
        while history.len() > MAX_APPROVAL_HISTORY {
            history.pop_front();
        }

        let mut state = Self {
            conversation_id: record.conversation_id,
            current_mode: record.current_mode,
            default_mode: record.default_mode,
            session_override: record.session_override,
            message_override: record.message_override,
            background_limit: record.background_limit,
            pending_approvals: record.pending_approvals.into_iter().collect(),
            background_actions: record.background_actions.into_iter().collect(),
            approval_history: history,
            metrics: record.metrics,
            created: record.created,
            last_mode_change: record.last_mode_change,
            last_activity: record.last_activity,
        };
        state.prune_finished_background();
        state
    }
}
