//! Read-only views returned by the engine's query and callback operations.

use chrono::{DateTime, Utc};
use modegate_core::{
    ApprovalMetrics, ApprovalRecord, AutonomyMode, BackgroundStatus, ConversationId, ModeSource,
    SessionAutonomyState,
};
use serde::Serialize;

use crate::resolution::MessageResolution;
use crate::task::TaskClassification;

/// Current mode of a conversation and where it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModeInfo {
    pub conversation_id: ConversationId,
    pub mode: AutonomyMode,
    pub label: String,
    pub source: ModeSource,
    pub default_mode: AutonomyMode,
    pub session_override: Option<AutonomyMode>,
    pub message_override: Option<AutonomyMode>,
    pub background_limit: u32,
}

impl ModeInfo {
    pub(crate) fn from_state(state: &SessionAutonomyState, label: &str) -> Self {
        Self {
            conversation_id: state.conversation_id.clone(),
            mode: state.current_mode,
            label: label.to_string(),
            source: state.mode_source(),
            default_mode: state.default_mode,
            session_override: state.session_override,
            message_override: state.message_override,
            background_limit: state.background_limit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingSummary {
    pub call_id: String,
    pub action_name: String,
    pub mode: AutonomyMode,
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackgroundSummary {
    pub call_id: String,
    pub action_name: String,
    pub status: BackgroundStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// Full snapshot of a conversation's autonomy state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AutonomyStatus {
    pub mode: ModeInfo,
    pub metrics: ApprovalMetrics,
    /// Oldest request first.
    pub pending: Vec<PendingSummary>,
    /// Oldest entry first.
    pub history: Vec<ApprovalRecord>,
    /// Oldest start first.
    pub background: Vec<BackgroundSummary>,
    pub running_background: usize,
    pub created: DateTime<Utc>,
    pub last_mode_change: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl AutonomyStatus {
    pub(crate) fn from_state(state: &SessionAutonomyState, label: &str) -> Self {
        let mut pending: Vec<PendingSummary> = state
            .pending_approvals
            .iter()
            .map(|(id, p)| PendingSummary {
                call_id: id.clone(),
                action_name: p.action_name.clone(),
                mode: p.mode,
                requested_at: p.requested_at,
            })
            .collect();
        pending.sort_by(|a, b| a.requested_at.cmp(&b.requested_at).then_with(|| a.call_id.cmp(&b.call_id)));

        let mut background: Vec<BackgroundSummary> = state
            .background_actions
            .iter()
            .map(|(id, a)| BackgroundSummary {
                call_id: id.clone(),
                action_name: a.action_name.clone(),
                status: a.status,
                started_at: a.started_at,
                ended_at: a.ended_at,
            })
            .collect();
        background.sort_by(|a, b| a.started_at.cmp(&b.started_at).then_with(|| a.call_id.cmp(&b.call_id)));

        Self {
            mode: ModeInfo::from_state(state, label),
            metrics: state.metrics,
            pending,
            history: state.approval_history.iter().cloned().collect(),
            background,
            running_background: state.running_background(),
            created: state.created,
            last_mode_change: state.last_mode_change,
            last_activity: state.last_activity,
        }
    }
}

/// Result of the message-preprocess callback.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageOutcome {
    #[serde(flatten)]
    pub resolution: MessageResolution,
    /// Advisory only.
    pub task: TaskClassification,
}

/// Result of the post-execute callback.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExecutionOutcome {
    /// History entry appended, if the call id was pending approval.
    pub approval: Option<ApprovalRecord>,
    /// Final status, if the call id was a running background action.
    pub background: Option<BackgroundStatus>,
}

impl ExecutionOutcome {
    pub fn is_noop(&self) -> bool {
        self.approval.is_none() && self.background.is_none()
    }
}
