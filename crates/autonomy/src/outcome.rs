//! Approval outcome tracking.
//!
//! Only call ids that received an `ask` verdict are tracked. Actions that
//! were allowed outright never reach the approval history.

use chrono::Utc;
use modegate_core::{ApprovalRecord, SessionAutonomyState};

/// Reconcile a pending call id after the action finished.
///
/// Returns the history entry that was appended, or `None` when the id was
/// not pending (never asked, or already reconciled).
pub fn record_outcome(
    state: &mut SessionAutonomyState,
    call_id: &str,
    did_error: bool,
) -> Option<ApprovalRecord> {
    let pending = state.take_pending(call_id)?;
    let approved = !did_error;

    if approved {
        state.metrics.approvals_granted += 1;
    } else {
        state.metrics.actions_blocked += 1;
    }

    let record = ApprovalRecord {
        timestamp: Utc::now(),
        action_name: pending.action_name,
        approved,
        mode: pending.mode,
    };
    state.push_history(record.clone());
    Some(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use modegate_core::{AutonomyMode, MAX_APPROVAL_HISTORY};

    fn state() -> SessionAutonomyState {
        SessionAutonomyState::new("conv-1".into(), AutonomyMode::Balanced, 3)
    }

    #[test]
    fn granted_outcome_updates_metrics_and_history() {
        let mut s = state();
        s.add_pending("call_1", "write", AutonomyMode::Restrictive);

        let record = record_outcome(&mut s, "call_1", false).unwrap();
        assert!(record.approved);
        assert_eq!(record.action_name, "write");
        assert_eq!(record.mode, AutonomyMode::Restrictive);
        assert_eq!(s.metrics.approvals_granted, 1);
        assert_eq!(s.metrics.actions_blocked, 0);
        assert!(s.pending_approvals.is_empty());
        assert_eq!(s.approval_history.len(), 1);
    }

    #[test]
    fn errored_outcome_counts_as_blocked() {
        let mut s = state();
        s.add_pending("call_1", "bash", AutonomyMode::Balanced);

        let record = record_outcome(&mut s, "call_1", true).unwrap();
        assert!(!record.approved);
        assert_eq!(s.metrics.actions_blocked, 1);
        assert_eq!(s.metrics.approvals_granted, 0);
    }

    #[test]
    fn second_outcome_is_a_noop() {
        let mut s = state();
        s.add_pending("call_1", "write", AutonomyMode::Balanced);

        assert!(record_outcome(&mut s, "call_1", false).is_some());
        let metrics = s.metrics.clone();
        assert!(record_outcome(&mut s, "call_1", false).is_none());
        assert!(record_outcome(&mut s, "call_1", true).is_none());
        assert_eq!(s.metrics, metrics);
        assert_eq!(s.approval_history.len(), 1);
    }

    #[test]
    fn untracked_call_never_enters_history() {
        let mut s = state();
        assert!(record_outcome(&mut s, "allowed_call", false).is_none());
        assert!(s.approval_history.is_empty());
        assert_eq!(s.metrics.approvals_granted, 0);
    }

    #[test]
    fn history_is_capped_and_evicts_oldest() {
        let mut s = state();
        for i in 0..(MAX_APPROVAL_HISTORY + 10) {
            let id = format!("call_{i}");
            s.add_pending(&id, &format!("action_{i}"), AutonomyMode::Balanced);
            record_outcome(&mut s, &id, false);
            assert!(s.approval_history.len() <= MAX_APPROVAL_HISTORY);
        }
        assert_eq!(s.approval_history.len(), MAX_APPROVAL_HISTORY);
        assert_eq!(s.approval_history.front().unwrap().action_name, "action_10");
        assert_eq!(
            s.approval_history.back().unwrap().action_name,
            format!("action_{}", MAX_APPROVAL_HISTORY + 9)
        );
        assert!(s.metrics.approvals_granted <= s.metrics.approvals_requested);
    }
}
