//! Background concurrency limiter.
//!
//! The cap is advisory: going over it is reported, never refused.

use modegate_config::ModeProfile;
use modegate_core::{BackgroundAction, BackgroundStatus, SessionAutonomyState};
use serde::Serialize;

/// Capacity snapshot taken when a background action was admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BackgroundAdmission {
    /// Actions running before this one was added.
    pub running: usize,
    pub limit: u32,
    pub over_capacity: bool,
    pub background_enabled: bool,
}

/// Register a running background action for `call_id`.
///
/// The entry is inserted even when the session is over capacity. A call id
/// that is already tracked keeps its entry, so a finished action never
/// goes back to `Running`.
pub fn admit(
    state: &mut SessionAutonomyState,
    profile: &ModeProfile,
    action_name: &str,
    call_id: &str,
) -> BackgroundAdmission {
    let running = state.running_background();
    let limit = state.background_limit;
    let admission = BackgroundAdmission {
        running,
        limit,
        over_capacity: running >= limit as usize,
        background_enabled: profile.allows_background(),
    };

    state
        .background_actions
        .entry(call_id.to_string())
        .or_insert_with(|| BackgroundAction::start(action_name));
    admission
}

/// Mark a background action finished.
///
/// Returns the final status, or `None` if the call id is unknown or the
/// action had already finished. Finishing an action may evict the oldest
/// finished entries past the retention cap.
pub fn complete(state: &mut SessionAutonomyState, call_id: &str, errored: bool) -> Option<BackgroundStatus> {
    let action = state.background_actions.get_mut(call_id)?;
    if !action.finish(errored) {
        return None;
    }
    let status = action.status;
    state.prune_finished_background();
    Some(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use modegate_config::ModeProfiles;
    use modegate_core::{AutonomyMode, MAX_FINISHED_BACKGROUND};

    fn state(limit: u32) -> SessionAutonomyState {
        SessionAutonomyState::new("conv-1".into(), AutonomyMode::Balanced, limit)
    }

    #[test]
    fn admits_under_capacity() {
        let profiles = ModeProfiles::default();
        let mut s = state(3);
        let a = admit(&mut s, &profiles.balanced, "task", "bg_1");
        assert_eq!(a.running, 0);
        assert!(!a.over_capacity);
        assert!(a.background_enabled);
        assert_eq!(s.running_background(), 1);
    }

    #[test]
    fn over_capacity_is_advisory() {
        let profiles = ModeProfiles::default();
        let mut s = state(2);
        admit(&mut s, &profiles.balanced, "task", "bg_1");
        admit(&mut s, &profiles.balanced, "task", "bg_2");
        let a = admit(&mut s, &profiles.balanced, "task", "bg_3");
        assert_eq!(a.running, 2);
        assert!(a.over_capacity);
        assert_eq!(s.running_background(), 3);
    }

    #[test]
    fn disabled_background_still_inserts() {
        let profiles = ModeProfiles::default();
        let mut s = state(0);
        let a = admit(&mut s, &profiles.restrictive, "task", "bg_1");
        assert!(a.over_capacity);
        assert!(!a.background_enabled);
        assert!(s.background_actions.contains_key("bg_1"));
    }

    #[test]
    fn completion_transitions_once() {
        let profiles = ModeProfiles::default();
        let mut s = state(3);
        admit(&mut s, &profiles.balanced, "task", "bg_1");

        assert_eq!(complete(&mut s, "bg_1", false), Some(BackgroundStatus::Completed));
        assert_eq!(complete(&mut s, "bg_1", true), None);
        let entry = &s.background_actions["bg_1"];
        assert_eq!(entry.status, BackgroundStatus::Completed);
        assert!(entry.ended_at.is_some());
        assert_eq!(s.running_background(), 0);
    }

    #[test]
    fn readmitting_finished_call_keeps_final_status() {
        let profiles = ModeProfiles::default();
        let mut s = state(3);
        admit(&mut s, &profiles.balanced, "task", "bg_1");
        assert_eq!(complete(&mut s, "bg_1", false), Some(BackgroundStatus::Completed));

        let a = admit(&mut s, &profiles.balanced, "task", "bg_1");
        assert_eq!(a.running, 0);
        let entry = &s.background_actions["bg_1"];
        assert_eq!(entry.status, BackgroundStatus::Completed);
        assert!(entry.ended_at.is_some());
        assert_eq!(s.running_background(), 0);
        assert_eq!(complete(&mut s, "bg_1", true), None);
    }

    #[test]
    fn readmitting_running_call_counts_once() {
        let profiles = ModeProfiles::default();
        let mut s = state(3);
        admit(&mut s, &profiles.balanced, "task", "bg_1");
        let a = admit(&mut s, &profiles.balanced, "task", "bg_1");
        assert_eq!(a.running, 1);
        assert_eq!(s.running_background(), 1);
        assert_eq!(s.background_actions.len(), 1);
    }

    #[test]
    fn completion_prunes_old_finished_actions() {
        let profiles = ModeProfiles::default();
        let mut s = state(3);
        for i in 0..=MAX_FINISHED_BACKGROUND {
            let id = format!("bg_{i}");
            admit(&mut s, &profiles.balanced, "task", &id);
            complete(&mut s, &id, false);
        }
        assert_eq!(s.background_actions.len(), MAX_FINISHED_BACKGROUND);
        assert!(s.background_actions.contains_key(&format!("bg_{MAX_FINISHED_BACKGROUND}")));
    }

    #[test]
    fn errored_completion() {
        let profiles = ModeProfiles::default();
        let mut s = state(3);
        admit(&mut s, &profiles.balanced, "task", "bg_1");
        assert_eq!(complete(&mut s, "bg_1", true), Some(BackgroundStatus::Error));
    }

    #[test]
    fn unknown_call_is_silent() {
        let mut s = state(3);
        assert_eq!(complete(&mut s, "never_started", false), None);
        assert!(s.background_actions.is_empty());
    }
}
