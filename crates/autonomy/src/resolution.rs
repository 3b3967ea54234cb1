//! Mode resolution — applies the override tiers to a session.
//!
//! Priority is message override, then session override, then the default.
//! A message override lives for exactly one message: it is cleared at the
//! start of every message before the new text is scanned.

use chrono::Utc;
use modegate_core::{AutonomyMode, ModeSource, SessionAutonomyState};
use serde::Serialize;

use crate::registry::ModeRegistry;

/// Result of preparing one incoming message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageResolution {
    /// Message text with any trigger keyword removed.
    pub text: String,
    pub message_override: Option<AutonomyMode>,
    /// Effective mode for this message.
    pub mode: AutonomyMode,
    pub source: ModeSource,
}

/// Recompute `current_mode` and the background cap that follows it.
/// Returns `true` if the effective mode changed.
pub fn sync_mode(state: &mut SessionAutonomyState, registry: &ModeRegistry) -> bool {
    let changed = state.resolve();
    state.background_limit = registry.profile(state.current_mode).background_limit();
    changed
}

/// Reset the message override, scan `text` for a trigger keyword, and
/// resolve the effective mode for this message.
pub fn begin_message(
    state: &mut SessionAutonomyState,
    registry: &ModeRegistry,
    text: &str,
) -> MessageResolution {
    state.message_override = None;

    let text = match registry.detect_override(text) {
        Some(found) => {
            state.message_override = Some(found.mode);
            found.remainder.to_string()
        }
        None => text.to_string(),
    };

    sync_mode(state, registry);

    MessageResolution {
        text,
        message_override: state.message_override,
        mode: state.current_mode,
        source: state.mode_source(),
    }
}

/// Set or clear the session override.
///
/// An explicit command supersedes a keyword seen earlier in the same
/// message, so the message override is cleared as well. Returns the mode
/// that was in effect before the change.
pub fn set_session_override(
    state: &mut SessionAutonomyState,
    registry: &ModeRegistry,
    mode: Option<AutonomyMode>,
) -> AutonomyMode {
    let previous = state.current_mode;
    state.session_override = mode;
    state.message_override = None;
    sync_mode(state, registry);
    state.last_mode_change = Utc::now();
    previous
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (SessionAutonomyState, ModeRegistry) {
        let registry = ModeRegistry::default();
        let state = SessionAutonomyState::new(
            "conv-1".into(),
            registry.default_mode(),
            registry.profile(registry.default_mode()).background_limit(),
        );
        (state, registry)
    }

    #[test]
    fn plain_message_uses_default() {
        let (mut state, registry) = setup();
        let res = begin_message(&mut state, &registry, "list the files");
        assert_eq!(res.text, "list the files");
        assert_eq!(res.mode, AutonomyMode::Balanced);
        assert_eq!(res.source, ModeSource::Default);
        assert_eq!(res.message_override, None);
    }

    #[test]
    fn keyword_overrides_for_one_message() {
        let (mut state, registry) = setup();
        state.session_override = Some(AutonomyMode::Restrictive);
        sync_mode(&mut state, &registry);

        let res = begin_message(&mut state, &registry, "yolo: clean up");
        assert_eq!(res.mode, AutonomyMode::Permissive);
        assert_eq!(res.source, ModeSource::Message);
        assert_eq!(res.text, "clean up");
        assert_eq!(state.current_mode, AutonomyMode::Permissive);
        assert_eq!(state.background_limit, 5);

        let res = begin_message(&mut state, &registry, "now the docs");
        assert_eq!(res.mode, AutonomyMode::Restrictive);
        assert_eq!(res.source, ModeSource::Session);
        assert_eq!(state.message_override, None);
        assert_eq!(state.background_limit, 0);
    }

    #[test]
    fn session_override_supersedes_message_keyword() {
        let (mut state, registry) = setup();
        begin_message(&mut state, &registry, "careful: look around");
        assert_eq!(state.current_mode, AutonomyMode::Restrictive);

        let previous = set_session_override(&mut state, &registry, Some(AutonomyMode::Permissive));
        assert_eq!(previous, AutonomyMode::Restrictive);
        assert_eq!(state.current_mode, AutonomyMode::Permissive);
        assert_eq!(state.message_override, None);
    }

    #[test]
    fn clearing_session_override_falls_back_to_default() {
        let (mut state, registry) = setup();
        set_session_override(&mut state, &registry, Some(AutonomyMode::Restrictive));
        set_session_override(&mut state, &registry, None);
        assert_eq!(state.current_mode, AutonomyMode::Balanced);
        assert_eq!(state.mode_source(), ModeSource::Default);
        assert_eq!(state.background_limit, 3);
    }
}
