//! Mode registry — per-mode profiles and the keyword triggers that select
//! a mode for a single message.

use modegate_config::{AutonomyConfig, ModeProfile, ModeProfiles};
use modegate_core::AutonomyMode;
use serde::Serialize;

/// Characters accepted between a trigger keyword and the message body.
const TRIGGER_DELIMITERS: [char; 3] = [':', ',', '!'];

/// A keyword override detected at the start of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordOverride<'a> {
    pub mode: AutonomyMode,
    pub keyword: String,
    /// The message with the keyword and its delimiter removed.
    pub remainder: &'a str,
}

/// Read-only mode metadata, built once from configuration.
#[derive(Debug, Clone)]
pub struct ModeRegistry {
    default_mode: AutonomyMode,
    profiles: ModeProfiles,
    /// Longest keywords first, so "go ahead" wins over a shorter prefix.
    triggers: Vec<(String, AutonomyMode)>,
}

impl ModeRegistry {
    pub fn new(config: &AutonomyConfig) -> Self {
        let mut triggers: Vec<(String, AutonomyMode)> = config
            .triggers
            .raise
            .iter()
            .map(|k| (k.trim().to_lowercase(), AutonomyMode::Permissive))
            .chain(
                config
                    .triggers
                    .lower
                    .iter()
                    .map(|k| (k.trim().to_lowercase(), AutonomyMode::Restrictive)),
            )
            .filter(|(k, _)| !k.is_empty())
            .collect();
        triggers.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));

        Self {
            default_mode: config.default_mode,
            profiles: config.profiles.clone(),
            triggers,
        }
    }

    pub fn default_mode(&self) -> AutonomyMode {
        self.default_mode
    }

    pub fn profile(&self, mode: AutonomyMode) -> &ModeProfile {
        self.profiles.get(mode)
    }

    /// Summaries of all three modes, most autonomous first.
    pub fn summaries(&self) -> Vec<ModeSummary> {
        AutonomyMode::ALL
            .iter()
            .map(|&mode| ModeSummary::new(mode, self.profile(mode), None))
            .collect()
    }

    /// Look for a trigger keyword at the start of `text`.
    ///
    /// Leading whitespace is ignored. The keyword must be followed by a
    /// delimiter (`:`, `,` or `!`) or end the message; whitespace around
    /// the delimiter is tolerated.
    pub fn detect_override<'a>(&self, text: &'a str) -> Option<KeywordOverride<'a>> {
        let text = text.trim_start();
        self.triggers.iter().find_map(|(keyword, mode)| {
            strip_trigger(text, keyword).map(|remainder| KeywordOverride {
                mode: *mode,
                keyword: keyword.clone(),
                remainder,
            })
        })
    }
}

impl Default for ModeRegistry {
    fn default() -> Self {
        Self::new(&AutonomyConfig::default())
    }
}

fn strip_trigger<'a>(text: &'a str, keyword: &str) -> Option<&'a str> {
    let head = text.get(..keyword.len())?;
    if !head.eq_ignore_ascii_case(keyword) {
        return None;
    }

    let rest = text[keyword.len()..].trim_start();
    if rest.is_empty() {
        return Some(rest);
    }
    let body = rest.strip_prefix(&TRIGGER_DELIMITERS[..])?;
    Some(body.trim_start())
}

/// Structured description of a mode's settings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModeSummary {
    pub mode: AutonomyMode,
    pub label: String,
    pub description: String,
    pub planning_requires_approval: bool,
    pub background_enabled: bool,
    pub max_concurrent_background: u32,
    pub temperature_multiplier: f32,
    /// Mode in effect before a change, when reporting one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_mode: Option<AutonomyMode>,
}

impl ModeSummary {
    pub fn new(mode: AutonomyMode, profile: &ModeProfile, previous_mode: Option<AutonomyMode>) -> Self {
        Self {
            mode,
            label: profile.label.clone(),
            description: profile.description.clone(),
            planning_requires_approval: profile.planning_requires_approval,
            background_enabled: profile.background_enabled,
            max_concurrent_background: profile.max_concurrent_background,
            temperature_multiplier: profile.temperature_multiplier,
            previous_mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raise_keyword_detected_and_stripped() {
        let registry = ModeRegistry::default();
        let found = registry.detect_override("yolo: refactor the parser").unwrap();
        assert_eq!(found.mode, AutonomyMode::Permissive);
        assert_eq!(found.keyword, "yolo");
        assert_eq!(found.remainder, "refactor the parser");
    }

    #[test]
    fn lower_keyword_detected() {
        let registry = ModeRegistry::default();
        let found = registry.detect_override("Careful,   touch only tests").unwrap();
        assert_eq!(found.mode, AutonomyMode::Restrictive);
        assert_eq!(found.remainder, "touch only tests");
    }

    #[test]
    fn tolerates_whitespace_and_case() {
        let registry = ModeRegistry::default();
        let found = registry.detect_override("   GO AHEAD :\t  ship it").unwrap();
        assert_eq!(found.mode, AutonomyMode::Permissive);
        assert_eq!(found.remainder, "ship it");
    }

    #[test]
    fn bare_keyword_message() {
        let registry = ModeRegistry::default();
        let found = registry.detect_override("yolo").unwrap();
        assert_eq!(found.mode, AutonomyMode::Permissive);
        assert_eq!(found.remainder, "");
    }

    #[test]
    fn keyword_must_lead_and_be_delimited() {
        let registry = ModeRegistry::default();
        assert!(registry.detect_override("please be careful: here").is_none());
        assert!(registry.detect_override("automate the build").is_none());
        assert!(registry.detect_override("auto-complete the function").is_none());
        assert!(registry.detect_override("careful with that").is_none());
        assert!(registry.detect_override("").is_none());
    }

    #[test]
    fn longest_keyword_wins() {
        let registry = ModeRegistry::default();
        let found = registry.detect_override("autonomous: go").unwrap();
        assert_eq!(found.keyword, "autonomous");
        assert_eq!(found.remainder, "go");
    }

    #[test]
    fn non_ascii_text_does_not_panic() {
        let registry = ModeRegistry::default();
        assert!(registry.detect_override("ÿøłø: hi").is_none());
        assert!(registry.detect_override("日本語のメッセージ").is_none());
    }

    #[test]
    fn summaries_cover_all_modes() {
        let registry = ModeRegistry::default();
        let summaries = registry.summaries();
        assert_eq!(summaries.len(), 3);
        assert_eq!(summaries[0].mode, AutonomyMode::Permissive);
        assert_eq!(summaries[2].label, "Restrictive");
        assert!(summaries.iter().all(|s| s.previous_mode.is_none()));
    }
}
