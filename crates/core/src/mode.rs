//! Autonomy modes, risk tiers, and verdicts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// How much the agent may do without asking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutonomyMode {
    /// Trust the agent except for irreversible data loss.
    Permissive,
    /// Gate high-risk actions and planning steps.
    Balanced,
    /// Ask for everything that is not provably read-only.
    Restrictive,
}

impl AutonomyMode {
    /// All modes, from most to least autonomous.
    pub const ALL: [AutonomyMode; 3] = [
        AutonomyMode::Permissive,
        AutonomyMode::Balanced,
        AutonomyMode::Restrictive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AutonomyMode::Permissive => "permissive",
            AutonomyMode::Balanced => "balanced",
            AutonomyMode::Restrictive => "restrictive",
        }
    }
}

impl fmt::Display for AutonomyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AutonomyMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "permissive" => Ok(AutonomyMode::Permissive),
            "balanced" => Ok(AutonomyMode::Balanced),
            "restrictive" => Ok(AutonomyMode::Restrictive),
            _ => Err(Error::InvalidMode(s.to_string())),
        }
    }
}

/// Risk classification of a single requested action, independent of mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RiskTier::Low => "low",
            RiskTier::Medium => "medium",
            RiskTier::High => "high",
        })
    }
}

/// The engine's decision for one action request.
///
/// There is no `Deny`: rejection is a human answering an `Ask`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// Execute immediately.
    Allow,
    /// Hold for explicit human approval.
    #[default]
    Ask,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Verdict::Allow => "allow",
            Verdict::Ask => "ask",
        })
    }
}

/// Which override tier produced the effective mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeSource {
    /// Keyword in the current message.
    Message,
    /// Explicit "set mode" command.
    Session,
    /// Configured default.
    Default,
}

impl fmt::Display for ModeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ModeSource::Message => "message",
            ModeSource::Session => "session",
            ModeSource::Default => "default",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("Permissive".parse::<AutonomyMode>().unwrap(), AutonomyMode::Permissive);
        assert_eq!(" BALANCED ".parse::<AutonomyMode>().unwrap(), AutonomyMode::Balanced);
        assert_eq!("restrictive".parse::<AutonomyMode>().unwrap(), AutonomyMode::Restrictive);
    }

    #[test]
    fn parse_rejects_unknown() {
        let err = "yolo".parse::<AutonomyMode>().unwrap_err();
        assert!(matches!(err, Error::InvalidMode(m) if m == "yolo"));
    }

    #[test]
    fn display_matches_serde() {
        for mode in AutonomyMode::ALL {
            let json = serde_json::to_string(&mode).unwrap();
            assert_eq!(json, format!("\"{mode}\""));
        }
    }

    #[test]
    fn verdict_defaults_to_ask() {
        assert_eq!(Verdict::default(), Verdict::Ask);
    }

    #[test]
    fn risk_tiers_are_ordered() {
        assert!(RiskTier::Low < RiskTier::Medium);
        assert!(RiskTier::Medium < RiskTier::High);
    }
}
