//! Action risk tiers — case-insensitive lookup into configured lists.
//!
//! Names that appear in no list are `Medium`. An unknown capability is
//! never assumed to be safe.

use modegate_config::{AutonomyConfig, TierLists};
use modegate_core::RiskTier;
use std::collections::HashSet;

/// Maps action names to a [`RiskTier`].
#[derive(Debug, Clone)]
pub struct RiskClassifier {
    high: HashSet<String>,
    medium: HashSet<String>,
    low: HashSet<String>,
}

impl RiskClassifier {
    /// Build from the three configured tier lists.
    pub fn new(lists: &TierLists) -> Self {
        let set = |names: &[String]| -> HashSet<String> {
            names.iter().map(|n| n.trim().to_lowercase()).collect()
        };
        Self {
            high: set(&lists.high),
            medium: set(&lists.medium),
            low: set(&lists.low),
        }
    }

    /// Classify an action by exact, case-insensitive name match.
    pub fn classify(&self, action_name: &str) -> RiskTier {
        let name = action_name.trim().to_lowercase();
        if self.high.contains(&name) {
            RiskTier::High
        } else if self.medium.contains(&name) {
            RiskTier::Medium
        } else if self.low.contains(&name) {
            RiskTier::Low
        } else {
            RiskTier::Medium
        }
    }

    /// Whether the name appears in any tier list.
    pub fn is_known(&self, action_name: &str) -> bool {
        let name = action_name.trim().to_lowercase();
        self.high.contains(&name) || self.medium.contains(&name) || self.low.contains(&name)
    }
}

impl Default for RiskClassifier {
    fn default() -> Self {
        Self::new(&AutonomyConfig::default().risk)
    }
}
