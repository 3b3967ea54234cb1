//! Permission decisions — turns (mode, action) into allow or ask.
//!
//! Rules per mode, first match wins:
//!
//! | Mode        | Rule                                         | Verdict |
//! |-------------|----------------------------------------------|---------|
//! | permissive  | planning step and profile requires approval  | ask     |
//! | permissive  | destructive shell command                    | ask     |
//! | permissive  | otherwise                                    | allow   |
//! | balanced    | planning step and profile requires approval  | ask     |
//! | balanced    | high risk                                    | ask     |
//! | balanced    | destructive shell command                    | ask     |
//! | balanced    | otherwise                                    | allow   |
//! | restrictive | low risk                                     | allow   |
//! | restrictive | otherwise                                    | ask     |
//!
//! The built-in permissive profile does not require planning approval, so
//! with default configuration permissive only asks for destructive commands.
//! The evaluation itself has no side effects; the engine records pending
//! approvals for `ask` verdicts.

use modegate_config::{AutonomyConfig, ModeProfile};
use modegate_core::{AutonomyMode, ConversationId, Error, RiskTier, Verdict};
use modegate_security::{RiskClassifier, is_destructive_shell_command};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Argument keys that can carry an action's sub-type.
const SUBTYPE_KEYS: [&str; 4] = ["subagent_type", "subtype", "task_type", "kind"];

/// A fully-typed permission-check request from the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionRequest {
    pub conversation_id: ConversationId,
    pub action_name: String,
    /// Action arguments as sent by the agent.
    #[serde(default)]
    pub arguments: serde_json::Value,
    pub call_id: String,
}

impl PermissionRequest {
    pub fn new(
        conversation_id: impl Into<ConversationId>,
        action_name: impl Into<String>,
        arguments: serde_json::Value,
        call_id: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            action_name: action_name.into(),
            arguments,
            call_id: call_id.into(),
        }
    }

    /// All identifiers are required.
    pub fn validate(&self) -> Result<(), Error> {
        if self.conversation_id.as_str().trim().is_empty() {
            return Err(Error::MissingField("conversation_id"));
        }
        if self.action_name.trim().is_empty() {
            return Err(Error::MissingField("action_name"));
        }
        if self.call_id.trim().is_empty() {
            return Err(Error::MissingField("call_id"));
        }
        Ok(())
    }
}

/// Why a verdict was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    /// Shell command matched a destructive pattern.
    DestructiveCommand,
    /// Planning step in a mode that gates planning.
    PlanningStep,
    /// High-risk action in balanced mode.
    HighRisk,
    /// Anything but a read-only action in restrictive mode.
    NotReadOnly,
    /// Permissive mode trusts the action.
    Trusted,
    /// Balanced mode lets medium and low risk through.
    BelowHighRisk,
    /// Read-only action in restrictive mode.
    ReadOnly,
    /// The request was malformed; asking is the safe answer.
    InvalidRequest,
}

impl DecisionReason {
    pub fn description(&self) -> &'static str {
        match self {
            DecisionReason::DestructiveCommand => "shell command is destructive",
            DecisionReason::PlanningStep => "planning steps require approval in this mode",
            DecisionReason::HighRisk => "action is classified high risk",
            DecisionReason::NotReadOnly => "only read-only actions run without approval",
            DecisionReason::Trusted => "permissive mode trusts this action",
            DecisionReason::BelowHighRisk => "action is below high risk",
            DecisionReason::ReadOnly => "action is read-only",
            DecisionReason::InvalidRequest => "request is missing required fields",
        }
    }
}

/// The engine's answer to one permission check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub verdict: Verdict,
    /// Effective mode the decision was made under.
    pub mode: AutonomyMode,
    pub risk: RiskTier,
    pub reason: DecisionReason,
}

impl Decision {
    fn allow(mode: AutonomyMode, risk: RiskTier, reason: DecisionReason) -> Self {
        Self {
            verdict: Verdict::Allow,
            mode,
            risk,
            reason,
        }
    }

    fn ask(mode: AutonomyMode, risk: RiskTier, reason: DecisionReason) -> Self {
        Self {
            verdict: Verdict::Ask,
            mode,
            risk,
            reason,
        }
    }

    /// `ask` for a request that could not be evaluated.
    pub fn fail_safe(mode: AutonomyMode, risk: RiskTier) -> Self {
        Self::ask(mode, risk, DecisionReason::InvalidRequest)
    }

    pub fn is_allowed(&self) -> bool {
        self.verdict == Verdict::Allow
    }
}

/// Stateless evaluator for the decision table.
#[derive(Debug, Clone)]
pub struct PermissionPolicy {
    classifier: RiskClassifier,
    shell_actions: HashSet<String>,
    command_keys: Vec<String>,
    planning_markers: HashSet<String>,
}

impl PermissionPolicy {
    pub fn new(config: &AutonomyConfig) -> Self {
        let lower = |items: &[String]| -> HashSet<String> {
            items.iter().map(|s| s.trim().to_lowercase()).collect()
        };
        Self {
            classifier: RiskClassifier::new(&config.risk),
            shell_actions: lower(&config.shell_actions),
            command_keys: config.command_keys.clone(),
            planning_markers: lower(&config.planning_markers),
        }
    }

    pub fn classifier(&self) -> &RiskClassifier {
        &self.classifier
    }

    /// Evaluate a request under `mode`, whose settings are `profile`.
    pub fn evaluate(&self, mode: AutonomyMode, profile: &ModeProfile, request: &PermissionRequest) -> Decision {
        let risk = self.classifier.classify(&request.action_name);

        match mode {
            AutonomyMode::Permissive => {
                if profile.planning_requires_approval && self.is_planning(request) {
                    Decision::ask(mode, risk, DecisionReason::PlanningStep)
                } else if self.is_destructive(request) {
                    Decision::ask(mode, risk, DecisionReason::DestructiveCommand)
                } else {
                    Decision::allow(mode, risk, DecisionReason::Trusted)
                }
            }
            AutonomyMode::Balanced => {
                if profile.planning_requires_approval && self.is_planning(request) {
                    Decision::ask(mode, risk, DecisionReason::PlanningStep)
                } else if risk == RiskTier::High {
                    Decision::ask(mode, risk, DecisionReason::HighRisk)
                } else if self.is_destructive(request) {
                    Decision::ask(mode, risk, DecisionReason::DestructiveCommand)
                } else {
                    Decision::allow(mode, risk, DecisionReason::BelowHighRisk)
                }
            }
            AutonomyMode::Restrictive => {
                if risk == RiskTier::Low {
                    Decision::allow(mode, risk, DecisionReason::ReadOnly)
                } else {
                    Decision::ask(mode, risk, DecisionReason::NotReadOnly)
                }
            }
        }
    }

    /// Whether the action executes shell commands.
    pub fn is_shell_action(&self, action_name: &str) -> bool {
        self.shell_actions.contains(&action_name.trim().to_lowercase())
    }

    /// Command string of a shell action: a bare string argument or the
    /// first configured command key holding a string.
    pub fn shell_command<'a>(&self, request: &'a PermissionRequest) -> Option<&'a str> {
        if !self.is_shell_action(&request.action_name) {
            return None;
        }
        match &request.arguments {
            serde_json::Value::String(cmd) => Some(cmd.as_str()),
            serde_json::Value::Object(map) => self.command_keys.iter().find_map(|key| {
                map.iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(key))
                    .and_then(|(_, v)| v.as_str())
            }),
            _ => None,
        }
    }

    /// Destructive-command check. Only shell actions consult it.
    fn is_destructive(&self, request: &PermissionRequest) -> bool {
        self.shell_command(request)
            .is_some_and(is_destructive_shell_command)
    }

    /// A planning step is a planning-marker action name or an argument
    /// sub-type equal to a planning marker.
    pub fn is_planning(&self, request: &PermissionRequest) -> bool {
        if self
            .planning_markers
            .contains(&request.action_name.trim().to_lowercase())
        {
            return true;
        }
        let Some(map) = request.arguments.as_object() else {
            return false;
        };
        SUBTYPE_KEYS.iter().any(|key| {
            map.get(*key)
                .and_then(|v| v.as_str())
                .is_some_and(|v| self.planning_markers.contains(&v.trim().to_lowercase()))
        })
    }
}

impl Default for PermissionPolicy {
    fn default() -> Self {
        Self::new(&AutonomyConfig::default())
    }
}
