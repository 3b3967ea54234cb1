//! # modegate Autonomy
//!
//! Mode resolution and permission gating for agent actions.
//!
//! The [`AutonomyEngine`] owns per-conversation state and exposes the host
//! callbacks: message preprocessing, permission checks, pre/post execution
//! and mode commands. The pure pieces it is built from are exposed too:
//!
//! - [`ModeRegistry`]: mode profiles and keyword triggers
//! - [`resolution`]: the message > session > default override tiers
//! - [`PermissionPolicy`]: the per-mode decision table
//! - [`outcome`]: reconciling pending approvals
//! - [`background`]: the advisory concurrency cap
//! - [`TaskClassifier`]: keyword scoring of free text, informational only

pub mod background;
pub mod decision;
pub mod engine;
pub mod outcome;
pub mod registry;
pub mod resolution;
pub mod status;
pub mod task;

pub use background::BackgroundAdmission;
pub use decision::{Decision, DecisionReason, PermissionPolicy, PermissionRequest};
pub use engine::AutonomyEngine;
pub use registry::{KeywordOverride, ModeRegistry, ModeSummary};
pub use resolution::MessageResolution;
pub use status::{
    AutonomyStatus, BackgroundSummary, ExecutionOutcome, MessageOutcome, ModeInfo, PendingSummary,
};
pub use task::{TaskClassification, TaskClassifier};
