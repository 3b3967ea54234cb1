//! Risk classification for modegate — labels each requested action.
//!
//! Provides:
//! - **Risk tiers**: Action-name lookup into the configured high/medium/low lists
//! - **Destructive commands**: Pattern detection for irreversible shell commands
//!
//! Both are pure functions of their input and the loaded configuration.

pub mod risk;
pub mod shell;

pub use risk::RiskClassifier;
pub use shell::is_destructive_shell_command;
