//! Configuration loading, validation, and management for modegate.
//!
//! Loads configuration from `~/.modegate/config.toml` with an environment
//! variable override for the default mode. Everything is resolved at load
//! time: downstream code receives a complete structure and never re-checks
//! optionality.

use modegate_core::AutonomyMode;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.modegate/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Autonomy modes, triggers, and risk tiers
    #[serde(default)]
    pub autonomy: AutonomyConfig,

    /// Where session state is persisted
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutonomyConfig {
    /// Mode used when no override is active
    #[serde(default = "default_mode")]
    pub default_mode: AutonomyMode,

    /// Action names that execute shell commands
    #[serde(default = "default_shell_actions")]
    pub shell_actions: Vec<String>,

    /// Argument keys that may hold the command string of a shell action
    #[serde(default = "default_command_keys")]
    pub command_keys: Vec<String>,

    /// Sub-type values that mark an action as a planning step
    #[serde(default = "default_planning_markers")]
    pub planning_markers: Vec<String>,

    #[serde(default)]
    pub profiles: ModeProfiles,

    #[serde(default)]
    pub triggers: KeywordTriggers,

    /// Action-name lists per risk tier
    #[serde(default = "default_risk_lists")]
    pub risk: TierLists,

    /// Message keywords for advisory task classification
    #[serde(default = "default_task_keywords")]
    pub task_keywords: TierLists,
}

fn default_mode() -> AutonomyMode {
    AutonomyMode::Balanced
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_shell_actions() -> Vec<String> {
    strings(&["bash", "shell", "exec", "run_command"])
}
fn default_command_keys() -> Vec<String> {
    strings(&["command", "cmd"])
}
fn default_planning_markers() -> Vec<String> {
    strings(&["plan", "planning", "exitplanmode"])
}

fn default_risk_lists() -> TierLists {
    TierLists {
        high: strings(&[
            "write",
            "edit",
            "multiedit",
            "notebookedit",
            "bash",
            "shell",
            "exec",
            "delete",
            "move",
        ]),
        medium: strings(&["webfetch", "websearch", "http_request", "task", "todowrite"]),
        low: strings(&[
            "read",
            "glob",
            "grep",
            "ls",
            "list",
            "view",
            "search",
            "todoread",
            "notebookread",
        ]),
    }
}

fn default_task_keywords() -> TierLists {
    TierLists {
        high: strings(&[
            "delete", "remove", "drop", "deploy", "migrate", "production", "force", "overwrite",
            "credentials", "secret",
        ]),
        medium: strings(&[
            "refactor", "implement", "update", "modify", "install", "rename", "fix", "add",
        ]),
        low: strings(&[
            "read", "explain", "show", "list", "find", "search", "review", "summarize", "what",
            "why",
        ]),
    }
}

impl Default for AutonomyConfig {
    fn default() -> Self {
        Self {
            default_mode: default_mode(),
            shell_actions: default_shell_actions(),
            command_keys: default_command_keys(),
            planning_markers: default_planning_markers(),
            profiles: ModeProfiles::default(),
            triggers: KeywordTriggers::default(),
            risk: default_risk_lists(),
            task_keywords: default_task_keywords(),
        }
    }
}

impl AutonomyConfig {
    /// Lower-case and trim every name and keyword list, dropping blanks.
    pub fn normalize(&mut self) {
        for list in [
            &mut self.shell_actions,
            &mut self.command_keys,
            &mut self.planning_markers,
            &mut self.triggers.raise,
            &mut self.triggers.lower,
            &mut self.risk.high,
            &mut self.risk.medium,
            &mut self.risk.low,
            &mut self.task_keywords.high,
            &mut self.task_keywords.medium,
            &mut self.task_keywords.low,
        ] {
            normalize_list(list);
        }

        for mode in AutonomyMode::ALL {
            let profile = self.profiles.get_mut(mode);
            if profile.label.trim().is_empty() {
                profile.label = capitalize(mode.as_str());
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for mode in AutonomyMode::ALL {
            let m = self.profiles.get(mode).temperature_multiplier;
            if m.is_nan() || m <= 0.0 || m > 4.0 {
                return Err(ConfigError::ValidationError(format!(
                    "profiles.{mode}.temperature_multiplier must be in (0, 4], got {m}"
                )));
            }
        }

        let raise: HashSet<_> = self.triggers.raise.iter().collect();
        if let Some(kw) = self.triggers.lower.iter().find(|k| raise.contains(k)) {
            return Err(ConfigError::ValidationError(format!(
                "trigger keyword '{kw}' appears in both raise and lower groups"
            )));
        }

        let mut seen = HashSet::new();
        for name in self
            .risk
            .high
            .iter()
            .chain(&self.risk.medium)
            .chain(&self.risk.low)
        {
            if !seen.insert(name) {
                return Err(ConfigError::ValidationError(format!(
                    "action '{name}' is listed in more than one risk tier"
                )));
            }
        }

        Ok(())
    }
}

fn normalize_list(list: &mut Vec<String>) {
    let mut seen = HashSet::new();
    list.retain_mut(|s| {
        *s = s.trim().to_lowercase();
        !s.is_empty() && seen.insert(s.clone())
    });
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Per-mode behavior settings. Read-only after load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeProfile {
    /// Display label (defaults to the capitalized mode name)
    #[serde(default)]
    pub label: String,

    #[serde(default)]
    pub description: String,

    /// Whether planning steps must be approved in this mode
    pub planning_requires_approval: bool,

    pub background_enabled: bool,

    /// Soft cap on concurrently running background actions (0 disables)
    pub max_concurrent_background: u32,

    /// Sampling temperature multiplier, surfaced to the host only
    pub temperature_multiplier: f32,
}

impl ModeProfile {
    /// Background actions are admitted only when enabled with a non-zero cap.
    pub fn allows_background(&self) -> bool {
        self.background_enabled && self.max_concurrent_background > 0
    }

    /// The effective cap, 0 when background actions are disabled.
    pub fn background_limit(&self) -> u32 {
        if self.background_enabled {
            self.max_concurrent_background
        } else {
            0
        }
    }
}

/// Profiles for all three modes.
///
/// A profile table in the config file may name any subset of fields;
/// the rest come from that mode's built-in profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ProfileOverrides")]
pub struct ModeProfiles {
    pub permissive: ModeProfile,
    pub balanced: ModeProfile,
    pub restrictive: ModeProfile,
}

/// On-disk form of [`ModeProfiles`].
#[derive(Debug, Default, Deserialize)]
struct ProfileOverrides {
    #[serde(default)]
    permissive: PartialProfile,
    #[serde(default)]
    balanced: PartialProfile,
    #[serde(default)]
    restrictive: PartialProfile,
}

#[derive(Debug, Default, Deserialize)]
struct PartialProfile {
    label: Option<String>,
    description: Option<String>,
    planning_requires_approval: Option<bool>,
    background_enabled: Option<bool>,
    max_concurrent_background: Option<u32>,
    temperature_multiplier: Option<f32>,
}

impl PartialProfile {
    fn apply(self, base: ModeProfile) -> ModeProfile {
        ModeProfile {
            label: self.label.unwrap_or(base.label),
            description: self.description.unwrap_or(base.description),
            planning_requires_approval: self
                .planning_requires_approval
                .unwrap_or(base.planning_requires_approval),
            background_enabled: self.background_enabled.unwrap_or(base.background_enabled),
            max_concurrent_background: self
                .max_concurrent_background
                .unwrap_or(base.max_concurrent_background),
            temperature_multiplier: self
                .temperature_multiplier
                .unwrap_or(base.temperature_multiplier),
        }
    }
}

impl From<ProfileOverrides> for ModeProfiles {
    fn from(overrides: ProfileOverrides) -> Self {
        Self {
            permissive: overrides.permissive.apply(default_permissive_profile()),
            balanced: overrides.balanced.apply(default_balanced_profile()),
            restrictive: overrides.restrictive.apply(default_restrictive_profile()),
        }
    }
}

fn default_permissive_profile() -> ModeProfile {
    ModeProfile {
        label: "Permissive".into(),
        description: "Runs everything except irreversible deletes without asking".into(),
        planning_requires_approval: false,
        background_enabled: true,
        max_concurrent_background: 5,
        temperature_multiplier: 1.2,
    }
}

fn default_balanced_profile() -> ModeProfile {
    ModeProfile {
        label: "Balanced".into(),
        description: "Asks before high-risk actions and planning steps".into(),
        planning_requires_approval: true,
        background_enabled: true,
        max_concurrent_background: 3,
        temperature_multiplier: 1.0,
    }
}

fn default_restrictive_profile() -> ModeProfile {
    ModeProfile {
        label: "Restrictive".into(),
        description: "Asks before anything that is not read-only".into(),
        planning_requires_approval: true,
        background_enabled: false,
        max_concurrent_background: 0,
        temperature_multiplier: 0.7,
    }
}

impl Default for ModeProfiles {
    fn default() -> Self {
        Self {
            permissive: default_permissive_profile(),
            balanced: default_balanced_profile(),
            restrictive: default_restrictive_profile(),
        }
    }
}

impl ModeProfiles {
    pub fn get(&self, mode: AutonomyMode) -> &ModeProfile {
        match mode {
            AutonomyMode::Permissive => &self.permissive,
            AutonomyMode::Balanced => &self.balanced,
            AutonomyMode::Restrictive => &self.restrictive,
        }
    }

    fn get_mut(&mut self, mode: AutonomyMode) -> &mut ModeProfile {
        match mode {
            AutonomyMode::Permissive => &mut self.permissive,
            AutonomyMode::Balanced => &mut self.balanced,
            AutonomyMode::Restrictive => &mut self.restrictive,
        }
    }
}

/// Leading-keyword groups that override the mode for a single message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordTriggers {
    /// Switch the message to permissive
    #[serde(default = "default_raise_triggers")]
    pub raise: Vec<String>,

    /// Switch the message to restrictive
    #[serde(default = "default_lower_triggers")]
    pub lower: Vec<String>,
}

fn default_raise_triggers() -> Vec<String> {
    strings(&["yolo", "auto", "autonomous", "go ahead", "just do it"])
}
fn default_lower_triggers() -> Vec<String> {
    strings(&["careful", "ask first", "safe mode", "supervised", "step by step"])
}

impl Default for KeywordTriggers {
    fn default() -> Self {
        Self {
            raise: default_raise_triggers(),
            lower: default_lower_triggers(),
        }
    }
}

/// Three lists keyed by risk tier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TierLists {
    #[serde(default)]
    pub high: Vec<String>,
    #[serde(default)]
    pub medium: Vec<String>,
    #[serde(default)]
    pub low: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// "file", "memory", or "none"
    #[serde(default = "default_storage_backend")]
    pub backend: String,

    /// Directory for per-conversation records (default: ~/.modegate/sessions)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

fn default_storage_backend() -> String {
    "file".into()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            dir: None,
        }
    }
}

impl StorageConfig {
    /// Resolved directory for session records.
    pub fn sessions_dir(&self) -> PathBuf {
        self.dir
            .clone()
            .unwrap_or_else(|| AppConfig::config_dir().join("sessions"))
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.modegate/config.toml).
    ///
    /// Never fails: a missing or broken file yields the built-in defaults.
    /// `MODEGATE_DEFAULT_MODE` overrides the configured default mode.
    pub fn load() -> Self {
        Self::load_at(&Self::config_path())
    }

    /// Like [`Self::load`], but from an explicit path.
    pub fn load_at(path: &Path) -> Self {
        let mut config = Self::load_or_default(path);

        if let Ok(mode) = std::env::var("MODEGATE_DEFAULT_MODE") {
            match mode.parse::<AutonomyMode>() {
                Ok(mode) => config.autonomy.default_mode = mode,
                Err(e) => tracing::warn!(error = %e, "Ignoring MODEGATE_DEFAULT_MODE"),
            }
        }

        config
    }

    /// Load from `path`, substituting defaults on any failure.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load_from(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "Invalid configuration, using built-in defaults");
                Self::default()
            }
        }
    }

    /// Load configuration from a specific file path.
    ///
    /// `.json` files are parsed as JSON, everything else as TOML.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let is_json = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let mut config: Self = if is_json {
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
        } else {
            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
        };

        config.autonomy.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".modegate")
    }

    /// Default config file path.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.autonomy.validate()?;

        if !matches!(self.storage.backend.as_str(), "file" | "memory" | "none") {
            return Err(ConfigError::ValidationError(format!(
                "storage.backend must be one of file, memory, none (got '{}')",
                self.storage.backend
            )));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(suffix: &str, content: &str) -> NamedTempFile {
        let mut tmp = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        tmp.write_all(content.as_bytes()).unwrap();
        tmp
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert_eq!(config.autonomy.default_mode, AutonomyMode::Balanced);
        assert_eq!(config.autonomy.profiles.balanced.max_concurrent_background, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.autonomy.default_mode, config.autonomy.default_mode);
        assert_eq!(parsed.autonomy.profiles, config.autonomy.profiles);
        assert_eq!(parsed.autonomy.risk, config.autonomy.risk);
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.autonomy.default_mode, AutonomyMode::Balanced);
    }

    #[test]
    fn malformed_config_falls_back_to_defaults() {
        let tmp = write_config(".toml", "this is = = not toml");
        assert!(matches!(
            AppConfig::load_from(tmp.path()),
            Err(ConfigError::ParseError { .. })
        ));
        let config = AppConfig::load_or_default(tmp.path());
        assert_eq!(config.autonomy.default_mode, AutonomyMode::Balanced);
    }

    #[test]
    fn unknown_mode_is_a_parse_error() {
        let tmp = write_config(".toml", "[autonomy]\ndefault_mode = \"turbo\"\n");
        assert!(matches!(
            AppConfig::load_from(tmp.path()),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let tmp = write_config(
            ".toml",
            r#"
[autonomy]
default_mode = "restrictive"

[autonomy.risk]
high = ["Deploy"]
low = ["READ"]
"#,
        );
        let config = AppConfig::load_from(tmp.path()).unwrap();
        assert_eq!(config.autonomy.default_mode, AutonomyMode::Restrictive);
        assert_eq!(config.autonomy.risk.high, vec!["deploy".to_string()]);
        assert_eq!(config.autonomy.risk.low, vec!["read".to_string()]);
        assert!(config.autonomy.risk.medium.is_empty());
        assert_eq!(config.autonomy.triggers, KeywordTriggers::default());
        assert_eq!(config.autonomy.profiles, ModeProfiles::default());
    }

    #[test]
    fn json_config_is_accepted() {
        let tmp = write_config(
            ".json",
            r#"{"autonomy": {"default_mode": "permissive"}, "storage": {"backend": "memory"}}"#,
        );
        let config = AppConfig::load_from(tmp.path()).unwrap();
        assert_eq!(config.autonomy.default_mode, AutonomyMode::Permissive);
        assert_eq!(config.storage.backend, "memory");
    }

    #[test]
    fn profile_override_fills_label() {
        let tmp = write_config(
            ".toml",
            r#"
[autonomy.profiles.balanced]
planning_requires_approval = false
background_enabled = true
max_concurrent_background = 8
temperature_multiplier = 0.9
"#,
        );
        let config = AppConfig::load_from(tmp.path()).unwrap();
        let balanced = &config.autonomy.profiles.balanced;
        assert_eq!(balanced.label, "Balanced");
        assert_eq!(balanced.max_concurrent_background, 8);
        assert!(!balanced.planning_requires_approval);
    }

    #[test]
    fn partial_profile_keeps_mode_defaults() {
        let tmp = write_config(
            ".toml",
            r#"
[autonomy]
default_mode = "restrictive"

[autonomy.profiles.balanced]
max_concurrent_background = 8
"#,
        );
        let config = AppConfig::load_from(tmp.path()).unwrap();
        assert_eq!(config.autonomy.default_mode, AutonomyMode::Restrictive);

        let profiles = &config.autonomy.profiles;
        assert_eq!(profiles.balanced.max_concurrent_background, 8);
        assert!(profiles.balanced.planning_requires_approval);
        assert!(profiles.balanced.background_enabled);
        assert_eq!(profiles.balanced.temperature_multiplier, 1.0);
        assert_eq!(profiles.balanced.label, "Balanced");
        assert_eq!(profiles.permissive, ModeProfiles::default().permissive);
        assert_eq!(profiles.restrictive, ModeProfiles::default().restrictive);
    }

    #[test]
    fn partial_profile_json() {
        let tmp = write_config(
            ".json",
            r#"{"autonomy": {"profiles": {"restrictive": {"temperature_multiplier": 0.5}}}}"#,
        );
        let config = AppConfig::load_from(tmp.path()).unwrap();
        let restrictive = &config.autonomy.profiles.restrictive;
        assert_eq!(restrictive.temperature_multiplier, 0.5);
        assert!(!restrictive.background_enabled);
        assert_eq!(restrictive.label, "Restrictive");
    }

    #[test]
    fn overlapping_triggers_rejected() {
        let mut config = AppConfig::default();
        config.autonomy.triggers.lower.push("yolo".into());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(msg)) if msg.contains("yolo")
        ));
    }

    #[test]
    fn duplicate_risk_tier_rejected() {
        let mut config = AppConfig::default();
        config.autonomy.risk.low.push("write".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_temperature_multiplier_rejected() {
        let mut config = AppConfig::default();
        config.autonomy.profiles.permissive.temperature_multiplier = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_storage_backend_rejected() {
        let mut config = AppConfig::default();
        config.storage.backend = "redis".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn normalize_lowercases_and_dedups() {
        let mut autonomy = AutonomyConfig::default();
        autonomy.shell_actions = vec![" Bash ".into(), "bash".into(), "".into()];
        autonomy.normalize();
        assert_eq!(autonomy.shell_actions, vec!["bash".to_string()]);
    }

    #[test]
    fn restrictive_profile_disables_background() {
        let profiles = ModeProfiles::default();
        assert!(!profiles.restrictive.allows_background());
        assert_eq!(profiles.restrictive.background_limit(), 0);
        assert!(profiles.permissive.allows_background());
        assert_eq!(profiles.permissive.background_limit(), 5);
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("default_mode = \"balanced\""));
        assert!(toml_str.contains("temperature_multiplier"));
    }

    #[test]
    fn sessions_dir_defaults_under_config_dir() {
        let storage = StorageConfig::default();
        assert!(storage.sessions_dir().ends_with(".modegate/sessions"));
    }
}
