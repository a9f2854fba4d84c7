//! Configuration system for Bavet scoring sessions.
//!
//! Load session configuration from TOML or YAML to control constraint match
//! bookkeeping, self-checking and constraint weights without code changes.
//!
//! # Examples
//!
//! Load configuration from TOML string:
//!
//! ```
//! use bavet_config::{ConstraintMatchPolicy, EnvironmentMode, SessionConfig};
//! use bavet_core::HardSoftScore;
//!
//! let config = SessionConfig::from_toml_str(r#"
//!     constraint_match_policy = "enabled_with_justifications"
//!     environment_mode = "full_assert"
//!
//!     [constraint_weights]
//!     "Room conflict" = "1hard/0soft"
//!     "Teacher preference" = "0hard/0soft"
//! "#).unwrap();
//!
//! assert_eq!(config.constraint_match_policy, ConstraintMatchPolicy::EnabledWithJustifications);
//! assert_eq!(config.environment_mode, EnvironmentMode::FullAssert);
//!
//! let weights = config.parsed_weights::<HardSoftScore>().unwrap();
//! assert_eq!(weights.len(), 2);
//! ```
//!
//! Use default config when file is missing:
//!
//! ```
//! use bavet_config::SessionConfig;
//!
//! let config = SessionConfig::load("bavet.toml").unwrap_or_default();
//! assert!(config.constraint_weights.is_empty());
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use bavet_core::ParseableScore;
use serde::{Deserialize, Serialize};
use thiserror::Error;


/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration of one scoring session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SessionConfig {
    /// How much constraint match bookkeeping the score inliner keeps.
    #[serde(default)]
    pub constraint_match_policy: ConstraintMatchPolicy,

    /// Environment mode affecting self-checking.
    #[serde(default)]
    pub environment_mode: EnvironmentMode,

    /// Constraint weight overrides, keyed by constraint name, as score strings.
    #[serde(default)]
    pub constraint_weights: BTreeMap<String, String>,
}

impl SessionConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if file doesn't exist or contains invalid TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_file(path)
    }

    /// Loads configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Loads configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Parses configuration from a YAML string.
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(s)?)
    }

    /// Sets the constraint match policy.
    pub fn with_constraint_match_policy(mut self, policy: ConstraintMatchPolicy) -> Self {
        self.constraint_match_policy = policy;
        self
    }

    /// Sets the environment mode.
    pub fn with_environment_mode(mut self, mode: EnvironmentMode) -> Self {
        self.environment_mode = mode;
        self
    }

    /// Adds a constraint weight override from any parseable score.
    pub fn with_constraint_weight<Sc: ParseableScore>(
        mut self,
        name: impl Into<String>,
        weight: Sc,
    ) -> Self {
        self.constraint_weights
            .insert(name.into(), weight.to_string_repr());
        self
    }

    /// Parses every configured constraint weight into the session's score type.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first weight that does not parse.
    pub fn parsed_weights<Sc: ParseableScore>(&self) -> Result<Vec<(String, Sc)>, ConfigError> {
        self.constraint_weights
            .iter()
            .map(|(name, raw)| {
                Sc::parse(raw)
                    .map(|weight| (name.clone(), weight))
                    .map_err(|e| {
                        ConfigError::Invalid(format!("constraint weight for '{}': {}", name, e))
                    })
            })
            .collect()
    }
}

/// How much constraint match information the score inliner keeps.
///
/// Fixed when a session is built; it cannot change afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintMatchPolicy {
    /// Only the running score delta is kept.
    #[default]
    Disabled,

    /// Each match's score is kept, without justifications.
    Enabled,

    /// Matches also carry their justification and indicted facts.
    EnabledWithJustifications,
}

impl ConstraintMatchPolicy {
    /// Returns true if matches are recorded at all.
    pub fn is_enabled(self) -> bool {
        !matches!(self, ConstraintMatchPolicy::Disabled)
    }

    /// Returns true if justifications are materialized.
    pub fn is_justification_enabled(self) -> bool {
        matches!(self, ConstraintMatchPolicy::EnabledWithJustifications)
    }
}

/// Environment mode affecting session self-checking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentMode {
    /// No self-checking.
    #[default]
    NonReproducible,

    /// Deterministic iteration order; no extra checks.
    Reproducible,

    /// Cheap internal assertions (queue and arena consistency after settle).
    FastAssert,

    /// Every settle is cross-checked against a from-scratch rebuild.
    FullAssert,
}

impl EnvironmentMode {
    /// Returns true if any assertions are enabled.
    pub fn is_asserted(self) -> bool {
        matches!(self, EnvironmentMode::FastAssert | EnvironmentMode::FullAssert)
    }

    /// Returns true if settled scores are verified by a full rebuild.
    pub fn is_fully_asserted(self) -> bool {
        matches!(self, EnvironmentMode::FullAssert)
    }
}
