//! Rotation configuration.
//!
//! Configuration is read from TOML. Every field has a default, so an empty
//! file is a valid configuration:
//!
//! ```toml
//! password_length = 32
//! symbols = "!@#$%^&*()_+-=[]{}|;:,.<>?"
//! resource_attribute = "dbInstanceIdentifier"
//!
//! [timeouts]
//! fetch_ms = 5000
//! apply_ms = 30000
//! commit_ms = 5000
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::generator::{CharacterPolicy, DEFAULT_LENGTH, DEFAULT_SYMBOLS, MAX_LENGTH, MIN_LENGTH};

/// Attribute of the secret record naming the target resource, by default.
pub const DEFAULT_RESOURCE_ATTRIBUTE: &str = "dbInstanceIdentifier";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file '{path}': {reason}")]
    Read {
        /// The file that could not be read.
        path: String,
        /// The underlying I/O error.
        reason: String,
    },

    /// The configuration is not valid TOML for this schema.
    #[error("invalid TOML: {0}")]
    Parse(String),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Per-step bounds on collaborator calls, in milliseconds.
///
/// A call that does not finish in time fails the step it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepTimeouts {
    /// Bound on reading the record and any staged credential.
    pub fetch_ms: u64,
    /// Bound on applying the credential to the target.
    pub apply_ms: u64,
    /// Bound on staging and committing to the store.
    pub commit_ms: u64,
}

impl StepTimeouts {
    /// Returns the fetch bound.
    #[must_use]
    pub const fn fetch(&self) -> Duration {
        Duration::from_millis(self.fetch_ms)
    }

    /// Returns the apply bound.
    #[must_use]
    pub const fn apply(&self) -> Duration {
        Duration::from_millis(self.apply_ms)
    }

    /// Returns the commit bound.
    #[must_use]
    pub const fn commit(&self) -> Duration {
        Duration::from_millis(self.commit_ms)
    }
}

impl Default for StepTimeouts {
    fn default() -> Self {
        Self {
            fetch_ms: 5_000,
            apply_ms: 30_000,
            commit_ms: 5_000,
        }
    }
}

/// Configuration for the [`RotationCoordinator`](crate::coordinator::RotationCoordinator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationConfig {
    /// Length of generated credentials.
    pub password_length: usize,
    /// Symbol class used by the generator.
    pub symbols: String,
    /// Record attribute holding the target resource identifier.
    pub resource_attribute: String,
    /// Bounds on collaborator calls.
    pub timeouts: StepTimeouts,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            password_length: DEFAULT_LENGTH,
            symbols: DEFAULT_SYMBOLS.to_string(),
            resource_attribute: DEFAULT_RESOURCE_ATTRIBUTE.to_string(),
            timeouts: StepTimeouts::default(),
        }
    }
}

impl RotationConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or fails validation.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Builds the generator policy for the configured symbol class.
    ///
    /// # Errors
    ///
    /// Returns an error if the symbol class is unusable.
    pub fn character_policy(&self) -> Result<CharacterPolicy, ConfigError> {
        CharacterPolicy::new(&self.symbols).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_LENGTH..=MAX_LENGTH).contains(&self.password_length) {
            return Err(ConfigError::Invalid(format!(
                "password_length must be between {MIN_LENGTH} and {MAX_LENGTH}, got {}",
                self.password_length
            )));
        }

        self.character_policy()?;

        if self.resource_attribute.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "resource_attribute cannot be empty".to_string(),
            ));
        }

        if self.timeouts.fetch_ms == 0 || self.timeouts.apply_ms == 0 || self.timeouts.commit_ms == 0
        {
            return Err(ConfigError::Invalid(
                "timeouts must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
