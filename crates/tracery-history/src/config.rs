#![forbid(unsafe_code)]

//! Engine configuration.
//!
//! [`UndoConfig`] holds the tunables of the transaction controller and can be
//! loaded from TOML or JSON when the `config` feature is enabled.
//!
//! ```toml
//! # tracery-undo.toml
//! max_edit_count = 200
//! checks_transaction_level = true
//! locale = "de"
//! ```
//!
//! ```rust,ignore
//! let config = UndoConfig::from_toml_file("tracery-undo.toml")?;
//! let manager = UndoManager::with_config(config);
//! ```

#[cfg(feature = "config")]
use std::path::Path;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tunables for the transaction controller and replay engine.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct UndoConfig {
    /// Maximum number of committed edits kept. Negative means unbounded,
    /// zero is treated as one.
    pub max_edit_count: i64,

    /// Warn whenever a change arrives while no transaction is open.
    pub checks_transaction_level: bool,

    /// Locale used to resolve presentation names.
    pub locale: String,
}

impl Default for UndoConfig {
    fn default() -> Self {
        Self {
            max_edit_count: -1,
            checks_transaction_level: false,
            locale: "en".to_owned(),
        }
    }
}

impl UndoConfig {
    /// Set the history bound.
    #[must_use]
    pub fn with_max_edit_count(mut self, max_edit_count: i64) -> Self {
        self.max_edit_count = max_edit_count;
        self
    }

    /// Enable or disable the out-of-transaction diagnostic.
    #[must_use]
    pub fn with_transaction_checks(mut self, enabled: bool) -> Self {
        self.checks_transaction_level = enabled;
        self
    }

    /// Set the presentation-name locale.
    #[must_use]
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// Load from a TOML string.
    #[cfg(feature = "config")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validated()
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "config")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validated()
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "config")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Check every field. An empty list means the config is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.locale.trim().is_empty() {
            errors.push("locale must not be empty".into());
        } else if !self
            .locale
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            errors.push(format!(
                "locale must be a language tag like \"en\" or \"pt-BR\", got {:?}",
                self.locale
            ));
        }

        errors
    }

    /// `self` if valid, otherwise the validation errors.
    pub fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

/// Errors that can occur when loading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "config")]
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[cfg(feature = "config")]
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("validation errors: {}", .0.join("; "))]
    Validation(Vec<String>),
}
