#![forbid(unsafe_code)]

//! Coordinator configuration.
//!
//! [`ReconcileConfig`] is plain data with builder-style setters. With the
//! `policy-config` feature it can also be loaded from TOML or JSON:
//!
//! ```toml
//! animation = "fade"
//! empty_sections = "hide"
//! max_coalesced_cycles = 4
//! trace_change_sets = true
//! ```
//!
//! Missing keys fall back to [`ReconcileConfig::default`]; unknown keys are
//! rejected.

use std::fmt;

use crate::surface::RowAnimation;

/// How sections without rows are displayed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "policy-config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "policy-config", serde(rename_all = "snake_case"))]
pub enum EmptySectionPolicy {
    /// Empty sections stay in the snapshot.
    #[default]
    Show,
    /// Empty sections are left out of the snapshot.
    Hide,
    /// Empty sections are left out and the remaining sections are ordered by
    /// the registry's section comparator.
    HideAndSort,
}

impl EmptySectionPolicy {
    #[must_use]
    pub const fn hides_empty(self) -> bool {
        !matches!(self, Self::Show)
    }

    #[must_use]
    pub const fn sorts(self) -> bool {
        matches!(self, Self::HideAndSort)
    }
}

/// Errors from validating or loading a [`ReconcileConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "policy-config")]
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[cfg(feature = "policy-config")]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {message}")]
    Invalid { message: String },
}

impl ConfigError {
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}

/// Knobs for the refresh coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "policy-config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "policy-config", serde(default, deny_unknown_fields))]
pub struct ReconcileConfig {
    /// Animation passed to the surface with every batch.
    pub animation: RowAnimation,
    /// Display policy for sections without rows.
    pub empty_sections: EmptySectionPolicy,
    /// Upper bound on back-to-back cycles run for requests that arrive while
    /// a cycle is in flight. Must be at least 1.
    pub max_coalesced_cycles: u32,
    /// Log every applied change-set at debug level.
    pub trace_change_sets: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            animation: RowAnimation::Automatic,
            empty_sections: EmptySectionPolicy::Show,
            max_coalesced_cycles: 8,
            trace_change_sets: false,
        }
    }
}

impl ReconcileConfig {
    #[must_use]
    pub fn with_animation(mut self, animation: RowAnimation) -> Self {
        self.animation = animation;
        self
    }

    #[must_use]
    pub fn with_empty_sections(mut self, policy: EmptySectionPolicy) -> Self {
        self.empty_sections = policy;
        self
    }

    #[must_use]
    pub fn with_max_coalesced_cycles(mut self, cycles: u32) -> Self {
        self.max_coalesced_cycles = cycles;
        self
    }

    #[must_use]
    pub fn with_trace_change_sets(mut self, enabled: bool) -> Self {
        self.trace_change_sets = enabled;
        self
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_coalesced_cycles == 0 {
            return Err(ConfigError::invalid("max_coalesced_cycles must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(feature = "policy-config")]
impl ReconcileConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file; `.json` files are parsed as JSON, anything else as
    /// TOML.
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&text)
        } else {
            Self::from_toml_str(&text)
        }
    }
}

impl fmt::Display for ReconcileConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "animation={:?} empty_sections={:?} max_coalesced_cycles={} trace_change_sets={}",
            self.animation, self.empty_sections, self.max_coalesced_cycles, self.trace_change_sets
        )
    }
}
