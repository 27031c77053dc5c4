//! # World Configuration
//!
//! Sizing and recycling parameters for a [`World`](crate::World), loaded once
//! at startup (typically from a TOML file) and validated before use.
//!
//! ```toml
//! max_entities = 250000
//! initial_entities = 4096
//! initial_components = 1024
//! recycle = "fifo"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Order in which destroyed entity indices are handed out again.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecyclePolicy {
    /// Most recently freed index first. Keeps hot slots in cache.
    #[default]
    Lifo,
    /// Oldest freed index first. Maximizes the time before an index is reused.
    Fifo,
}

/// Configuration for a [`World`](crate::World).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorldConfig {
    /// Hard limit on entity slots. Reaching it is reported as
    /// [`EcsError::AllocatorExhausted`](crate::EcsError::AllocatorExhausted).
    pub max_entities: u32,
    /// Entity slots reserved up front.
    pub initial_entities: u32,
    /// Dense slots reserved up front in every component array.
    pub initial_components: usize,
    /// Free-list recycling order.
    pub recycle: RecyclePolicy,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            max_entities: 1_000_000,
            initial_entities: 1_024,
            initial_components: 256,
            recycle: RecyclePolicy::Lifo,
        }
    }
}

impl WorldConfig {
    /// Config sized for a fixed entity budget, everything reserved up front.
    ///
    /// Steady-state gameplay on such a world never reallocates the entity
    /// table.
    #[must_use]
    pub const fn preallocated(max_entities: u32) -> Self {
        Self {
            max_entities,
            initial_entities: max_entities,
            initial_components: 256,
            recycle: RecyclePolicy::Lifo,
        }
    }

    /// Parses and validates a config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys and
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise the
    /// same errors as [`WorldConfig::from_toml_str`].
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Checks the values for consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `max_entities` is zero or
    /// `u32::MAX` (reserved for the null handle), or if more entities are
    /// reserved than allowed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_entities == 0 {
            return Err(ConfigError::Invalid("max_entities must be greater than zero".into()));
        }
        if self.max_entities == u32::MAX {
            return Err(ConfigError::Invalid(
                "max_entities must be below u32::MAX (reserved for the null handle)".into(),
            ));
        }
        if self.initial_entities > self.max_entities {
            return Err(ConfigError::Invalid(format!(
                "initial_entities ({}) exceeds max_entities ({})",
                self.initial_entities, self.max_entities
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(WorldConfig::default().validate().is_ok());
        assert!(WorldConfig::preallocated(10).validate().is_ok());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = WorldConfig::from_toml_str("max_entities = 5000\nrecycle = \"fifo\"\n").unwrap();
        assert_eq!(config.max_entities, 5000);
        assert_eq!(config.recycle, RecyclePolicy::Fifo);
        assert_eq!(config.initial_entities, WorldConfig::default().initial_entities);
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = WorldConfig {
            max_entities: 64,
            initial_entities: 8,
            initial_components: 4,
            recycle: RecyclePolicy::Fifo,
        };
        let text = toml::to_string(&config).unwrap();
        assert_eq!(WorldConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(matches!(
            WorldConfig::from_toml_str("max_entities = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            WorldConfig::from_toml_str("max_entities = 10\ninitial_entities = 11"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            WorldConfig::from_toml_str("max_entity = 10"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = WorldConfig::from_toml_file("/nonexistent/tessera/world.toml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
