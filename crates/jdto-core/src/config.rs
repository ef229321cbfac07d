//! # Engine Configuration
//!
//! [`BindOptions`] carries the per-schema policies the engine needs to fix at
//! construction time: how optional fields equal to their default are written,
//! where and under which key tagged unions put their discriminator, and how
//! deep reads may nest.
//!
//! Options are plain data and load from YAML or JSON:
//!
//! ```yaml
//! default_write_policy: "null"
//! discriminator_key: kind
//! discriminator_position: last
//! max_depth: 64
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, SetupError};
use crate::path::DEFAULT_MAX_DEPTH;

/// How an optional field whose value equals its default is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultWritePolicy {
    /// Leave the key out of the output object.
    #[default]
    Omit,
    /// Write the key with an explicit `null`.
    Null,
    /// Write the default value like any other value.
    Value,
}

/// Where a tagged union writes its discriminator relative to the variant's
/// own fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscriminatorPosition {
    /// Before every variant field.
    #[default]
    First,
    /// After every variant field.
    Last,
}

/// Construction-time options for schemas and tagged unions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BindOptions {
    /// Write policy for optional fields equal to their default.
    pub default_write_policy: DefaultWritePolicy,
    /// Discriminator key used by tagged unions.
    pub discriminator_key: String,
    /// Discriminator placement used by tagged unions.
    pub discriminator_position: DiscriminatorPosition,
    /// Maximum nesting depth accepted on read.
    pub max_depth: usize,
}

impl Default for BindOptions {
    fn default() -> Self {
        Self {
            default_write_policy: DefaultWritePolicy::Omit,
            discriminator_key: "type".to_string(),
            discriminator_position: DiscriminatorPosition::First,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl BindOptions {
    /// Parse and check options from YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let options: Self = serde_yaml::from_str(text)?;
        options.check()?;
        Ok(options)
    }

    /// Parse and check options from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let options: Self = serde_json::from_str(text)?;
        options.check()?;
        Ok(options)
    }

    /// Reject inconsistent options.
    pub fn check(&self) -> Result<(), SetupError> {
        if self.discriminator_key.is_empty() {
            return Err(SetupError::InvalidOptions(
                "discriminator_key must not be empty".to_string(),
            ));
        }
        if self.max_depth == 0 {
            return Err(SetupError::InvalidOptions(
                "max_depth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
