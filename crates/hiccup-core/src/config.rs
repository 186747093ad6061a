//! Engine configuration
//!
//! Every field has a default, so an empty TOML document or `{}` is a valid
//! configuration:
//!
//! ```toml
//! identity_attr = "_hiccup_id"
//! cycle_guard = "error"      # or "off"
//! default_exclusions = true
//! ```

use hiccup_xpath::is_valid_tag;
use serde::{Deserialize, Serialize};

use crate::errors::{HiccupError, Result};

/// Attribute that carries identity tokens unless configured otherwise
pub const DEFAULT_IDENTITY_ATTR: &str = "_hiccup_id";

/// What to do when an object is reached again below itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePolicy {
    /// Fail the projection with `CycleDetected`
    #[default]
    Error,
    /// No guard; a cyclic graph recurses until the stack is exhausted
    Off,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HiccupConfig {
    /// Attribute name used for identity tokens
    pub identity_attr: String,
    pub cycle_guard: CyclePolicy,
    /// Install the dunder-name and callable exclusion rules
    pub default_exclusions: bool,
}

impl Default for HiccupConfig {
    fn default() -> Self {
        Self {
            identity_attr: DEFAULT_IDENTITY_ATTR.to_string(),
            cycle_guard: CyclePolicy::Error,
            default_exclusions: true,
        }
    }
}

impl HiccupConfig {
    /// # Errors
    ///
    /// Returns `InvalidConfig` for malformed TOML, unknown keys or invalid values.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns `InvalidConfig` for malformed JSON, unknown keys or invalid values.
    pub fn from_json_str(source: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns `InvalidConfig` if the identity attribute is not a legal name.
    pub fn validate(&self) -> Result<()> {
        if !is_valid_tag(&self.identity_attr) {
            return Err(HiccupError::InvalidConfig {
                message: format!("identity_attr {:?} is not a valid name", self.identity_attr),
            });
        }
        Ok(())
    }
}
