#![forbid(unsafe_code)]

//! Loading model options from configuration files.
//!
//! JSON is always supported; TOML requires the `toml-config` feature.
//!
//! ```toml
//! use_dirty = true
//! exact_diff = false
//! drafting = "unavailable"
//!
//! [props]
//! label = "Email"
//! ```

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::capability::DraftSupport;
use crate::error::ConfigError;
use crate::props::ModelProps;

/// Serializable subset of [`ModelProps`] plus a capability override.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    pub use_dirty: Option<bool>,
    pub exact_diff: Option<bool>,
    /// Overrides capability detection when set.
    pub drafting: Option<DraftSupport>,
    /// Free-form props, available through [`ModelProps::get`].
    pub props: Map<String, Value>,
}

impl ModelConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    #[cfg(feature = "toml-config")]
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Props described by this config.
    #[must_use]
    pub fn to_props(&self) -> ModelProps {
        ModelProps {
            use_dirty: self.use_dirty,
            exact_diff: self.exact_diff,
            compute_state: None,
            extra: self.props.clone(),
        }
    }

    /// Capability to use: the configured override or the detected one.
    #[must_use]
    pub fn draft_support(&self) -> DraftSupport {
        self.drafting.unwrap_or_else(DraftSupport::detect)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        // Recognized options must not be smuggled in as free-form props.
        for (field, expected) in [("use_dirty", "a top-level boolean"), ("exact_diff", "a top-level boolean")] {
            if self.props.contains_key(field) {
                return Err(ConfigError::InvalidField { field, expected });
            }
        }
        Ok(())
    }
}
