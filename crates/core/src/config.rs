//! Editor runtime configuration.
//!
//! This module defines configuration that is resolved once at startup and then passed into the
//! synchronisation controller as an `Arc<EditorConfig>`. The core never reads environment
//! variables; binaries decide where configuration comes from (defaults or a YAML file).

use crate::constants::{DEFAULT_COUNTRY, DEFAULT_RESOURCE_ID};
use crate::{EditorError, EditorResult};
use serde::Deserialize;

/// Editor configuration resolved at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditorConfig {
    resource_id: String,
    default_country: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            resource_id: DEFAULT_RESOURCE_ID.to_string(),
            default_country: DEFAULT_COUNTRY.to_string(),
        }
    }
}

/// On-disk shape of the configuration file. Every key is optional.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct EditorConfigFile {
    resource_id: String,
    default_country: String,
}

impl Default for EditorConfigFile {
    fn default() -> Self {
        let defaults = EditorConfig::default();
        Self {
            resource_id: defaults.resource_id,
            default_country: defaults.default_country,
        }
    }
}

impl EditorConfig {
    /// Create a new `EditorConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::InvalidConfig`] if either value is empty or whitespace.
    pub fn new(resource_id: String, default_country: String) -> EditorResult<Self> {
        validate_non_empty("resource_id", &resource_id)?;
        validate_non_empty("default_country", &default_country)?;

        Ok(Self {
            resource_id: resource_id.trim().to_string(),
            default_country: default_country.trim().to_string(),
        })
    }

    /// Parse configuration from YAML text, filling missing keys with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`EditorError::ConfigYaml`] for malformed YAML or unknown keys, and
    /// [`EditorError::InvalidConfig`] for empty values.
    pub fn from_yaml_str(yaml_text: &str) -> EditorResult<Self> {
        if yaml_text.trim().is_empty() {
            return Ok(Self::default());
        }
        let file: EditorConfigFile = serde_yaml::from_str(yaml_text)?;
        Self::new(file.resource_id, file.default_country)
    }

    /// Resource id written when the prior document has none.
    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    /// Country pre-filled into the permanent address field.
    pub fn default_country(&self) -> &str {
        &self.default_country
    }
}

fn validate_non_empty(name: &str, value: &str) -> EditorResult<()> {
    if value.trim().is_empty() {
        return Err(EditorError::InvalidConfig(format!("{name} cannot be empty")));
    }
    Ok(())
}
