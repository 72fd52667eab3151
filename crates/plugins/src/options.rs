//! Per-project plugin options.
//!
//! The host owns option storage. Plugins only read through [`ConfigStore`],
//! once per invocation, and never cache what they read.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::PluginError;
use crate::events::Project;

/// A stored option value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Text(String),
}

impl OptionValue {
    /// Interpret the value as text. Booleans render as `"true"`/`"false"`.
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Text(s) => s.clone(),
        }
    }

    /// Interpret the value as a flag. Text is truthy for `true`, `1`, `yes`, `on`.
    #[must_use]
    pub fn as_bool(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Text(s) => matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "true" | "1" | "yes" | "on"
            ),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Read access to per-project plugin options.
pub trait ConfigStore: Send + Sync {
    /// Get the raw option `key` of `plugin` for `project`.
    fn get_option(&self, plugin: &str, key: &str, project: &Project) -> Option<OptionValue>;

    /// Get an option as trimmed text. Blank values count as unset.
    fn get_text(&self, plugin: &str, key: &str, project: &Project) -> Option<String> {
        self.get_option(plugin, key, project)
            .map(|v| v.as_text().trim().to_string())
            .filter(|s| !s.is_empty())
    }

    /// Get an option as a flag. Unset counts as `false`.
    fn get_bool(&self, plugin: &str, key: &str, project: &Project) -> bool {
        self.get_option(plugin, key, project)
            .is_some_and(|v| v.as_bool())
    }
}

impl<T: ConfigStore + ?Sized> ConfigStore for Arc<T> {
    fn get_option(&self, plugin: &str, key: &str, project: &Project) -> Option<OptionValue> {
        (**self).get_option(plugin, key, project)
    }
}

/// Options keyed by project slug, then plugin slug, then option name.
type OptionTable = HashMap<String, HashMap<String, HashMap<String, OptionValue>>>;

/// In-memory option store.
///
/// Loads from TOML laid out as `[<project slug>.<plugin slug>]` tables:
///
/// ```toml
/// [backend.slack]
/// webhook = "https://hooks.slack.com/services/T000/B000/XXXX"
/// sort_on_tag = true
/// ```
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    options: RwLock<OptionTable>,
}

impl MemoryConfigStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a store from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Config`] if the document does not have the
    /// `[<project>.<plugin>]` shape.
    pub fn from_toml_str(input: &str) -> Result<Self, PluginError> {
        let options: OptionTable =
            toml::from_str(input).map_err(|e| PluginError::Config(e.to_string()))?;
        Ok(Self {
            options: RwLock::new(options),
        })
    }

    /// Set an option for a project.
    pub fn set_option(
        &self,
        plugin: &str,
        key: &str,
        value: impl Into<OptionValue>,
        project: &Project,
    ) {
        let mut options = self
            .options
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        options
            .entry(project.slug.clone())
            .or_default()
            .entry(plugin.to_string())
            .or_default()
            .insert(key.to_string(), value.into());
    }

    /// Remove an option for a project.
    pub fn unset_option(&self, plugin: &str, key: &str, project: &Project) {
        let mut options = self
            .options
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(plugin_options) = options
            .get_mut(&project.slug)
            .and_then(|p| p.get_mut(plugin))
        {
            plugin_options.remove(key);
        }
    }
}

impl ConfigStore for MemoryConfigStore {
    fn get_option(&self, plugin: &str, key: &str, project: &Project) -> Option<OptionValue> {
        let options = self
            .options
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        options
            .get(&project.slug)
            .and_then(|p| p.get(plugin))
            .and_then(|o| o.get(key))
            .cloned()
    }
}

/// Kind of a configuration field, used by hosts to render forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Url,
    Secret,
    Bool,
}

/// Description of one option a plugin reads.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigField {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

impl ConfigField {
    /// Create an optional field.
    #[must_use]
    pub fn new(name: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind,
            required: false,
            placeholder: None,
            help: None,
        }
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    #[must_use]
    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}
