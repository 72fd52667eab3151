//! The plugin interface the host dispatches through.

use async_trait::async_trait;

use crate::error::PluginError;
use crate::events::{ErrorEvent, Notification, Project};
use crate::options::ConfigField;

/// Trait for integration plugins (Segment, Slack, etc.).
///
/// Hooks default to doing nothing so a plugin only implements the ones it
/// reacts to.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Stable identifier, also the option namespace.
    fn slug(&self) -> &'static str;

    /// Human-readable name.
    fn title(&self) -> &'static str;

    /// One-line description.
    fn description(&self) -> &'static str;

    /// Options this plugin reads.
    fn config_fields(&self) -> Vec<ConfigField>;

    /// Whether the project has enough options set for `notify` to act.
    fn is_configured(&self, project: &Project) -> bool;

    /// Called for every processed event.
    async fn post_process(&self, _event: &ErrorEvent) -> Result<(), PluginError> {
        Ok(())
    }

    /// Called when an alert rule fires for an event.
    async fn notify(&self, _notification: &Notification) -> Result<(), PluginError> {
        Ok(())
    }
}
