//! Integration plugins for error-tracking events.
//!
//! This crate provides two adapters that hand captured errors to external
//! services:
//!
//! - [`SegmentPlugin`] forwards identified events to Segment as
//!   `Error Captured` track calls, rate limited per write key
//! - [`SlackPlugin`] posts alert-rule notifications to a Slack webhook,
//!   optionally routed to channels by tag value
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use sentry_plugins::{MemoryConfigStore, PluginRegistry, Settings};
//!
//! # async fn run(event: sentry_plugins::ErrorEvent) -> Result<(), sentry_plugins::PluginError> {
//! let options = Arc::new(MemoryConfigStore::new());
//! options.set_option("segment", "write_key", "wk_123", &event.project);
//!
//! let registry = PluginRegistry::from_settings(&Settings::from_env(), options)?;
//!
//! // Fire-and-forget: failures are logged, not returned
//! registry.post_process(event);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! Host settings come from environment variables (see [`Settings`]):
//!
//! - `SYSTEM_URL_PREFIX`: base URL used for links back to events
//! - `SEGMENT_ENDPOINT`: override the Segment track endpoint
//! - `PLUGINS_HTTP_TIMEOUT_SECS`: outbound request timeout
//! - `PLUGINS_DISABLED`: set to "true" to disable all plugins
//!
//! Per-project options live in a [`ConfigStore`], namespaced by plugin slug.
//!
//! # Architecture
//!
//! - [`Plugin`] trait defines the hooks the host calls
//! - [`ConfigStore`], [`RateLimiter`] and [`UrlBuilder`] are the host
//!   collaborators, injected at construction
//! - [`PluginRegistry`] dispatches events and notifications to plugins

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod events;
pub mod http;
pub mod options;
pub mod plugin;
pub mod ratelimit;
pub mod segment;
pub mod slack;
pub mod urls;

pub use config::Settings;
pub use error::PluginError;
pub use events::{ErrorEvent, EventUser, Level, Notification, NotificationRule, Project};
pub use options::{ConfigField, ConfigStore, FieldKind, MemoryConfigStore, OptionValue};
pub use plugin::Plugin;
pub use ratelimit::{FixedWindowRateLimiter, NoopRateLimiter, RateLimiter};
pub use segment::SegmentPlugin;
pub use slack::SlackPlugin;
pub use urls::{AbsoluteUrlBuilder, UrlBuilder};

use std::sync::Arc;
use tracing::{debug, error, info};

use config::ENV_PLUGINS_DISABLED;

/// Central plugin dispatcher.
///
/// The `PluginRegistry` holds the installed plugins and hands each processed
/// event and each fired notification to them.
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn Plugin>>,
    disabled: bool,
}

impl PluginRegistry {
    /// Create a registry with the Segment and Slack plugins.
    ///
    /// Both share one HTTP client; Segment gets an in-process
    /// [`FixedWindowRateLimiter`].
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Http`] if the HTTP client cannot be built, or
    /// [`PluginError::Config`] if the URL prefix is not a valid base URL.
    pub fn from_settings(
        settings: &Settings,
        options: Arc<dyn ConfigStore>,
    ) -> Result<Self, PluginError> {
        if settings.disabled {
            info!("Plugins disabled via {ENV_PLUGINS_DISABLED}");
            return Ok(Self::disabled());
        }

        let client = http::build_client(settings)?;
        let urls = AbsoluteUrlBuilder::new(&settings.url_prefix)?;

        let segment = SegmentPlugin::new(
            settings.segment_endpoint.clone(),
            client.clone(),
            Arc::clone(&options),
            Arc::new(FixedWindowRateLimiter::new()),
        );
        let slack = SlackPlugin::new(client, options, Arc::new(urls));

        let plugins: Vec<Arc<dyn Plugin>> = vec![Arc::new(segment), Arc::new(slack)];
        info!(plugin_count = plugins.len(), "Plugin registry initialized");

        Ok(Self::with_plugins(plugins))
    }

    /// Create a registry with specific plugins.
    #[must_use]
    pub fn with_plugins(plugins: Vec<Arc<dyn Plugin>>) -> Self {
        Self {
            plugins,
            disabled: false,
        }
    }

    /// Create a disabled registry (for testing or when plugins are off).
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            plugins: vec![],
            disabled: true,
        }
    }

    /// Number of active plugins.
    #[must_use]
    pub fn plugin_count(&self) -> usize {
        if self.disabled {
            0
        } else {
            self.plugins.len()
        }
    }

    /// Find a plugin by slug.
    #[must_use]
    pub fn get(&self, slug: &str) -> Option<Arc<dyn Plugin>> {
        self.plugins.iter().find(|p| p.slug() == slug).cloned()
    }

    /// Plugins a hook is dispatched to.
    ///
    /// Notifications only reach plugins configured for `project`; events go
    /// to every plugin, which checks its own options.
    fn targets(&self, hook: Hook, project: &Project) -> Vec<Arc<dyn Plugin>> {
        if self.disabled {
            return vec![];
        }

        self.plugins
            .iter()
            .filter(|plugin| {
                if hook == Hook::Notify && !plugin.is_configured(project) {
                    debug!(plugin = plugin.slug(), "Plugin not configured, skipping");
                    return false;
                }
                true
            })
            .cloned()
            .collect()
    }

    /// Hand an event to every plugin (fire-and-forget).
    ///
    /// Spawns one task per plugin and returns immediately. Errors are
    /// logged, not propagated.
    pub fn post_process(&self, event: ErrorEvent) {
        let targets = self.targets(Hook::PostProcess, &event.project);
        if targets.is_empty() {
            debug!("No active plugins, skipping event");
            return;
        }

        let event = Arc::new(event);

        for plugin in targets {
            let event = Arc::clone(&event);

            tokio::spawn(async move {
                let result = plugin.post_process(&event).await;
                Hook::PostProcess.report(plugin.as_ref(), &event, &result);
            });
        }
    }

    /// Hand a notification to every configured plugin (fire-and-forget).
    pub fn notify(&self, notification: Notification) {
        let targets = self.targets(Hook::Notify, &notification.event.project);
        if targets.is_empty() {
            debug!("No active plugins, skipping notification");
            return;
        }

        let notification = Arc::new(notification);

        for plugin in targets {
            let notification = Arc::clone(&notification);

            tokio::spawn(async move {
                let result = plugin.notify(&notification).await;
                Hook::Notify.report(plugin.as_ref(), &notification.event, &result);
            });
        }
    }

    /// Run every plugin's `post_process` in turn and collect the results.
    pub async fn post_process_and_wait(
        &self,
        event: &ErrorEvent,
    ) -> Vec<(&'static str, Result<(), PluginError>)> {
        let mut results = vec![];
        for plugin in self.targets(Hook::PostProcess, &event.project) {
            let result = plugin.post_process(event).await;
            Hook::PostProcess.report(plugin.as_ref(), event, &result);
            results.push((plugin.slug(), result));
        }
        results
    }

    /// Run every configured plugin's `notify` in turn and collect the results.
    pub async fn notify_and_wait(
        &self,
        notification: &Notification,
    ) -> Vec<(&'static str, Result<(), PluginError>)> {
        let mut results = vec![];
        for plugin in self.targets(Hook::Notify, &notification.event.project) {
            let result = plugin.notify(notification).await;
            Hook::Notify.report(plugin.as_ref(), &notification.event, &result);
            results.push((plugin.slug(), result));
        }
        results
    }
}

/// Plugin hook the registry dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Hook {
    PostProcess,
    Notify,
}

impl Hook {
    /// Log a failed hook call; successes are silent.
    fn report(self, plugin: &dyn Plugin, event: &ErrorEvent, result: &Result<(), PluginError>) {
        let Err(e) = result else {
            return;
        };
        let action = match self {
            Self::PostProcess => "process event",
            Self::Notify => "send notification",
        };
        error!(
            plugin = plugin.slug(),
            event_id = %event.event_id,
            error = %e,
            "Plugin failed to {action}"
        );
    }
}
