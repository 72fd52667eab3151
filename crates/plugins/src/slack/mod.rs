//! Slack plugin: posts rule notifications to an incoming webhook.
//!
//! A notification is formatted once into a single attachment, then posted
//! once per destination resolved by [`routing::resolve_channels`]. Posts go
//! out one after another in resolution order. The first transport failure
//! stops the remaining posts; posts already delivered are not undone.

pub mod format;
pub mod options;
pub mod routing;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::PluginError;
use crate::events::{Notification, Project};
use crate::http::log_response;
use crate::options::{ConfigField, ConfigStore};
use crate::urls::UrlBuilder;
use crate::Plugin;

pub use format::{format_attachment, Attachment, AttachmentField};
pub use options::SlackOptions;
pub use routing::{resolve_channels, Destination, SortConfig, TagGroup};

/// Option namespace.
pub const SLUG: &str = "slack";

/// Slack webhook plugin.
pub struct SlackPlugin {
    client: reqwest::Client,
    options: Arc<dyn ConfigStore>,
    urls: Arc<dyn UrlBuilder>,
}

impl SlackPlugin {
    /// Create a Slack plugin; `urls` roots the links in each attachment.
    #[must_use]
    pub fn new(
        client: reqwest::Client,
        options: Arc<dyn ConfigStore>,
        urls: Arc<dyn UrlBuilder>,
    ) -> Self {
        Self {
            client,
            options,
            urls,
        }
    }

    /// Build the webhook payload for every destination of a notification.
    #[must_use]
    pub fn build_payloads(
        notification: &Notification,
        options: &SlackOptions,
        urls: &dyn UrlBuilder,
    ) -> Vec<SlackPayload> {
        let event = &notification.event;
        let attachment = format_attachment(event, &notification.rules, options, urls);

        resolve_channels(event, options)
            .iter()
            .map(|destination| SlackPayload {
                channel: destination
                    .channel(options.channel.as_deref())
                    .map(ToString::to_string),
                parse: "none",
                username: options.username.clone(),
                icon_url: options.icon_url.clone(),
                attachments: vec![attachment.clone()],
            })
            .collect()
    }

    async fn post(&self, webhook: &str, payload: &SlackPayload) -> Result<(), PluginError> {
        let body = serde_json::to_string(payload)?;

        debug!(
            plugin = SLUG,
            channel = payload.channel.as_deref().unwrap_or("<default>"),
            "Posting to webhook"
        );

        let response = self
            .client
            .post(webhook)
            .form(&[("payload", body)])
            .send()
            .await?;

        log_response(SLUG, response).await;
        Ok(())
    }
}

#[async_trait]
impl Plugin for SlackPlugin {
    fn slug(&self) -> &'static str {
        SLUG
    }

    fn title(&self) -> &'static str {
        "Slack"
    }

    fn description(&self) -> &'static str {
        "Post notifications to a Slack channel."
    }

    fn config_fields(&self) -> Vec<ConfigField> {
        options::config_fields()
    }

    fn is_configured(&self, project: &Project) -> bool {
        self.options.get_text(SLUG, "webhook", project).is_some()
    }

    async fn notify(&self, notification: &Notification) -> Result<(), PluginError> {
        let project = &notification.event.project;

        let Some(options) = SlackOptions::load(self.options.as_ref(), project) else {
            debug!(plugin = SLUG, project = %project.slug, "No webhook, skipping");
            return Ok(());
        };

        let payloads = Self::build_payloads(notification, &options, self.urls.as_ref());

        info!(
            plugin = SLUG,
            event_id = %notification.event.event_id,
            destinations = payloads.len(),
            "Sending notification"
        );

        for payload in &payloads {
            self.post(&options.webhook, payload).await?;
        }

        Ok(())
    }
}

// =============================================================================
// Slack API types
// =============================================================================

/// Incoming-webhook message body, sent form-encoded as `payload=<json>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlackPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    pub parse: &'static str,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    pub attachments: Vec<Attachment>,
}
