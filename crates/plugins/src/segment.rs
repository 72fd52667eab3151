//! Segment plugin: forwards identified error events as `track` calls.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::SecondsFormat;
use serde::Serialize;
use sha1::{Digest, Sha1};
use tracing::debug;

use crate::error::PluginError;
use crate::events::{ErrorEvent, Project};
use crate::http::log_response;
use crate::options::{ConfigField, ConfigStore, FieldKind};
use crate::ratelimit::RateLimiter;
use crate::Plugin;

/// Option namespace.
pub const SLUG: &str = "segment";

/// Event name sent to Segment.
pub const EVENT_NAME: &str = "Error Captured";

/// Requests allowed per write key per [`RATE_LIMIT_WINDOW`].
pub const RATE_LIMIT: u32 = 50;

/// Rate-limit window.
pub const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(1);

/// Segment plugin.
pub struct SegmentPlugin {
    endpoint: String,
    client: reqwest::Client,
    options: Arc<dyn ConfigStore>,
    limiter: Arc<dyn RateLimiter>,
}

impl SegmentPlugin {
    /// Create a Segment plugin posting to `endpoint`.
    #[must_use]
    pub fn new(
        endpoint: impl Into<String>,
        client: reqwest::Client,
        options: Arc<dyn ConfigStore>,
        limiter: Arc<dyn RateLimiter>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            client,
            options,
            limiter,
        }
    }

    /// The write key exactly as stored. Blank keys count as unset.
    fn write_key(&self, project: &Project) -> Option<String> {
        self.options
            .get_option(SLUG, "write_key", project)
            .map(|value| value.as_text())
            .filter(|key| !key.trim().is_empty())
    }

    /// Build the `track` payload for an event, or `None` for anonymous events.
    #[must_use]
    pub fn build_payload(event: &ErrorEvent) -> Option<TrackPayload> {
        let user_id = event.user_id()?;

        Some(TrackPayload {
            user_id: user_id.to_string(),
            event: EVENT_NAME,
            properties: TrackProperties {
                event_id: event.event_id.clone(),
            },
            timestamp: event.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
            integration: Integration {
                name: "sentry",
                version: env!("CARGO_PKG_VERSION"),
            },
        })
    }
}

/// Rate-limit key for a write key. Never contains the key itself.
#[must_use]
pub fn rate_limit_key(write_key: &str) -> String {
    let digest = Sha1::digest(write_key.as_bytes());
    format!("{SLUG}:{}", hex::encode(digest))
}

#[async_trait]
impl Plugin for SegmentPlugin {
    fn slug(&self) -> &'static str {
        SLUG
    }

    fn title(&self) -> &'static str {
        "Segment"
    }

    fn description(&self) -> &'static str {
        "Send error events into Segment."
    }

    fn config_fields(&self) -> Vec<ConfigField> {
        vec![ConfigField::new("write_key", "Write Key", FieldKind::Secret).required()]
    }

    fn is_configured(&self, project: &Project) -> bool {
        self.write_key(project).is_some()
    }

    async fn post_process(&self, event: &ErrorEvent) -> Result<(), PluginError> {
        // Anonymous events carry little value as analytics.
        let Some(payload) = Self::build_payload(event) else {
            debug!(plugin = SLUG, event_id = %event.event_id, "No user id, skipping");
            return Ok(());
        };

        let Some(write_key) = self.write_key(&event.project) else {
            debug!(plugin = SLUG, project = %event.project.slug, "No write key, skipping");
            return Ok(());
        };

        if self
            .limiter
            .is_limited(&rate_limit_key(&write_key), RATE_LIMIT, RATE_LIMIT_WINDOW)
            .await
        {
            debug!(plugin = SLUG, project = %event.project.slug, "Rate limited, dropping event");
            return Ok(());
        }

        debug!(plugin = SLUG, event_id = %event.event_id, "Sending track call");

        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&write_key, Some(""))
            .json(&payload)
            .send()
            .await?;

        log_response(SLUG, response).await;
        Ok(())
    }
}

// =============================================================================
// Segment API types
// =============================================================================

/// Body of a Segment `track` call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackPayload {
    pub user_id: String,
    pub event: &'static str,
    pub properties: TrackProperties,
    pub timestamp: String,
    pub integration: Integration,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackProperties {
    pub event_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Integration {
    pub name: &'static str,
    pub version: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{fixtures, EventUser};
    use chrono::TimeZone;

    #[test]
    fn test_anonymous_event_has_no_payload() {
        let event = fixtures::event(&[]);
        assert!(SegmentPlugin::build_payload(&event).is_none());
    }

    #[test]
    fn test_payload_shape() {
        let mut event = fixtures::event(&[]);
        event.user = Some(EventUser {
            id: Some("user-1".to_string()),
        });
        event.timestamp = chrono::Utc.with_ymd_and_hms(2016, 3, 1, 12, 30, 5).unwrap();

        let payload = SegmentPlugin::build_payload(&event).unwrap();
        let value = serde_json::to_value(&payload).unwrap();

        assert_eq!(
            value,
            serde_json::json!({
                "userId": "user-1",
                "event": "Error Captured",
                "properties": { "eventId": "a1b2c3" },
                "timestamp": "2016-03-01T12:30:05.000000Z",
                "integration": {
                    "name": "sentry",
                    "version": env!("CARGO_PKG_VERSION"),
                },
            })
        );
    }

    #[test]
    fn test_timestamp_keeps_subseconds() {
        let mut event = fixtures::event(&[]);
        event.user = Some(EventUser {
            id: Some("user-1".to_string()),
        });
        event.timestamp = chrono::Utc
            .with_ymd_and_hms(2016, 3, 1, 12, 30, 5)
            .unwrap()
            + chrono::Duration::microseconds(250);

        let payload = SegmentPlugin::build_payload(&event).unwrap();
        assert_eq!(payload.timestamp, "2016-03-01T12:30:05.000250Z");

        event.timestamp = chrono::Utc
            .with_ymd_and_hms(2016, 3, 1, 12, 30, 5)
            .unwrap()
            + chrono::Duration::milliseconds(250);

        let payload = SegmentPlugin::build_payload(&event).unwrap();
        assert_eq!(payload.timestamp, "2016-03-01T12:30:05.250000Z");
    }

    #[test]
    fn test_rate_limit_key_hides_write_key() {
        let key = rate_limit_key("my-secret-write-key");
        assert!(key.starts_with("segment:"));
        assert!(!key.contains("my-secret-write-key"));
        assert_eq!(key.len(), "segment:".len() + 40);
        assert_eq!(key, rate_limit_key("my-secret-write-key"));
    }
}
