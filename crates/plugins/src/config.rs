//! Host-level settings shared by all plugins.

use std::env;
use std::time::Duration;

/// Environment variable to disable all plugin dispatch.
pub const ENV_PLUGINS_DISABLED: &str = "PLUGINS_DISABLED";

/// Default Segment tracking endpoint.
pub const DEFAULT_SEGMENT_ENDPOINT: &str = "https://api.segment.io/v1/track";

/// Plugin runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Absolute URL prefix of the error-tracking web UI.
    pub url_prefix: String,
    /// Segment tracking endpoint.
    pub segment_endpoint: String,
    /// Timeout applied to every outbound request.
    pub http_timeout: Duration,
    /// Whether plugin dispatch is turned off entirely.
    pub disabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            url_prefix: env::var("SYSTEM_URL_PREFIX")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "http://localhost:9000".to_string()),
            segment_endpoint: env::var("SEGMENT_ENDPOINT")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SEGMENT_ENDPOINT.to_string()),
            http_timeout: Duration::from_secs(
                env::var("PLUGINS_HTTP_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            disabled: env::var(ENV_PLUGINS_DISABLED)
                .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
                .unwrap_or(false),
        }
    }
}

impl Settings {
    /// Load settings from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default()
    }
}
