//! Shared HTTP client construction.

use reqwest::Response;
use tracing::{debug, warn};

use crate::config::Settings;
use crate::error::PluginError;

/// User agent sent with every plugin request.
pub const USER_AGENT: &str = concat!("sentry-plugins/", env!("CARGO_PKG_VERSION"));

/// Build the client plugins share.
///
/// # Errors
///
/// Returns [`PluginError::Http`] if the TLS backend cannot be initialized.
pub fn build_client(settings: &Settings) -> Result<reqwest::Client, PluginError> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(settings.http_timeout)
        .build()?;
    Ok(client)
}

/// Log the outcome of a delivery. The response body is only read on failure.
pub(crate) async fn log_response(plugin: &'static str, response: Response) {
    let status = response.status();
    if status.is_success() {
        debug!(plugin, status = %status, "Delivery accepted");
    } else {
        let body = response.text().await.unwrap_or_default();
        warn!(
            plugin,
            status = %status,
            body = %body,
            "Delivery rejected by remote service"
        );
    }
}
