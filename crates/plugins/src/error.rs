//! Error types for the plugin system.

use thiserror::Error;

/// Errors that can occur while a plugin delivers to its external service.
///
/// Missing configuration or a missing user identity are not errors: plugins
/// treat those as a silent no-op and return `Ok(())`.
#[derive(Debug, Error)]
pub enum PluginError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid option or settings value
    #[error("Invalid configuration: {0}")]
    Config(String),
}
