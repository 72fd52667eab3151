//! Absolute links back into the error-tracking web UI.

use url::Url;

use crate::error::PluginError;
use crate::events::{ErrorEvent, NotificationRule, Project};

/// Builds absolute URLs for links embedded in outbound messages.
pub trait UrlBuilder: Send + Sync {
    /// URL of the event detail page.
    fn event_url(&self, event: &ErrorEvent) -> String;

    /// URL of the rule edit page.
    fn rule_url(&self, project: &Project, rule: &NotificationRule) -> String;
}

/// [`UrlBuilder`] rooted at the configured system URL prefix.
#[derive(Debug, Clone)]
pub struct AbsoluteUrlBuilder {
    base: Url,
}

impl AbsoluteUrlBuilder {
    /// Create a builder rooted at `url_prefix`.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Config`] if the prefix is not an absolute
    /// URL that can carry a path.
    pub fn new(url_prefix: &str) -> Result<Self, PluginError> {
        let base = Url::parse(url_prefix)
            .map_err(|e| PluginError::Config(format!("invalid URL prefix '{url_prefix}': {e}")))?;
        if base.cannot_be_a_base() {
            return Err(PluginError::Config(format!(
                "URL prefix '{url_prefix}' cannot carry a path"
            )));
        }
        Ok(Self { base })
    }

    /// Append percent-encoded segments plus a trailing slash to the prefix.
    fn build(&self, segments: &[&str]) -> String {
        let mut url = self.base.clone();
        // Only fails for cannot-be-a-base URLs, rejected in `new`.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments).push("");
        }
        url.into()
    }
}

impl UrlBuilder for AbsoluteUrlBuilder {
    fn event_url(&self, event: &ErrorEvent) -> String {
        let group_id = event.group_id.to_string();
        self.build(&[
            event.project.organization_slug.as_str(),
            event.project.slug.as_str(),
            "issues",
            group_id.as_str(),
            "events",
            event.event_id.as_str(),
        ])
    }

    fn rule_url(&self, project: &Project, rule: &NotificationRule) -> String {
        let rule_id = rule.id.to_string();
        self.build(&[
            project.organization_slug.as_str(),
            project.slug.as_str(),
            "settings",
            "alerts",
            "rules",
            rule_id.as_str(),
        ])
    }
}
