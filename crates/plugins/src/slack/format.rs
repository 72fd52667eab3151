//! Attachment formatting for Slack notifications.

use serde::Serialize;

use crate::events::{ErrorEvent, Level, NotificationRule};
use crate::urls::UrlBuilder;

use super::options::SlackOptions;

/// Level whose color is used when an event has no recognized `level` tag.
pub const FALLBACK_LEVEL: Level = Level::Error;

/// Prefix the host adds to its own tag keys.
const STANDARD_TAG_PREFIX: &str = "sentry:";

/// Attachment color for an event, `#` included.
#[must_use]
pub fn color_for_event(event: &ErrorEvent) -> String {
    format!("#{}", event.level().unwrap_or(FALLBACK_LEVEL).color())
}

/// Build the attachment shared by every destination of a notification.
#[must_use]
pub fn format_attachment(
    event: &ErrorEvent,
    rules: &[NotificationRule],
    options: &SlackOptions,
    urls: &dyn UrlBuilder,
) -> Attachment {
    let title = event.title();
    let project_name = &event.project.name;

    let mut fields = vec![];

    // No culprit field when it would only repeat the title.
    if let Some(culprit) = event.culprit.as_deref().filter(|c| !c.is_empty() && *c != title) {
        fields.push(AttachmentField::long("Culprit", culprit));
    }

    fields.push(AttachmentField::short("Project", project_name));

    if options.include_rules && !rules.is_empty() {
        let triggered_by = rules
            .iter()
            .map(|rule| format!("<{} | {}>", urls.rule_url(&event.project, rule), rule.label))
            .collect::<Vec<_>>()
            .join(", ");
        fields.push(AttachmentField::long("Triggered By", triggered_by));
    }

    if options.include_tags {
        fields.extend(tag_fields(event, options));
    }

    Attachment {
        fallback: format!("[{project_name}] {title}"),
        title: title.to_string(),
        title_link: urls.event_url(event),
        color: color_for_event(event),
        fields,
    }
}

/// One short field per event tag that passes the include/exclude lists.
fn tag_fields(event: &ErrorEvent, options: &SlackOptions) -> Vec<AttachmentField> {
    let included = &options.included_tag_keys;
    let excluded = &options.excluded_tag_keys;

    event
        .tags
        .iter()
        .filter(|(key, _)| {
            let key = key.to_lowercase();
            let std_key = key.strip_prefix(STANDARD_TAG_PREFIX).unwrap_or(&key);

            if !included.is_empty() && !included.contains(&key) && !included.contains(std_key) {
                return false;
            }
            !(excluded.contains(&key) || excluded.contains(std_key))
        })
        .map(|(key, value)| AttachmentField::short(key, value))
        .collect()
}

// =============================================================================
// Slack API types
// =============================================================================

/// Legacy message attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub fallback: String,
    pub title: String,
    pub title_link: String,
    pub color: String,
    pub fields: Vec<AttachmentField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentField {
    pub title: String,
    pub value: String,
    pub short: bool,
}

impl AttachmentField {
    fn short(title: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            value: value.into(),
            short: true,
        }
    }

    fn long(title: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            value: value.into(),
            short: false,
        }
    }
}
