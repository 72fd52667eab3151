//! Typed view of a project's Slack options.

use std::collections::HashSet;

use crate::events::Project;
use crate::options::{ConfigField, ConfigStore, FieldKind};

use super::routing::{SortConfig, TagGroup, GROUP_COUNT};
use super::SLUG;

/// Bot name used when `username` is unset.
pub const DEFAULT_USERNAME: &str = "Sentry";

/// Slack options, read fresh for every notification.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct SlackOptions {
    pub webhook: String,
    pub username: String,
    pub icon_url: Option<String>,
    /// Default destination channel; `None` leaves it to the webhook.
    pub channel: Option<String>,
    pub include_tags: bool,
    pub included_tag_keys: HashSet<String>,
    pub excluded_tag_keys: HashSet<String>,
    pub include_rules: bool,
    /// Present only when `sort_on_tag` is on and a tag key is set.
    pub sorting: Option<SortConfig>,
}

impl SlackOptions {
    /// Options with only a webhook set.
    #[must_use]
    pub fn new(webhook: impl Into<String>) -> Self {
        Self {
            webhook: webhook.into(),
            username: DEFAULT_USERNAME.to_string(),
            icon_url: None,
            channel: None,
            include_tags: false,
            included_tag_keys: HashSet::new(),
            excluded_tag_keys: HashSet::new(),
            include_rules: false,
            sorting: None,
        }
    }

    /// Read the project's options. `None` when no webhook is configured.
    #[must_use]
    pub fn load(store: &dyn ConfigStore, project: &Project) -> Option<Self> {
        let text = |key: &str| store.get_text(SLUG, key, project);
        let flag = |key: &str| store.get_bool(SLUG, key, project);

        let webhook = text("webhook")?;

        let sorting = if flag("sort_on_tag") {
            text("sort_on_tag_key").map(|tag_key| SortConfig {
                tag_key,
                groups: std::array::from_fn(|i| {
                    let n = i + 1;
                    TagGroup::parse(
                        text(&format!("group_{n}_tag_values")).as_deref(),
                        text(&format!("group_{n}_channel")),
                    )
                }),
                send_to_root_too: flag("send_to_root_too"),
            })
        } else {
            None
        };

        Some(Self {
            webhook,
            username: text("username").unwrap_or_else(|| DEFAULT_USERNAME.to_string()),
            icon_url: text("icon_url"),
            channel: text("channel"),
            include_tags: flag("include_tags"),
            included_tag_keys: parse_key_list(text("included_tag_keys").as_deref()),
            excluded_tag_keys: parse_key_list(text("excluded_tag_keys").as_deref()),
            include_rules: flag("include_rules"),
            sorting,
        })
    }
}

/// Parse a comma-separated tag key list into lower-cased keys.
fn parse_key_list(value: Option<&str>) -> HashSet<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

/// Options the Slack plugin reads.
pub(super) fn config_fields() -> Vec<ConfigField> {
    let mut fields = vec![
        ConfigField::new("webhook", "Webhook URL", FieldKind::Url)
            .required()
            .placeholder("e.g. https://hooks.slack.com/services/000000000/000000000/00000000000000000")
            .help("Your custom Slack webhook URL."),
        ConfigField::new("username", "Bot Name", FieldKind::Text)
            .placeholder("e.g. Sentry")
            .help("The name used when publishing messages."),
        ConfigField::new("icon_url", "Icon URL", FieldKind::Url)
            .help("The url of the icon to appear beside your bot (32px png), leave empty for none."),
        ConfigField::new("channel", "Destination", FieldKind::Text)
            .placeholder("e.g. #engineering")
            .help("Optional #channel name or @user"),
        ConfigField::new("include_tags", "Include Tags", FieldKind::Bool)
            .help("Include tags with notifications"),
        ConfigField::new("included_tag_keys", "Included Tags", FieldKind::Text)
            .help("Only include these tags (comma separated list). Leave empty to include all."),
        ConfigField::new("excluded_tag_keys", "Excluded Tags", FieldKind::Text)
            .help("Exclude these tags (comma separated list)."),
        ConfigField::new("include_rules", "Include Rules", FieldKind::Bool)
            .help("Include triggering rules with notifications."),
        ConfigField::new("sort_on_tag", "Sort on Tag", FieldKind::Bool)
            .help("Sort events into different channels or users"),
        ConfigField::new("send_to_root_too", "Send to Root too", FieldKind::Bool)
            .help("Always send the event to the main channel as well"),
        ConfigField::new("sort_on_tag_key", "Sort on Tag Key", FieldKind::Text)
            .help("Key name of the tag to sort on"),
    ];

    for n in 1..=GROUP_COUNT {
        fields.push(
            ConfigField::new(
                format!("group_{n}_tag_values"),
                format!("Group {n} Tag Values"),
                FieldKind::Text,
            )
            .help(format!("Group {n} tag values (comma separated list)")),
        );
        fields.push(
            ConfigField::new(
                format!("group_{n}_channel"),
                format!("Group {n} Channel"),
                FieldKind::Text,
            )
            .help(format!("Group {n} #channel name or @user")),
        );
    }

    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::fixtures;
    use crate::options::MemoryConfigStore;

    #[test]
    fn test_load_requires_webhook() {
        let store = MemoryConfigStore::new();
        assert!(SlackOptions::load(&store, &fixtures::project()).is_none());
    }

    #[test]
    fn test_load_defaults() {
        let project = fixtures::project();
        let store = MemoryConfigStore::new();
        store.set_option(SLUG, "webhook", " http://example.com/slack ", &project);

        let options = SlackOptions::load(&store, &project).unwrap();
        assert_eq!(options, SlackOptions::new("http://example.com/slack"));
    }

    #[test]
    fn test_load_sorting() {
        let project = fixtures::project();
        let store = MemoryConfigStore::new();
        store.set_option(SLUG, "webhook", "http://example.com/slack", &project);
        store.set_option(SLUG, "sort_on_tag", true, &project);
        store.set_option(SLUG, "sort_on_tag_key", "test_tag_key", &project);
        store.set_option(SLUG, "group_1_tag_values", "a,b,c", &project);
        store.set_option(SLUG, "group_1_channel", "#test_channel", &project);
        store.set_option(SLUG, "group_3_tag_values", "b", &project);
        store.set_option(SLUG, "group_3_channel", "#test_channel2", &project);

        let sorting = SlackOptions::load(&store, &project)
            .unwrap()
            .sorting
            .unwrap();
        assert_eq!(sorting.tag_key, "test_tag_key");
        assert_eq!(sorting.groups[0].values, vec!["a", "b", "c"]);
        assert_eq!(sorting.groups[1], TagGroup::default());
        assert_eq!(sorting.groups[2].channel.as_deref(), Some("#test_channel2"));
        assert!(!sorting.send_to_root_too);
    }

    #[test]
    fn test_sorting_needs_tag_key() {
        let project = fixtures::project();
        let store = MemoryConfigStore::new();
        store.set_option(SLUG, "webhook", "http://example.com/slack", &project);
        store.set_option(SLUG, "sort_on_tag", true, &project);
        store.set_option(SLUG, "group_1_tag_values", "a", &project);
        store.set_option(SLUG, "group_1_channel", "#a", &project);

        let options = SlackOptions::load(&store, &project).unwrap();
        assert!(options.sorting.is_none());
    }

    #[test]
    fn test_tag_key_lists_are_lowercased() {
        let project = fixtures::project();
        let store = MemoryConfigStore::new();
        store.set_option(SLUG, "webhook", "http://example.com/slack", &project);
        store.set_option(SLUG, "included_tag_keys", "Browser, OS ,,", &project);

        let options = SlackOptions::load(&store, &project).unwrap();
        assert_eq!(
            options.included_tag_keys,
            HashSet::from(["browser".to_string(), "os".to_string()])
        );
        assert!(options.excluded_tag_keys.is_empty());
    }

    #[test]
    fn test_config_fields_cover_groups() {
        let names: Vec<String> = config_fields().into_iter().map(|f| f.name).collect();
        assert!(names.contains(&"group_3_channel".to_string()));
        assert_eq!(names.first().map(String::as_str), Some("webhook"));
    }
}
