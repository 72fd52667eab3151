//! Tag-based channel routing.
//!
//! When sorting is enabled, the value of one event tag selects which of a
//! fixed, ordered list of groups receive the message. Every matching group
//! gets its own delivery, in group order. Matches are not deduplicated: two
//! groups pointing at the same channel produce two posts.

use crate::events::ErrorEvent;

use super::options::SlackOptions;

/// Number of tag groups a project can configure.
pub const GROUP_COUNT: usize = 3;

/// Where one copy of a message goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// The project's default channel, or the webhook's own default when none
    /// is configured.
    Default,
    /// An explicit channel or `@user`.
    Channel(String),
}

impl Destination {
    /// The `channel` value to put in the payload, if any.
    #[must_use]
    pub fn channel<'a>(&'a self, default_channel: Option<&'a str>) -> Option<&'a str> {
        match self {
            Self::Default => default_channel,
            Self::Channel(channel) => Some(channel),
        }
    }
}

/// One `(trigger values, channel)` pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagGroup {
    pub values: Vec<String>,
    pub channel: Option<String>,
}

impl TagGroup {
    /// Build a group from its comma-separated value list and channel.
    #[must_use]
    pub fn parse(values: Option<&str>, channel: Option<String>) -> Self {
        let values = values
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(ToString::to_string)
            .collect();
        let channel = channel
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        Self { values, channel }
    }

    /// The group's channel if `tag_value` triggers it.
    fn route(&self, tag_value: &str) -> Option<&str> {
        let channel = self.channel.as_deref()?;
        self.values
            .iter()
            .any(|v| v == tag_value)
            .then_some(channel)
    }
}

/// Sorting configuration; present only when sorting is enabled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortConfig {
    /// Tag whose value selects the groups.
    pub tag_key: String,
    pub groups: [TagGroup; GROUP_COUNT],
    /// Also deliver to the default destination when a group matched.
    pub send_to_root_too: bool,
}

/// Resolve the destinations for an event.
///
/// Never returns an empty list: anything that does not route to a group
/// goes to [`Destination::Default`].
#[must_use]
pub fn resolve_channels(event: &ErrorEvent, options: &SlackOptions) -> Vec<Destination> {
    let Some(sorting) = options.sorting.as_ref() else {
        return vec![Destination::Default];
    };

    let Some(tag_value) = event.get_tag(&sorting.tag_key) else {
        return vec![Destination::Default];
    };

    let matched: Vec<Destination> = sorting
        .groups
        .iter()
        .filter_map(|group| group.route(tag_value))
        .map(|channel| Destination::Channel(channel.to_string()))
        .collect();

    if matched.is_empty() {
        return vec![Destination::Default];
    }

    if sorting.send_to_root_too {
        let mut destinations = Vec::with_capacity(matched.len() + 1);
        destinations.push(Destination::Default);
        destinations.extend(matched);
        destinations
    } else {
        matched
    }
}
