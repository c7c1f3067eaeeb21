use crate::config::ChannelMap;
use crate::types::Category;

/// Maps a category to its destination channel.
#[derive(Debug, Clone)]
pub struct ChannelRouter {
    channels: ChannelMap,
}

impl ChannelRouter {
    pub fn new(channels: ChannelMap) -> Self {
        Self { channels }
    }

    /// Destination for `category`.
    ///
    /// Budget alerts always go to the health channel. Categories without a
    /// usable entry fall back to the `errors` channel; `None` means the
    /// webhook's own default channel.
    pub fn resolve(&self, category: Category) -> Option<String> {
        let routed = match category {
            Category::Budget => Category::Health,
            other => other,
        };
        non_blank(self.channels.get(routed))
            .or_else(|| non_blank(self.channels.errors.as_deref()))
            .map(str::to_string)
    }
}

fn non_blank(channel: Option<&str>) -> Option<&str> {
    channel.map(str::trim).filter(|c| !c.is_empty())
}
