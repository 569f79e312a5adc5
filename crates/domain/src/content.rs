use serde::{Deserialize, Serialize};

use crate::{CachedPlayData, PlaybackRecord};

/// An on-demand story from the content platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnDemandVideo {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub publish_date: Option<String>,
    pub credit: Option<String>,
}

/// A live event discovered on the content platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveEvent {
    pub id: String,
    pub title: Option<String>,
    pub blurb: Option<String>,
    pub image_url: Option<String>,
    pub start_date: Option<String>,
}

/// Anything a list or detail screen can show, whatever its origin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentItem {
    OnDemand(OnDemandVideo),
    Live(LiveEvent),
    Cached(PlaybackRecord),
}

impl ContentItem {
    pub fn id(&self) -> &str {
        match self {
            ContentItem::OnDemand(video) => &video.id,
            ContentItem::Live(event) => &event.id,
            ContentItem::Cached(record) => &record.id,
        }
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            ContentItem::OnDemand(video) => video.title.as_deref(),
            ContentItem::Live(event) => event.title.as_deref(),
            ContentItem::Cached(record) => record.title.as_deref(),
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            ContentItem::OnDemand(video) => video.description.as_deref(),
            ContentItem::Live(event) => event.blurb.as_deref(),
            ContentItem::Cached(record) => record.description.as_deref(),
        }
    }

    pub fn image_url(&self) -> Option<&str> {
        match self {
            ContentItem::OnDemand(video) => video.image_url.as_deref(),
            ContentItem::Live(event) => event.image_url.as_deref(),
            ContentItem::Cached(record) => record.image_url.as_deref(),
        }
    }

    pub fn publish_date(&self) -> Option<&str> {
        match self {
            ContentItem::OnDemand(video) => video.publish_date.as_deref(),
            ContentItem::Live(event) => event.start_date.as_deref(),
            ContentItem::Cached(record) => record.publish_date.as_deref(),
        }
    }

    /// Live events have no credited owner
    pub fn credit(&self) -> Option<&str> {
        match self {
            ContentItem::OnDemand(video) => video.credit.as_deref(),
            ContentItem::Live(_) => None,
            ContentItem::Cached(record) => record.credit.as_deref(),
        }
    }

    pub fn is_live_video(&self) -> bool {
        match self {
            ContentItem::OnDemand(_) => false,
            ContentItem::Live(_) => true,
            ContentItem::Cached(record) => record.is_live_video,
        }
    }

    /// Only items read back from the cache carry play data; remote items
    /// are looked up in the store by id instead.
    pub fn cached_play_data(&self) -> Option<CachedPlayData> {
        match self {
            ContentItem::Cached(record) => record.cached_play_data(),
            ContentItem::OnDemand(_) | ContentItem::Live(_) => None,
        }
    }
}

impl From<PlaybackRecord> for ContentItem {
    fn from(record: PlaybackRecord) -> Self {
        ContentItem::Cached(record)
    }
}
