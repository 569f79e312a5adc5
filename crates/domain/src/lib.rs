use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod content;
mod playback;

pub use content::{ContentItem, LiveEvent, OnDemandVideo};
pub use playback::{PlaybackEvent, ResumeAction, format_time, resume_seek_target};

/// Cached playback progress for a single video
///
/// One record exists per video id. Display metadata is copied from the
/// content item at write time so cached rows can be rendered without a
/// round trip to the content platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackRecord {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub publish_date: Option<String>,
    pub credit: Option<String>,
    #[serde(default)]
    pub is_live_video: bool,
    /// Seconds into the video at the last pause
    pub resume_time: Option<f64>,
    /// Total duration in seconds, 0 when unknown
    pub length: Option<f64>,
    pub last_played_date: Option<DateTime<Utc>>,
}

/// The resume triple, only available once all three values are known
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedPlayData {
    pub last_played_date: DateTime<Utc>,
    pub resume_time: f64,
    pub length: f64,
}

/// Where a record stands relative to the end of its video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackProgress {
    /// Live, missing a resume time or length, or zero length
    NotResumable,
    NotStarted,
    InProgress,
    Completed,
}

impl PlaybackRecord {
    /// Create an empty record for `id` with no metadata or progress
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            description: None,
            image_url: None,
            publish_date: None,
            credit: None,
            is_live_video: false,
            resume_time: None,
            length: None,
            last_played_date: None,
        }
    }

    /// Build the record written when playback of `item` pauses or stops
    ///
    /// Positions the engine reports as NaN, infinite or negative are dropped
    /// rather than stored.
    pub fn from_pause(item: &ContentItem, event: &PlaybackEvent) -> Self {
        Self {
            id: item.id().to_string(),
            title: item.title().map(str::to_string),
            description: item.description().map(str::to_string),
            image_url: item.image_url().map(str::to_string),
            publish_date: item.publish_date().map(str::to_string),
            credit: item.credit().map(str::to_string),
            is_live_video: item.is_live_video() || event.is_live,
            resume_time: seconds(event.current_position),
            length: seconds(event.duration),
            last_played_date: Some(event.timestamp),
        }
    }

    /// Overwrite the mutable fields with a newer write of the same video
    ///
    /// A newer write that lacks a resume time or length keeps the stored one.
    pub fn update_from(&mut self, newer: PlaybackRecord) {
        self.title = newer.title;
        self.description = newer.description;
        self.image_url = newer.image_url;
        self.publish_date = newer.publish_date;
        self.credit = newer.credit;
        self.is_live_video = newer.is_live_video;
        self.last_played_date = newer.last_played_date;
        if let Some(resume_time) = newer.resume_time {
            self.resume_time = Some(resume_time);
        }
        if let Some(length) = newer.length {
            self.length = Some(length);
        }
    }

    pub fn cached_play_data(&self) -> Option<CachedPlayData> {
        Some(CachedPlayData {
            last_played_date: self.last_played_date?,
            resume_time: self.resume_time?,
            length: self.length?,
        })
    }

    /// Classify the record for the continue-watching row
    ///
    /// Only an exact zero counts as not started. Completion truncates both
    /// values to whole seconds before comparing, which absorbs the sub-second
    /// drift the player reports at the end of a video.
    pub fn progress(&self) -> PlaybackProgress {
        let (Some(resume_time), Some(length)) = (self.resume_time, self.length) else {
            return PlaybackProgress::NotResumable;
        };
        if self.is_live_video || length <= 0.0 {
            return PlaybackProgress::NotResumable;
        }

        let position = resume_time.trunc();
        if resume_time == 0.0 {
            PlaybackProgress::NotStarted
        } else if position == length.trunc() || position >= length {
            PlaybackProgress::Completed
        } else {
            PlaybackProgress::InProgress
        }
    }

    /// Share of the video watched, clamped to `0.0..=1.0`
    pub fn progress_fraction(&self) -> Option<f64> {
        if self.is_live_video {
            return None;
        }
        let resume_time = self.resume_time?;
        let length = self.length.filter(|length| *length > 0.0)?;
        Some((resume_time / length).clamp(0.0, 1.0))
    }
}

fn seconds(value: f64) -> Option<f64> {
    (value.is_finite() && value >= 0.0).then_some(value)
}
