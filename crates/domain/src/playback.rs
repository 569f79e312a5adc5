use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{PlaybackProgress, PlaybackRecord};

/// Reported by the player whenever playback pauses or stops
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackEvent {
    pub id: String,
    /// Seconds into the video
    pub current_position: f64,
    /// Seconds, NaN or 0 when the player does not know yet
    pub duration: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub is_live: bool,
}

/// What the play button offers for a video
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ResumeAction {
    Play,
    Resume { from: f64 },
    WatchAgain,
}

impl ResumeAction {
    /// Positions under one second offer a plain Play, even though such a
    /// record still shows up in the continue-watching row.
    pub fn for_record(record: Option<&PlaybackRecord>) -> Self {
        let Some(record) = record else {
            return ResumeAction::Play;
        };
        if record.resume_time.is_some_and(|resume_time| resume_time.trunc() == 0.0) {
            return ResumeAction::Play;
        }
        match (record.progress(), record.resume_time) {
            (PlaybackProgress::InProgress, Some(from)) => ResumeAction::Resume { from },
            (PlaybackProgress::Completed, _) => ResumeAction::WatchAgain,
            _ => ResumeAction::Play,
        }
    }
}

/// Position to seek to once the media item is loaded
///
/// No seek happens when the viewer asked to start over, when nothing is
/// cached, or when the cached position sits on the last second of the media.
pub fn resume_seek_target(
    record: Option<&PlaybackRecord>,
    play_from_beginning: bool,
    media_duration: f64,
) -> Option<f64> {
    if play_from_beginning {
        return None;
    }
    let seek_to = record?.cached_play_data()?.resume_time;
    if media_duration.is_finite() && seek_to.trunc() == media_duration.trunc() {
        return None;
    }
    Some(seek_to)
}

/// Render seconds as `MM:SS`, or `H:MM:SS` from one hour on
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.trunc() as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours >= 1 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes:02}:{secs:02}")
    }
}
