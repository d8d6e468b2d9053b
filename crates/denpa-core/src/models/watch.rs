use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::MediaKind;

/// A favorited catalog item.
///
/// Deduplicated by `item_id` alone — the kind is carried for display and
/// filtering but is not part of the key, so equal numeric ids across kinds
/// share one row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Favorite {
    pub item_id: i64,
    pub kind: MediaKind,
    pub title: String,
    pub poster_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One append-only playback log entry. There is no write-time cap; reads
/// apply a most-recent-N limit instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchHistoryEntry {
    pub item_id: i64,
    pub kind: MediaKind,
    pub title: String,
    pub poster_url: Option<String>,
    pub duration_secs: Option<u32>,
    pub progress_percent: Option<f64>,
    pub watched_at: DateTime<Utc>,
}

/// A resumable playback position, keyed by item.
///
/// The store upserts unconditionally; removing an entry once progress
/// reaches 95% is the caller's job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContinueWatchingEntry {
    pub item_id: i64,
    pub kind: MediaKind,
    pub title: String,
    pub poster_url: Option<String>,
    pub progress_percent: f64,
    pub position_secs: f64,
    pub duration_secs: f64,
    pub updated_at: DateTime<Utc>,
}

/// Playback position for a single series episode, looked up by `episode_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeProgressEntry {
    pub episode_id: i64,
    pub series_id: i64,
    pub season_number: u32,
    pub episode_number: u32,
    pub title: Option<String>,
    pub progress_percent: f64,
    pub position_secs: f64,
    pub duration_secs: f64,
    pub watched: bool,
    pub updated_at: DateTime<Utc>,
}
