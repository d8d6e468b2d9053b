use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of catalog entity served by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaKind {
    Live,
    Movie,
    Series,
}

impl MediaKind {
    pub const ALL: &[MediaKind] = &[Self::Live, Self::Movie, Self::Series];

    /// Database string representation.
    pub fn as_db_str(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Movie => "movie",
            Self::Series => "series",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "live" => Some(Self::Live),
            "movie" => Some(Self::Movie),
            "series" => Some(Self::Series),
            _ => None,
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_db_str())
    }
}

/// A synchronizable collection. Superset of [`MediaKind`]: the EPG has its
/// own cursor slot and gate threshold but no implemented sync path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncKind {
    Live,
    Movies,
    Series,
    Epg,
}

impl SyncKind {
    pub const ALL: &[SyncKind] = &[Self::Live, Self::Movies, Self::Series, Self::Epg];

    /// Key under which the sync cursor is persisted in the app_state area.
    pub fn cursor_key(&self) -> &'static str {
        match self {
            Self::Live => "sync_cursor.live",
            Self::Movies => "sync_cursor.movies",
            Self::Series => "sync_cursor.series",
            Self::Epg => "sync_cursor.epg",
        }
    }

    /// The catalog collection this sync kind targets, if any.
    pub fn media_kind(&self) -> Option<MediaKind> {
        match self {
            Self::Live => Some(MediaKind::Live),
            Self::Movies => Some(MediaKind::Movie),
            Self::Series => Some(MediaKind::Series),
            Self::Epg => None,
        }
    }
}

impl From<MediaKind> for SyncKind {
    fn from(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Live => Self::Live,
            MediaKind::Movie => Self::Movies,
            MediaKind::Series => Self::Series,
        }
    }
}

impl std::fmt::Display for SyncKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Live => f.write_str("live"),
            Self::Movies => f.write_str("movies"),
            Self::Series => f.write_str("series"),
            Self::Epg => f.write_str("epg"),
        }
    }
}

/// Kind-specific catalog fields, serialized as one JSON column.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CatalogExtra {
    Live {
        stream_kind: Option<String>,
        epg_channel_id: Option<String>,
        has_archive: bool,
        archive_duration_hours: Option<u32>,
        direct_source: Option<String>,
    },
    Movie {
        rating: Option<String>,
        rating_5based: Option<f64>,
        container_extension: Option<String>,
    },
    Series {
        plot: Option<String>,
        cast: Option<String>,
        director: Option<String>,
        genre: Option<String>,
        release_date: Option<String>,
        ratings: Option<String>,
        backdrop_paths: Vec<String>,
        trailer: Option<String>,
        episode_run_time: Option<String>,
    },
}

/// A catalog row as cached locally. Created and deleted only in bulk by the
/// delta apply; never field-updated by sync (id-only delta).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Provider-assigned stable numeric id, unique per kind.
    pub id: i64,
    pub kind: MediaKind,
    pub name: String,
    pub icon_url: Option<String>,
    pub primary_category_id: Option<i64>,
    pub secondary_category_ids: Vec<i64>,
    pub extra: CatalogExtra,
    pub cached_at: DateTime<Utc>,
}

/// A provider category. Fetched once per kind and cached indefinitely; this
/// core never re-synchronizes categories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub kind: MediaKind,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Season {
    pub season_number: u32,
    pub name: Option<String>,
    pub episode_count: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    pub id: i64,
    pub season_number: u32,
    pub episode_number: u32,
    pub title: Option<String>,
    pub container_extension: Option<String>,
    pub duration_secs: Option<u32>,
    pub plot: Option<String>,
}

/// Lazily hydrated per-series detail, stored apart from the bulk-sync row
/// with its own fetch timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesDetail {
    pub series_id: i64,
    pub seasons: Vec<Season>,
    pub episodes: Vec<Episode>,
    pub fetched_at: DateTime<Utc>,
}
