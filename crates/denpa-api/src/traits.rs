//! Trait definitions for remote catalog providers.
//!
//! The sync coordinator and runtime consume providers only through
//! [`CatalogProvider`], so the wire protocol stays swappable.

use std::future::Future;

/// Kind of catalog listing a provider can serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogKind {
    Live,
    Movie,
    Series,
}

impl std::fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Live => f.write_str("live"),
            Self::Movie => f.write_str("movie"),
            Self::Series => f.write_str("series"),
        }
    }
}

/// A remote catalog source.
///
/// `fetch_items` returns the full listing for a kind; providers of this
/// shape have no incremental or paged variant, which is why the caller
/// computes deltas locally.
pub trait CatalogProvider: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn fetch_categories(
        &self,
        kind: CatalogKind,
    ) -> impl Future<Output = Result<Vec<CategoryRecord>, Self::Error>> + Send;

    /// Full listing of all items for a kind, flat fields only.
    fn fetch_items(
        &self,
        kind: CatalogKind,
    ) -> impl Future<Output = Result<Vec<CatalogItemRecord>, Self::Error>> + Send;

    /// Extended series fields (seasons + episodes), fetched on demand.
    fn fetch_series_detail(
        &self,
        series_id: i64,
    ) -> impl Future<Output = Result<SeriesDetailRecord, Self::Error>> + Send;

    /// Extended movie fields, fetched on demand.
    fn fetch_movie_detail(
        &self,
        movie_id: i64,
    ) -> impl Future<Output = Result<MovieDetailRecord, Self::Error>> + Send;
}

/// A category as listed by the provider.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CategoryRecord {
    pub id: i64,
    pub name: String,
}

/// One flat catalog listing row. Per-kind fields are optional and only
/// populated for the matching kind.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct CatalogItemRecord {
    pub id: i64,
    pub name: String,
    pub icon_url: Option<String>,
    pub primary_category_id: Option<i64>,
    pub secondary_category_ids: Vec<i64>,

    // Live
    pub stream_kind: Option<String>,
    pub epg_channel_id: Option<String>,
    pub has_archive: bool,
    pub archive_duration_hours: Option<u32>,
    pub direct_source: Option<String>,

    // Movie
    pub rating: Option<String>,
    pub rating_5based: Option<f64>,
    pub container_extension: Option<String>,

    // Series
    pub plot: Option<String>,
    pub cast: Option<String>,
    pub director: Option<String>,
    pub genre: Option<String>,
    pub release_date: Option<String>,
    pub backdrop_paths: Vec<String>,
    pub trailer: Option<String>,
    pub episode_run_time: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SeasonRecord {
    pub season_number: u32,
    pub name: Option<String>,
    pub episode_count: Option<u32>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EpisodeRecord {
    pub id: i64,
    pub season_number: u32,
    pub episode_number: u32,
    pub title: Option<String>,
    pub container_extension: Option<String>,
    pub duration_secs: Option<u32>,
    pub plot: Option<String>,
}

/// Extended per-series fields, outside the bulk-sync path.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SeriesDetailRecord {
    pub series_id: i64,
    pub seasons: Vec<SeasonRecord>,
    pub episodes: Vec<EpisodeRecord>,
}

/// Extended per-movie fields, outside the bulk-sync path.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct MovieDetailRecord {
    pub movie_id: i64,
    pub plot: Option<String>,
    pub cast: Option<String>,
    pub director: Option<String>,
    pub genre: Option<String>,
    pub release_date: Option<String>,
    pub duration_secs: Option<u32>,
}
