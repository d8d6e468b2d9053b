//! Conversions between wire records and stored models.

use chrono::{DateTime, Utc};

use denpa_api::traits::{CatalogItemRecord, CatalogKind, CategoryRecord, SeriesDetailRecord};
use denpa_core::models::{
    CatalogExtra, CatalogItem, Category, Episode, MediaKind, Season, SeriesDetail,
};

pub(crate) fn to_catalog_kind(kind: MediaKind) -> CatalogKind {
    match kind {
        MediaKind::Live => CatalogKind::Live,
        MediaKind::Movie => CatalogKind::Movie,
        MediaKind::Series => CatalogKind::Series,
    }
}

pub(crate) fn record_to_item(
    kind: MediaKind,
    record: CatalogItemRecord,
    cached_at: DateTime<Utc>,
) -> CatalogItem {
    let extra = match kind {
        MediaKind::Live => CatalogExtra::Live {
            stream_kind: record.stream_kind,
            epg_channel_id: record.epg_channel_id,
            has_archive: record.has_archive,
            archive_duration_hours: record.archive_duration_hours,
            direct_source: record.direct_source,
        },
        MediaKind::Movie => CatalogExtra::Movie {
            rating: record.rating,
            rating_5based: record.rating_5based,
            container_extension: record.container_extension,
        },
        MediaKind::Series => CatalogExtra::Series {
            plot: record.plot,
            cast: record.cast,
            director: record.director,
            genre: record.genre,
            release_date: record.release_date,
            ratings: record.rating,
            backdrop_paths: record.backdrop_paths,
            trailer: record.trailer,
            episode_run_time: record.episode_run_time,
        },
    };
    CatalogItem {
        id: record.id,
        kind,
        name: record.name,
        icon_url: record.icon_url,
        primary_category_id: record.primary_category_id,
        secondary_category_ids: record.secondary_category_ids,
        extra,
        cached_at,
    }
}

pub(crate) fn records_to_categories(
    kind: MediaKind,
    records: Vec<CategoryRecord>,
) -> Vec<Category> {
    records
        .into_iter()
        .map(|r| Category {
            id: r.id,
            kind,
            name: r.name,
        })
        .collect()
}

pub(crate) fn record_to_series_detail(
    record: SeriesDetailRecord,
    fetched_at: DateTime<Utc>,
) -> SeriesDetail {
    SeriesDetail {
        series_id: record.series_id,
        seasons: record
            .seasons
            .into_iter()
            .map(|s| Season {
                season_number: s.season_number,
                name: s.name,
                episode_count: s.episode_count,
            })
            .collect(),
        episodes: record
            .episodes
            .into_iter()
            .map(|e| Episode {
                id: e.id,
                season_number: e.season_number,
                episode_number: e.episode_number,
                title: e.title,
                container_extension: e.container_extension,
                duration_secs: e.duration_secs,
                plot: e.plot,
            })
            .collect(),
        fetched_at,
    }
}
