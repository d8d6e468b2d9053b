//! Raw Xtream `player_api.php` payload types.
//!
//! Provider panels are sloppy about JSON types: numeric ids arrive as
//! strings or numbers depending on the panel version, booleans as 0/1 or
//! "0"/"1", and list fields occasionally degrade to a single string. All
//! fields here deserialize leniently and normalize in `into_record`.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer};

use crate::traits::{
    CatalogItemRecord, CategoryRecord, EpisodeRecord, MovieDetailRecord, SeasonRecord,
    SeriesDetailRecord,
};

// ── Lenient field helpers ───────────────────────────────────────

#[derive(Deserialize)]
#[serde(untagged)]
enum NumOrStr {
    I(i64),
    F(f64),
    S(String),
}

impl NumOrStr {
    fn as_i64(&self) -> Option<i64> {
        match self {
            Self::I(v) => Some(*v),
            Self::F(v) => Some(*v as i64),
            Self::S(s) => s.trim().parse().ok(),
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::I(v) => Some(*v as f64),
            Self::F(v) => Some(*v),
            Self::S(s) => s.trim().parse().ok(),
        }
    }

    fn into_string(self) -> Option<String> {
        match self {
            Self::I(v) => Some(v.to_string()),
            Self::F(v) => Some(v.to_string()),
            Self::S(s) => {
                let s = s.trim();
                if s.is_empty() {
                    None
                } else {
                    Some(s.to_string())
                }
            }
        }
    }
}

fn lenient_i64<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    let v = NumOrStr::deserialize(d)?;
    v.as_i64()
        .ok_or_else(|| serde::de::Error::custom("expected a numeric id"))
}

fn lenient_opt_i64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    let v = Option::<NumOrStr>::deserialize(d)?;
    Ok(v.and_then(|v| v.as_i64()))
}

fn lenient_opt_u32<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
    let v = Option::<NumOrStr>::deserialize(d)?;
    Ok(v.and_then(|v| v.as_i64()).and_then(|v| u32::try_from(v).ok()))
}

fn lenient_opt_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let v = Option::<NumOrStr>::deserialize(d)?;
    Ok(v.and_then(|v| v.as_f64()))
}

fn lenient_opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let v = Option::<NumOrStr>::deserialize(d)?;
    Ok(v.and_then(NumOrStr::into_string))
}

fn lenient_bool<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolLike {
        B(bool),
        N(NumOrStr),
    }
    match Option::<BoolLike>::deserialize(d)? {
        Some(BoolLike::B(b)) => Ok(b),
        Some(BoolLike::N(n)) => Ok(n.as_i64().unwrap_or(0) != 0),
        None => Ok(false),
    }
}

fn lenient_id_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<i64>, D::Error> {
    let v = Option::<Vec<NumOrStr>>::deserialize(d)?;
    Ok(v.unwrap_or_default()
        .iter()
        .filter_map(NumOrStr::as_i64)
        .collect())
}

fn lenient_string_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StrList {
        One(String),
        Many(Vec<String>),
    }
    match Option::<StrList>::deserialize(d)? {
        Some(StrList::One(s)) if !s.is_empty() => Ok(vec![s]),
        Some(StrList::Many(v)) => Ok(v.into_iter().filter(|s| !s.is_empty()).collect()),
        _ => Ok(Vec::new()),
    }
}

// ── Listing payloads ────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct XtreamCategory {
    #[serde(deserialize_with = "lenient_i64")]
    pub category_id: i64,
    pub category_name: String,
}

impl XtreamCategory {
    pub fn into_record(self) -> CategoryRecord {
        CategoryRecord {
            id: self.category_id,
            name: self.category_name,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct XtreamLiveStream {
    #[serde(deserialize_with = "lenient_i64")]
    pub stream_id: i64,
    pub name: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub stream_icon: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub stream_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub epg_channel_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub tv_archive: bool,
    #[serde(default, deserialize_with = "lenient_opt_u32")]
    pub tv_archive_duration: Option<u32>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub direct_source: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub category_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_id_list")]
    pub category_ids: Vec<i64>,
}

impl XtreamLiveStream {
    pub fn into_record(self) -> CatalogItemRecord {
        let secondary = secondary_ids(self.category_id, self.category_ids);
        CatalogItemRecord {
            id: self.stream_id,
            name: self.name,
            icon_url: self.stream_icon,
            primary_category_id: self.category_id,
            secondary_category_ids: secondary,
            stream_kind: self.stream_type,
            epg_channel_id: self.epg_channel_id,
            has_archive: self.tv_archive,
            archive_duration_hours: self.tv_archive_duration,
            direct_source: self.direct_source,
            ..Default::default()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct XtreamVodStream {
    #[serde(deserialize_with = "lenient_i64")]
    pub stream_id: i64,
    pub name: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub stream_icon: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub rating: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub rating_5based: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub container_extension: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub category_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_id_list")]
    pub category_ids: Vec<i64>,
}

impl XtreamVodStream {
    pub fn into_record(self) -> CatalogItemRecord {
        let secondary = secondary_ids(self.category_id, self.category_ids);
        CatalogItemRecord {
            id: self.stream_id,
            name: self.name,
            icon_url: self.stream_icon,
            primary_category_id: self.category_id,
            secondary_category_ids: secondary,
            rating: self.rating,
            rating_5based: self.rating_5based,
            container_extension: self.container_extension,
            ..Default::default()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct XtreamSeries {
    #[serde(deserialize_with = "lenient_i64")]
    pub series_id: i64,
    pub name: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub cover: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub plot: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub cast: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub director: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub genre: Option<String>,
    #[serde(default, rename = "releaseDate", deserialize_with = "lenient_opt_string")]
    pub release_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub rating: Option<String>,
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub backdrop_path: Vec<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub youtube_trailer: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub episode_run_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub category_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_id_list")]
    pub category_ids: Vec<i64>,
}

impl XtreamSeries {
    pub fn into_record(self) -> CatalogItemRecord {
        let secondary = secondary_ids(self.category_id, self.category_ids);
        CatalogItemRecord {
            id: self.series_id,
            name: self.name,
            icon_url: self.cover,
            primary_category_id: self.category_id,
            secondary_category_ids: secondary,
            rating: self.rating,
            plot: self.plot,
            cast: self.cast,
            director: self.director,
            genre: self.genre,
            release_date: self.release_date,
            backdrop_paths: self.backdrop_path,
            trailer: self.youtube_trailer,
            episode_run_time: self.episode_run_time,
            ..Default::default()
        }
    }
}

/// `category_ids` repeats the primary id on most panels; keep only the rest.
fn secondary_ids(primary: Option<i64>, ids: Vec<i64>) -> Vec<i64> {
    ids.into_iter().filter(|id| Some(*id) != primary).collect()
}

// ── Detail payloads ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct XtreamSeriesInfo {
    #[serde(default)]
    pub seasons: Vec<XtreamSeason>,
    #[serde(default)]
    pub episodes: Option<EpisodeGroups>,
}

/// Episodes keyed by season number, or a bare list-of-lists on some panels.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum EpisodeGroups {
    Map(HashMap<String, Vec<XtreamEpisode>>),
    List(Vec<Vec<XtreamEpisode>>),
}

#[derive(Debug, Deserialize)]
pub struct XtreamSeason {
    #[serde(default, deserialize_with = "lenient_opt_u32")]
    pub season_number: Option<u32>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_u32")]
    pub episode_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct XtreamEpisode {
    #[serde(deserialize_with = "lenient_i64")]
    pub id: i64,
    #[serde(default, deserialize_with = "lenient_opt_u32")]
    pub episode_num: Option<u32>,
    #[serde(default, deserialize_with = "lenient_opt_u32")]
    pub season: Option<u32>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub container_extension: Option<String>,
    #[serde(default)]
    pub info: Option<XtreamEpisodeInfo>,
}

#[derive(Debug, Deserialize)]
pub struct XtreamEpisodeInfo {
    #[serde(default, deserialize_with = "lenient_opt_u32")]
    pub duration_secs: Option<u32>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub plot: Option<String>,
}

impl XtreamSeriesInfo {
    pub fn into_record(self, series_id: i64) -> SeriesDetailRecord {
        let seasons = self
            .seasons
            .into_iter()
            .filter_map(|s| {
                Some(SeasonRecord {
                    season_number: s.season_number?,
                    name: s.name,
                    episode_count: s.episode_count,
                })
            })
            .collect();

        let groups: Vec<Vec<XtreamEpisode>> = match self.episodes {
            Some(EpisodeGroups::Map(map)) => map.into_values().collect(),
            Some(EpisodeGroups::List(list)) => list,
            None => Vec::new(),
        };
        let mut episodes: Vec<EpisodeRecord> = groups
            .into_iter()
            .flatten()
            .map(|ep| EpisodeRecord {
                id: ep.id,
                season_number: ep.season.unwrap_or(1),
                episode_number: ep.episode_num.unwrap_or(0),
                title: ep.title,
                container_extension: ep.container_extension,
                duration_secs: ep.info.as_ref().and_then(|i| i.duration_secs),
                plot: ep.info.and_then(|i| i.plot),
            })
            .collect();
        episodes.sort_by_key(|ep| (ep.season_number, ep.episode_number));

        SeriesDetailRecord {
            series_id,
            seasons,
            episodes,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct XtreamVodInfoResponse {
    #[serde(default)]
    pub info: Option<XtreamVodInfo>,
}

#[derive(Debug, Deserialize)]
pub struct XtreamVodInfo {
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub plot: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub cast: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub director: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub genre: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub releasedate: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_u32")]
    pub duration_secs: Option<u32>,
}

impl XtreamVodInfoResponse {
    pub fn into_record(self, movie_id: i64) -> MovieDetailRecord {
        let info = self.info;
        MovieDetailRecord {
            movie_id,
            plot: info.as_ref().and_then(|i| i.plot.clone()),
            cast: info.as_ref().and_then(|i| i.cast.clone()),
            director: info.as_ref().and_then(|i| i.director.clone()),
            genre: info.as_ref().and_then(|i| i.genre.clone()),
            release_date: info.as_ref().and_then(|i| i.releasedate.clone()),
            duration_secs: info.and_then(|i| i.duration_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_id_as_string_or_number() {
        let a: XtreamCategory =
            serde_json::from_str(r#"{"category_id": "12", "category_name": "News"}"#).unwrap();
        let b: XtreamCategory =
            serde_json::from_str(r#"{"category_id": 12, "category_name": "News"}"#).unwrap();
        assert_eq!(a.category_id, 12);
        assert_eq!(b.category_id, 12);
    }

    #[test]
    fn test_live_stream_lenient_fields() {
        let raw = r#"{
            "stream_id": "101",
            "name": "Channel One",
            "stream_icon": "",
            "stream_type": "live",
            "epg_channel_id": "one.example",
            "tv_archive": "1",
            "tv_archive_duration": "24",
            "direct_source": "",
            "category_id": "5",
            "category_ids": [5, "9"]
        }"#;
        let stream: XtreamLiveStream = serde_json::from_str(raw).unwrap();
        let record = stream.into_record();
        assert_eq!(record.id, 101);
        assert!(record.has_archive);
        assert_eq!(record.archive_duration_hours, Some(24));
        // Empty strings normalize to None.
        assert!(record.icon_url.is_none());
        assert!(record.direct_source.is_none());
        assert_eq!(record.primary_category_id, Some(5));
        // The primary id is dropped from the secondary set.
        assert_eq!(record.secondary_category_ids, vec![9]);
    }

    #[test]
    fn test_vod_rating_number_or_string() {
        let a: XtreamVodStream = serde_json::from_str(
            r#"{"stream_id": 1, "name": "M", "rating": 7.2, "rating_5based": "3.6"}"#,
        )
        .unwrap();
        assert_eq!(a.rating.as_deref(), Some("7.2"));
        assert_eq!(a.rating_5based, Some(3.6));
    }

    #[test]
    fn test_series_backdrop_string_or_list() {
        let a: XtreamSeries = serde_json::from_str(
            r#"{"series_id": 3, "name": "S", "backdrop_path": "one.jpg"}"#,
        )
        .unwrap();
        let b: XtreamSeries = serde_json::from_str(
            r#"{"series_id": 3, "name": "S", "backdrop_path": ["one.jpg", "two.jpg"]}"#,
        )
        .unwrap();
        assert_eq!(a.backdrop_path, vec!["one.jpg"]);
        assert_eq!(b.backdrop_path.len(), 2);
    }

    #[test]
    fn test_series_info_episode_map() {
        let raw = r#"{
            "seasons": [{"season_number": "1", "name": "Season 1", "episode_count": 2}],
            "episodes": {
                "1": [
                    {"id": "11", "episode_num": 2, "season": 1, "title": "Second"},
                    {"id": "10", "episode_num": 1, "season": 1, "title": "First",
                     "info": {"duration_secs": 1380, "plot": "Opening"}}
                ]
            }
        }"#;
        let info: XtreamSeriesInfo = serde_json::from_str(raw).unwrap();
        let record = info.into_record(3);
        assert_eq!(record.seasons.len(), 1);
        assert_eq!(record.episodes.len(), 2);
        // Sorted by (season, episode).
        assert_eq!(record.episodes[0].id, 10);
        assert_eq!(record.episodes[0].duration_secs, Some(1380));
    }

    #[test]
    fn test_vod_info_missing_block() {
        let resp: XtreamVodInfoResponse = serde_json::from_str(r#"{}"#).unwrap();
        let record = resp.into_record(9);
        assert_eq!(record.movie_id, 9);
        assert!(record.plot.is_none());
    }
}
