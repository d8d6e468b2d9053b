use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;

use super::error::XtreamError;
use super::types::{
    XtreamCategory, XtreamLiveStream, XtreamSeries, XtreamSeriesInfo, XtreamVodInfoResponse,
    XtreamVodStream,
};
use crate::traits::{
    CatalogItemRecord, CatalogKind, CatalogProvider, CategoryRecord, MovieDetailRecord,
    SeriesDetailRecord,
};

/// Xtream-style provider client over `player_api.php`.
///
/// Credentials travel in the query string; that is the protocol, not a
/// choice. Every call shares one fixed wall-clock timeout, so a dead
/// provider fails like any other gateway error instead of hanging a sync.
pub struct XtreamClient {
    base_url: String,
    username: String,
    password: String,
    http: Client,
}

impl XtreamClient {
    pub fn new(
        base_url: &str,
        username: &str,
        password: &str,
        timeout: Duration,
    ) -> Result<Self, XtreamError> {
        if base_url.is_empty() {
            return Err(XtreamError::Config("provider base_url is empty".into()));
        }
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
            http,
        })
    }

    fn player_api_url(&self) -> String {
        format!("{}/player_api.php", self.base_url)
    }

    /// Check the HTTP response for errors and return the body text on failure.
    async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, XtreamError> {
        if resp.status().is_success() {
            Ok(resp)
        } else {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(status, "provider API error");
            Err(XtreamError::Api {
                status,
                message: body,
            })
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        action: &str,
        extra: &[(&str, String)],
    ) -> Result<T, XtreamError> {
        let mut query: Vec<(&str, String)> = vec![
            ("username", self.username.clone()),
            ("password", self.password.clone()),
            ("action", action.to_string()),
        ];
        query.extend(extra.iter().cloned());

        let resp = self
            .http
            .get(self.player_api_url())
            .query(&query)
            .send()
            .await?;
        let resp = Self::check_response(resp).await?;
        resp.json().await.map_err(|e| XtreamError::Parse(e.to_string()))
    }

    // ── Playback URLs ───────────────────────────────────────────
    //
    // Derived from the same credentials; the player consumes these directly.

    pub fn live_stream_url(&self, stream_id: i64) -> String {
        format!(
            "{}/live/{}/{}/{stream_id}.ts",
            self.base_url, self.username, self.password
        )
    }

    pub fn movie_stream_url(&self, stream_id: i64, container_extension: Option<&str>) -> String {
        let ext = container_extension.unwrap_or("mp4");
        format!(
            "{}/movie/{}/{}/{stream_id}.{ext}",
            self.base_url, self.username, self.password
        )
    }

    pub fn episode_stream_url(&self, episode_id: i64, container_extension: Option<&str>) -> String {
        let ext = container_extension.unwrap_or("mp4");
        format!(
            "{}/series/{}/{}/{episode_id}.{ext}",
            self.base_url, self.username, self.password
        )
    }
}

impl CatalogProvider for XtreamClient {
    type Error = XtreamError;

    async fn fetch_categories(
        &self,
        kind: CatalogKind,
    ) -> Result<Vec<CategoryRecord>, XtreamError> {
        let action = match kind {
            CatalogKind::Live => "get_live_categories",
            CatalogKind::Movie => "get_vod_categories",
            CatalogKind::Series => "get_series_categories",
        };
        let categories: Vec<XtreamCategory> = self.get_json(action, &[]).await?;
        tracing::debug!(kind = %kind, count = categories.len(), "fetched categories");
        Ok(categories.into_iter().map(|c| c.into_record()).collect())
    }

    async fn fetch_items(&self, kind: CatalogKind) -> Result<Vec<CatalogItemRecord>, XtreamError> {
        let records: Vec<CatalogItemRecord> = match kind {
            CatalogKind::Live => {
                let streams: Vec<XtreamLiveStream> =
                    self.get_json("get_live_streams", &[]).await?;
                streams.into_iter().map(|s| s.into_record()).collect()
            }
            CatalogKind::Movie => {
                let streams: Vec<XtreamVodStream> = self.get_json("get_vod_streams", &[]).await?;
                streams.into_iter().map(|s| s.into_record()).collect()
            }
            CatalogKind::Series => {
                let series: Vec<XtreamSeries> = self.get_json("get_series", &[]).await?;
                series.into_iter().map(|s| s.into_record()).collect()
            }
        };
        tracing::debug!(kind = %kind, count = records.len(), "fetched full listing");
        Ok(records)
    }

    async fn fetch_series_detail(&self, series_id: i64) -> Result<SeriesDetailRecord, XtreamError> {
        let info: XtreamSeriesInfo = self
            .get_json("get_series_info", &[("series_id", series_id.to_string())])
            .await?;
        Ok(info.into_record(series_id))
    }

    async fn fetch_movie_detail(&self, movie_id: i64) -> Result<MovieDetailRecord, XtreamError> {
        let resp: XtreamVodInfoResponse = self
            .get_json("get_vod_info", &[("vod_id", movie_id.to_string())])
            .await?;
        Ok(resp.into_record(movie_id))
    }
}
