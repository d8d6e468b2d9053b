//! Offline-first runtime: storage actor, sync coordinator, and catalog
//! reader wired behind one facade.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::warn;

use denpa_api::traits::{CatalogProvider, MovieDetailRecord};
use denpa_api::xtream::XtreamClient;
use denpa_core::config::AppConfig;
use denpa_core::error::DenpaError;
use denpa_core::models::{
    CatalogItem, Category, ContinueWatchingEntry, EpisodeProgressEntry, Favorite, MediaKind,
    SeriesDetail, SyncKind, WatchHistoryEntry,
};

mod convert;
mod db;
mod reader;
mod sync;

pub use db::DbHandle;
pub use reader::{CatalogFilter, CatalogReader};
pub use sync::{SkipReason, SyncCoordinator, SyncEvent, SyncOutcome};

/// A continue-watching row at or past this progress is considered finished
/// and removed instead of saved.
const FINISHED_PERCENT: f64 = 95.0;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("storage error: {0}")]
    Database(#[from] DenpaError),
    #[error("provider error: {0}")]
    Gateway(String),
}

/// Application facade over the store, the provider, and the coordinator.
pub struct Runtime<P: CatalogProvider> {
    config: AppConfig,
    db: DbHandle,
    sync: Arc<SyncCoordinator<P>>,
    reader: CatalogReader<P>,
}

impl Runtime<XtreamClient> {
    /// Build the runtime from configuration.
    ///
    /// A failure to open the local database degrades to an in-memory-less
    /// handle (empty reads, no-op writes) instead of aborting; the remote
    /// side keeps working.
    pub fn from_config(config: AppConfig) -> Result<Self, RuntimeError> {
        let db = match AppConfig::ensure_db_path().and_then(|path| DbHandle::open(&path)) {
            Ok(db) => db,
            Err(e) => {
                warn!("local store unavailable, continuing without it: {e}");
                DbHandle::degraded()
            }
        };
        let provider = XtreamClient::new(
            &config.provider.base_url,
            &config.provider.username,
            &config.provider.password,
            Duration::from_secs(config.provider.timeout_secs),
        )
        .map_err(|e| RuntimeError::Gateway(e.to_string()))?;
        Ok(Self::with_parts(config, db, provider))
    }
}

impl<P: CatalogProvider + 'static> Runtime<P> {
    pub fn with_parts(config: AppConfig, db: DbHandle, provider: P) -> Self {
        let sync = Arc::new(SyncCoordinator::new(
            db.clone(),
            provider,
            config.sync.clone(),
        ));
        let reader = CatalogReader::new(db.clone(), Arc::clone(&sync));
        Self {
            config,
            db,
            sync,
            reader,
        }
    }

    pub fn is_store_degraded(&self) -> bool {
        self.db.is_degraded()
    }

    /// Subscribe to sync progress events.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.sync.subscribe()
    }

    // ── Catalog ──────────────────────────────────────────────────────

    /// Cached catalog slice; triggers an opportunistic background sync.
    pub async fn catalog(
        &self,
        kind: MediaKind,
        filter: CatalogFilter,
    ) -> Result<Vec<CatalogItem>, RuntimeError> {
        self.reader.query(kind, filter).await
    }

    pub async fn catalog_item(
        &self,
        kind: MediaKind,
        id: i64,
    ) -> Result<Option<CatalogItem>, RuntimeError> {
        Ok(self.db.get_catalog_item(kind, id).await?)
    }

    pub async fn categories(&self, kind: MediaKind) -> Result<Vec<Category>, RuntimeError> {
        self.sync.ensure_categories(kind).await
    }

    /// Sync one kind now, bypassing the time gate.
    pub async fn force_sync(&self, kind: SyncKind) -> Result<SyncOutcome, RuntimeError> {
        self.sync.force_sync(kind).await
    }

    /// Series seasons and episodes: served from the store when present,
    /// otherwise fetched once and persisted.
    pub async fn series_detail(&self, series_id: i64) -> Result<SeriesDetail, RuntimeError> {
        if let Some(detail) = self.db.get_series_detail(series_id).await? {
            return Ok(detail);
        }
        let record = self
            .sync
            .provider()
            .fetch_series_detail(series_id)
            .await
            .map_err(|e| RuntimeError::Gateway(e.to_string()))?;
        let detail = convert::record_to_series_detail(record, Utc::now());
        self.db.upsert_series_detail(detail.clone()).await?;
        Ok(detail)
    }

    /// Extended movie fields, fetched live (never persisted).
    pub async fn movie_detail(&self, movie_id: i64) -> Result<MovieDetailRecord, RuntimeError> {
        self.sync
            .provider()
            .fetch_movie_detail(movie_id)
            .await
            .map_err(|e| RuntimeError::Gateway(e.to_string()))
    }

    // ── Watch state ──────────────────────────────────────────────────

    /// Flip the favorite flag for an item; returns the new state.
    pub async fn toggle_favorite(&self, item: &CatalogItem) -> Result<bool, RuntimeError> {
        let now = Utc::now();
        let favorited = self
            .db
            .toggle_favorite(Favorite {
                item_id: item.id,
                kind: item.kind,
                title: item.name.clone(),
                poster_url: item.icon_url.clone(),
                created_at: now,
                updated_at: now,
            })
            .await?;
        Ok(favorited)
    }

    pub async fn favorites(&self) -> Result<Vec<Favorite>, RuntimeError> {
        Ok(self.db.get_favorites().await?)
    }

    pub async fn record_watch(&self, entry: WatchHistoryEntry) -> Result<(), RuntimeError> {
        Ok(self.db.record_watch(entry).await?)
    }

    /// Most recent history entries, newest first. `limit` defaults to the
    /// configured read cap.
    pub async fn history(
        &self,
        limit: Option<u32>,
    ) -> Result<Vec<WatchHistoryEntry>, RuntimeError> {
        let limit = limit.unwrap_or(self.config.history.read_limit);
        Ok(self.db.get_history(limit).await?)
    }

    /// Save a playback position. Positions at or past the finished
    /// threshold clear the row instead, so the shelf only holds items
    /// genuinely in progress.
    pub async fn save_playback_position(
        &self,
        entry: ContinueWatchingEntry,
    ) -> Result<(), RuntimeError> {
        if entry.progress_percent >= FINISHED_PERCENT {
            self.db.remove_continue_watching(entry.item_id).await?;
        } else {
            self.db.save_continue_watching(entry).await?;
        }
        Ok(())
    }

    pub async fn continue_watching(&self) -> Result<Vec<ContinueWatchingEntry>, RuntimeError> {
        Ok(self.db.get_continue_watching().await?)
    }

    pub async fn remove_continue_watching(&self, item_id: i64) -> Result<(), RuntimeError> {
        Ok(self.db.remove_continue_watching(item_id).await?)
    }

    pub async fn save_episode_progress(
        &self,
        entry: EpisodeProgressEntry,
    ) -> Result<(), RuntimeError> {
        Ok(self.db.save_episode_progress(entry).await?)
    }

    pub async fn episode_progress(
        &self,
        series_id: i64,
    ) -> Result<Vec<EpisodeProgressEntry>, RuntimeError> {
        Ok(self.db.get_episode_progress(series_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use denpa_api::traits::{
        CatalogItemRecord, CatalogKind, CategoryRecord, EpisodeRecord, SeasonRecord,
        SeriesDetailRecord,
    };
    use denpa_core::models::CatalogExtra;

    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("mock failure")]
    struct MockError;

    #[derive(Default)]
    struct DetailProvider {
        detail_calls: AtomicUsize,
    }

    impl CatalogProvider for DetailProvider {
        type Error = MockError;

        async fn fetch_categories(
            &self,
            _kind: CatalogKind,
        ) -> Result<Vec<CategoryRecord>, MockError> {
            Ok(vec![])
        }

        async fn fetch_items(
            &self,
            _kind: CatalogKind,
        ) -> Result<Vec<CatalogItemRecord>, MockError> {
            Ok(vec![])
        }

        async fn fetch_series_detail(
            &self,
            series_id: i64,
        ) -> Result<SeriesDetailRecord, MockError> {
            self.detail_calls.fetch_add(1, Ordering::SeqCst);
            Ok(SeriesDetailRecord {
                series_id,
                seasons: vec![SeasonRecord {
                    season_number: 1,
                    name: Some("Season 1".into()),
                    episode_count: Some(1),
                }],
                episodes: vec![EpisodeRecord {
                    id: 100,
                    season_number: 1,
                    episode_number: 1,
                    title: Some("Pilot".into()),
                    container_extension: Some("mkv".into()),
                    duration_secs: Some(1440),
                    plot: None,
                }],
            })
        }

        async fn fetch_movie_detail(&self, movie_id: i64) -> Result<MovieDetailRecord, MockError> {
            Ok(MovieDetailRecord {
                movie_id,
                ..Default::default()
            })
        }
    }

    fn runtime() -> Runtime<DetailProvider> {
        Runtime::with_parts(
            AppConfig::default(),
            DbHandle::open_memory().unwrap(),
            DetailProvider::default(),
        )
    }

    fn item(id: i64) -> CatalogItem {
        CatalogItem {
            id,
            kind: MediaKind::Movie,
            name: format!("Movie {id}"),
            icon_url: None,
            primary_category_id: None,
            secondary_category_ids: vec![],
            extra: CatalogExtra::Movie {
                rating: None,
                rating_5based: None,
                container_extension: None,
            },
            cached_at: Utc::now(),
        }
    }

    fn position(item_id: i64, progress_percent: f64) -> ContinueWatchingEntry {
        ContinueWatchingEntry {
            item_id,
            kind: MediaKind::Movie,
            title: "Movie".into(),
            poster_url: None,
            progress_percent,
            position_secs: progress_percent * 60.0,
            duration_secs: 6000.0,
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_toggle_favorite_roundtrip() {
        let rt = runtime();
        let item = item(1);
        assert!(rt.toggle_favorite(&item).await.unwrap());
        assert_eq!(rt.favorites().await.unwrap().len(), 1);
        assert!(!rt.toggle_favorite(&item).await.unwrap());
        assert!(rt.favorites().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_finished_playback_clears_the_shelf() {
        let rt = runtime();
        rt.save_playback_position(position(1, 40.0)).await.unwrap();
        assert_eq!(rt.continue_watching().await.unwrap().len(), 1);

        rt.save_playback_position(position(1, 96.5)).await.unwrap();
        assert!(rt.continue_watching().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_series_detail_is_fetched_once() {
        let rt = runtime();
        let first = rt.series_detail(42).await.unwrap();
        let second = rt.series_detail(42).await.unwrap();
        assert_eq!(first.episodes.len(), 1);
        assert_eq!(second.episodes.len(), 1);
        assert_eq!(rt.sync.provider().detail_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_history_uses_configured_read_cap() {
        let rt = runtime();
        for i in 0..3 {
            rt.record_watch(WatchHistoryEntry {
                item_id: i,
                kind: MediaKind::Movie,
                title: format!("Movie {i}"),
                poster_url: None,
                duration_secs: None,
                progress_percent: None,
                watched_at: Utc::now(),
            })
            .await
            .unwrap();
        }
        assert_eq!(rt.history(None).await.unwrap().len(), 3);
        assert_eq!(rt.history(Some(2)).await.unwrap().len(), 2);
    }
}
