use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};

use denpa_core::error::DenpaError;
use denpa_core::models::{
    CatalogItem, Category, ContinueWatchingEntry, EpisodeProgressEntry, Favorite, MediaKind,
    SeriesDetail, SyncKind, WatchHistoryEntry,
};
use denpa_core::storage::Storage;

/// Async handle to the storage actor.
///
/// All SQLite work runs on one dedicated thread; callers talk to it over a
/// command channel and await a oneshot reply. A handle can also be
/// *degraded* (no backing actor): every read then resolves to an empty
/// default and every write is a silent no-op, so consumers keep working —
/// with empty data — when the local store failed to initialize.
#[derive(Clone)]
pub struct DbHandle {
    tx: Option<mpsc::UnboundedSender<DbCommand>>,
}

enum DbCommand {
    CatalogIds {
        kind: MediaKind,
        reply: oneshot::Sender<Result<HashSet<i64>, DenpaError>>,
    },
    ApplyCatalogDelta {
        kind: MediaKind,
        to_create: Vec<CatalogItem>,
        to_delete: Vec<i64>,
        reply: oneshot::Sender<Result<(), DenpaError>>,
    },
    GetCatalog {
        kind: MediaKind,
        reply: oneshot::Sender<Result<Vec<CatalogItem>, DenpaError>>,
    },
    GetCatalogByCategory {
        kind: MediaKind,
        category_id: i64,
        reply: oneshot::Sender<Result<Vec<CatalogItem>, DenpaError>>,
    },
    GetCatalogItem {
        kind: MediaKind,
        id: i64,
        reply: oneshot::Sender<Result<Option<CatalogItem>, DenpaError>>,
    },
    ReplaceCategories {
        kind: MediaKind,
        categories: Vec<Category>,
        reply: oneshot::Sender<Result<(), DenpaError>>,
    },
    GetCategories {
        kind: MediaKind,
        reply: oneshot::Sender<Result<Vec<Category>, DenpaError>>,
    },
    HasCategories {
        kind: MediaKind,
        reply: oneshot::Sender<Result<bool, DenpaError>>,
    },
    UpsertSeriesDetail {
        detail: Box<SeriesDetail>,
        reply: oneshot::Sender<Result<(), DenpaError>>,
    },
    GetSeriesDetail {
        series_id: i64,
        reply: oneshot::Sender<Result<Option<SeriesDetail>, DenpaError>>,
    },
    ToggleFavorite {
        candidate: Box<Favorite>,
        reply: oneshot::Sender<Result<bool, DenpaError>>,
    },
    GetFavorites {
        reply: oneshot::Sender<Result<Vec<Favorite>, DenpaError>>,
    },
    FavoriteIds {
        kind: MediaKind,
        reply: oneshot::Sender<Result<HashSet<i64>, DenpaError>>,
    },
    RecordWatch {
        entry: Box<WatchHistoryEntry>,
        reply: oneshot::Sender<Result<(), DenpaError>>,
    },
    GetHistory {
        limit: u32,
        reply: oneshot::Sender<Result<Vec<WatchHistoryEntry>, DenpaError>>,
    },
    SaveContinueWatching {
        entry: Box<ContinueWatchingEntry>,
        reply: oneshot::Sender<Result<(), DenpaError>>,
    },
    GetContinueWatching {
        reply: oneshot::Sender<Result<Vec<ContinueWatchingEntry>, DenpaError>>,
    },
    RemoveContinueWatching {
        item_id: i64,
        reply: oneshot::Sender<Result<(), DenpaError>>,
    },
    SaveEpisodeProgress {
        entry: Box<EpisodeProgressEntry>,
        reply: oneshot::Sender<Result<(), DenpaError>>,
    },
    GetEpisodeProgress {
        series_id: i64,
        reply: oneshot::Sender<Result<Vec<EpisodeProgressEntry>, DenpaError>>,
    },
    GetSyncCursor {
        kind: SyncKind,
        reply: oneshot::Sender<Result<Option<DateTime<Utc>>, DenpaError>>,
    },
    SetSyncCursor {
        kind: SyncKind,
        at: DateTime<Utc>,
        reply: oneshot::Sender<Result<(), DenpaError>>,
    },
}

impl DbHandle {
    /// Open the database at the given path and spawn the actor thread.
    pub fn open(path: &Path) -> Result<Self, DenpaError> {
        let storage = Storage::open(path)?;
        Ok(Self::spawn(storage))
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, DenpaError> {
        let storage = Storage::open_memory()?;
        Ok(Self::spawn(storage))
    }

    /// A handle with no backing store: empty reads, no-op writes.
    pub fn degraded() -> Self {
        Self { tx: None }
    }

    pub fn is_degraded(&self) -> bool {
        self.tx.is_none()
    }

    fn spawn(storage: Storage) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        match std::thread::Builder::new()
            .name("db-actor".into())
            .spawn(move || actor_loop(storage, rx))
        {
            Ok(_) => Self { tx: Some(tx) },
            Err(e) => {
                tracing::error!("failed to spawn DB thread: {e}");
                Self::degraded()
            }
        }
    }

    /// Send a command and await its reply. Degraded handles resolve to the
    /// type's default without touching any channel.
    async fn request<T: Default>(
        &self,
        make: impl FnOnce(oneshot::Sender<Result<T, DenpaError>>) -> DbCommand,
    ) -> Result<T, DenpaError> {
        let Some(tx) = &self.tx else {
            return Ok(T::default());
        };
        let (reply, rx) = oneshot::channel();
        let _ = tx.send(make(reply));
        rx.await
            .unwrap_or_else(|_| Err(DenpaError::Config("DB actor closed".into())))
    }

    pub async fn catalog_ids(&self, kind: MediaKind) -> Result<HashSet<i64>, DenpaError> {
        self.request(|reply| DbCommand::CatalogIds { kind, reply })
            .await
    }

    pub async fn apply_catalog_delta(
        &self,
        kind: MediaKind,
        to_create: Vec<CatalogItem>,
        to_delete: Vec<i64>,
    ) -> Result<(), DenpaError> {
        self.request(|reply| DbCommand::ApplyCatalogDelta {
            kind,
            to_create,
            to_delete,
            reply,
        })
        .await
    }

    pub async fn get_catalog(&self, kind: MediaKind) -> Result<Vec<CatalogItem>, DenpaError> {
        self.request(|reply| DbCommand::GetCatalog { kind, reply })
            .await
    }

    pub async fn get_catalog_by_category(
        &self,
        kind: MediaKind,
        category_id: i64,
    ) -> Result<Vec<CatalogItem>, DenpaError> {
        self.request(|reply| DbCommand::GetCatalogByCategory {
            kind,
            category_id,
            reply,
        })
        .await
    }

    pub async fn get_catalog_item(
        &self,
        kind: MediaKind,
        id: i64,
    ) -> Result<Option<CatalogItem>, DenpaError> {
        self.request(|reply| DbCommand::GetCatalogItem { kind, id, reply })
            .await
    }

    pub async fn replace_categories(
        &self,
        kind: MediaKind,
        categories: Vec<Category>,
    ) -> Result<(), DenpaError> {
        self.request(|reply| DbCommand::ReplaceCategories {
            kind,
            categories,
            reply,
        })
        .await
    }

    pub async fn get_categories(&self, kind: MediaKind) -> Result<Vec<Category>, DenpaError> {
        self.request(|reply| DbCommand::GetCategories { kind, reply })
            .await
    }

    pub async fn has_categories(&self, kind: MediaKind) -> Result<bool, DenpaError> {
        self.request(|reply| DbCommand::HasCategories { kind, reply })
            .await
    }

    pub async fn upsert_series_detail(&self, detail: SeriesDetail) -> Result<(), DenpaError> {
        self.request(|reply| DbCommand::UpsertSeriesDetail {
            detail: Box::new(detail),
            reply,
        })
        .await
    }

    pub async fn get_series_detail(
        &self,
        series_id: i64,
    ) -> Result<Option<SeriesDetail>, DenpaError> {
        self.request(|reply| DbCommand::GetSeriesDetail { series_id, reply })
            .await
    }

    pub async fn toggle_favorite(&self, candidate: Favorite) -> Result<bool, DenpaError> {
        self.request(|reply| DbCommand::ToggleFavorite {
            candidate: Box::new(candidate),
            reply,
        })
        .await
    }

    pub async fn get_favorites(&self) -> Result<Vec<Favorite>, DenpaError> {
        self.request(|reply| DbCommand::GetFavorites { reply }).await
    }

    pub async fn favorite_ids(&self, kind: MediaKind) -> Result<HashSet<i64>, DenpaError> {
        self.request(|reply| DbCommand::FavoriteIds { kind, reply })
            .await
    }

    pub async fn record_watch(&self, entry: WatchHistoryEntry) -> Result<(), DenpaError> {
        self.request(|reply| DbCommand::RecordWatch {
            entry: Box::new(entry),
            reply,
        })
        .await
    }

    pub async fn get_history(&self, limit: u32) -> Result<Vec<WatchHistoryEntry>, DenpaError> {
        self.request(|reply| DbCommand::GetHistory { limit, reply })
            .await
    }

    pub async fn save_continue_watching(
        &self,
        entry: ContinueWatchingEntry,
    ) -> Result<(), DenpaError> {
        self.request(|reply| DbCommand::SaveContinueWatching {
            entry: Box::new(entry),
            reply,
        })
        .await
    }

    pub async fn get_continue_watching(
        &self,
    ) -> Result<Vec<ContinueWatchingEntry>, DenpaError> {
        self.request(|reply| DbCommand::GetContinueWatching { reply })
            .await
    }

    pub async fn remove_continue_watching(&self, item_id: i64) -> Result<(), DenpaError> {
        self.request(|reply| DbCommand::RemoveContinueWatching { item_id, reply })
            .await
    }

    pub async fn save_episode_progress(
        &self,
        entry: EpisodeProgressEntry,
    ) -> Result<(), DenpaError> {
        self.request(|reply| DbCommand::SaveEpisodeProgress {
            entry: Box::new(entry),
            reply,
        })
        .await
    }

    pub async fn get_episode_progress(
        &self,
        series_id: i64,
    ) -> Result<Vec<EpisodeProgressEntry>, DenpaError> {
        self.request(|reply| DbCommand::GetEpisodeProgress { series_id, reply })
            .await
    }

    pub async fn get_sync_cursor(
        &self,
        kind: SyncKind,
    ) -> Result<Option<DateTime<Utc>>, DenpaError> {
        self.request(|reply| DbCommand::GetSyncCursor { kind, reply })
            .await
    }

    pub async fn set_sync_cursor(
        &self,
        kind: SyncKind,
        at: DateTime<Utc>,
    ) -> Result<(), DenpaError> {
        self.request(|reply| DbCommand::SetSyncCursor { kind, at, reply })
            .await
    }
}

fn actor_loop(storage: Storage, mut rx: mpsc::UnboundedReceiver<DbCommand>) {
    while let Some(cmd) = rx.blocking_recv() {
        match cmd {
            DbCommand::CatalogIds { kind, reply } => {
                let _ = reply.send(storage.catalog_ids(kind));
            }
            DbCommand::ApplyCatalogDelta {
                kind,
                to_create,
                to_delete,
                reply,
            } => {
                let _ = reply.send(storage.apply_catalog_delta(kind, &to_create, &to_delete));
            }
            DbCommand::GetCatalog { kind, reply } => {
                let _ = reply.send(storage.get_catalog(kind));
            }
            DbCommand::GetCatalogByCategory {
                kind,
                category_id,
                reply,
            } => {
                let _ = reply.send(storage.get_catalog_by_category(kind, category_id));
            }
            DbCommand::GetCatalogItem { kind, id, reply } => {
                let _ = reply.send(storage.get_catalog_item(kind, id));
            }
            DbCommand::ReplaceCategories {
                kind,
                categories,
                reply,
            } => {
                let _ = reply.send(storage.replace_categories(kind, &categories));
            }
            DbCommand::GetCategories { kind, reply } => {
                let _ = reply.send(storage.get_categories(kind));
            }
            DbCommand::HasCategories { kind, reply } => {
                let _ = reply.send(storage.has_categories(kind));
            }
            DbCommand::UpsertSeriesDetail { detail, reply } => {
                let _ = reply.send(storage.upsert_series_detail(&detail));
            }
            DbCommand::GetSeriesDetail { series_id, reply } => {
                let _ = reply.send(storage.get_series_detail(series_id));
            }
            DbCommand::ToggleFavorite { candidate, reply } => {
                let _ = reply.send(storage.toggle_favorite(&candidate));
            }
            DbCommand::GetFavorites { reply } => {
                let _ = reply.send(storage.get_favorites());
            }
            DbCommand::FavoriteIds { kind, reply } => {
                let _ = reply.send(storage.favorite_ids(kind));
            }
            DbCommand::RecordWatch { entry, reply } => {
                let _ = reply.send(storage.record_watch(&entry));
            }
            DbCommand::GetHistory { limit, reply } => {
                let _ = reply.send(storage.get_history(limit));
            }
            DbCommand::SaveContinueWatching { entry, reply } => {
                let _ = reply.send(storage.save_continue_watching(&entry));
            }
            DbCommand::GetContinueWatching { reply } => {
                let _ = reply.send(storage.get_continue_watching());
            }
            DbCommand::RemoveContinueWatching { item_id, reply } => {
                let _ = reply.send(storage.remove_continue_watching(item_id));
            }
            DbCommand::SaveEpisodeProgress { entry, reply } => {
                let _ = reply.send(storage.save_episode_progress(&entry));
            }
            DbCommand::GetEpisodeProgress { series_id, reply } => {
                let _ = reply.send(storage.get_episode_progress(series_id));
            }
            DbCommand::GetSyncCursor { kind, reply } => {
                let _ = reply.send(storage.get_sync_cursor(kind));
            }
            DbCommand::SetSyncCursor { kind, at, reply } => {
                let _ = reply.send(storage.set_sync_cursor(kind, at));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use denpa_core::models::{CatalogExtra, MediaKind};

    fn movie(id: i64) -> CatalogItem {
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

    #[tokio::test]
    async fn test_roundtrip_through_actor() {
        let db = DbHandle::open_memory().unwrap();
        db.apply_catalog_delta(MediaKind::Movie, vec![movie(1), movie(2)], vec![])
            .await
            .unwrap();
        let ids = db.catalog_ids(MediaKind::Movie).await.unwrap();
        assert_eq!(ids.len(), 2);
        let rows = db.get_catalog(MediaKind::Movie).await.unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn test_degraded_handle_is_silent() {
        let db = DbHandle::degraded();
        assert!(db.is_degraded());

        // Writes are no-ops, reads come back empty.
        db.apply_catalog_delta(MediaKind::Movie, vec![movie(1)], vec![])
            .await
            .unwrap();
        assert!(db.get_catalog(MediaKind::Movie).await.unwrap().is_empty());
        assert!(db.get_favorites().await.unwrap().is_empty());
        assert!(db
            .get_sync_cursor(SyncKind::Movies)
            .await
            .unwrap()
            .is_none());
        assert!(!db.has_categories(MediaKind::Live).await.unwrap());
    }
}
