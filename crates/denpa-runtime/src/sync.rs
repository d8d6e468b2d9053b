use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use denpa_api::traits::CatalogProvider;
use denpa_core::config::SyncConfig;
use denpa_core::models::{CatalogItem, Category, MediaKind, SyncKind};

use crate::convert::{record_to_item, records_to_categories, to_catalog_kind};
use crate::db::DbHandle;
use crate::RuntimeError;

/// Capacity of the sync event channel. Slow subscribers lose old events
/// rather than blocking the coordinator.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Why a sync invocation did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another sync for this kind is already in flight.
    AlreadyRunning,
    /// The cursor is newer than the gate threshold; no network call made.
    Fresh,
    /// This kind has no sync path (EPG placeholder).
    NotSupported,
}

/// Result of one sync invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Skipped(SkipReason),
    /// Remote and local id sets matched; no write transaction was issued.
    NoChanges,
    Applied {
        created: usize,
        deleted: usize,
    },
    /// Background sync failed; the store and cursor are untouched.
    Failed,
}

/// Broadcast progress events. Any number of observers may subscribe; none
/// can block the coordinator.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    Started { kind: SyncKind },
    Applied { kind: SyncKind, created: usize, deleted: usize },
    NoChanges { kind: SyncKind },
    Failed { kind: SyncKind, message: String },
}

type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Delta-sync coordinator with per-kind time gating and an at-most-one-
/// concurrent-run guard per kind.
///
/// The delta is computed by id only: an item whose id survives a sync is
/// never field-updated by this path, even if the provider edited it
/// remotely. Detail hydration is the only per-row refresh.
pub struct SyncCoordinator<P: CatalogProvider> {
    db: DbHandle,
    provider: P,
    thresholds: SyncConfig,
    running: Mutex<HashSet<SyncKind>>,
    category_fetch: tokio::sync::Mutex<()>,
    events: broadcast::Sender<SyncEvent>,
    clock: Clock,
}

impl<P: CatalogProvider> SyncCoordinator<P> {
    pub fn new(db: DbHandle, provider: P, thresholds: SyncConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            db,
            provider,
            thresholds,
            running: Mutex::new(HashSet::new()),
            category_fetch: tokio::sync::Mutex::new(()),
            events,
            clock: Box::new(Utc::now),
        }
    }

    /// Replace the time source (for tests).
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Subscribe to progress events for all kinds.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Opportunistic sync: gate-checked, guard-checked, and silent on
    /// failure. Gateway and storage errors never reach the caller; they
    /// surface only as [`SyncEvent::Failed`].
    pub async fn check_and_run(&self, kind: SyncKind) -> SyncOutcome {
        match self.run(kind, false).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(kind = %kind, "background sync failed: {e}");
                SyncOutcome::Failed
            }
        }
    }

    /// Manual sync: skips the time gate (but not the concurrency guard)
    /// and propagates failures, for UI actions with a visible result.
    pub async fn force_sync(&self, kind: SyncKind) -> Result<SyncOutcome, RuntimeError> {
        self.run(kind, true).await
    }

    async fn run(&self, kind: SyncKind, force: bool) -> Result<SyncOutcome, RuntimeError> {
        let Some(media_kind) = kind.media_kind() else {
            // EPG: cursor slot exists, sync path does not.
            debug!(kind = %kind, "no sync path for this kind");
            return Ok(SyncOutcome::Skipped(SkipReason::NotSupported));
        };

        if !self.begin(kind) {
            debug!(kind = %kind, "sync already running, skipping");
            return Ok(SyncOutcome::Skipped(SkipReason::AlreadyRunning));
        }

        let result = self.run_guarded(kind, media_kind, force).await;
        self.finish(kind);

        if let Err(e) = &result {
            self.emit(SyncEvent::Failed {
                kind,
                message: e.to_string(),
            });
        }
        result
    }

    async fn run_guarded(
        &self,
        kind: SyncKind,
        media_kind: MediaKind,
        force: bool,
    ) -> Result<SyncOutcome, RuntimeError> {
        if !force {
            if let Some(cursor) = self
                .db
                .get_sync_cursor(kind)
                .await
                .map_err(RuntimeError::Database)?
            {
                let elapsed = (self.clock)() - cursor;
                let threshold = Duration::hours(self.thresholds.threshold_hours(kind));
                if elapsed < threshold {
                    debug!(
                        kind = %kind,
                        elapsed_hours = elapsed.num_hours(),
                        "cursor still fresh, skipping"
                    );
                    return Ok(SyncOutcome::Skipped(SkipReason::Fresh));
                }
            }
        }

        self.emit(SyncEvent::Started { kind });

        let records = self
            .provider
            .fetch_items(to_catalog_kind(media_kind))
            .await
            .map_err(|e| RuntimeError::Gateway(e.to_string()))?;

        let mut remote: HashMap<i64, _> = records.into_iter().map(|r| (r.id, r)).collect();
        let local = self
            .db
            .catalog_ids(media_kind)
            .await
            .map_err(RuntimeError::Database)?;

        let now = (self.clock)();
        let to_delete: Vec<i64> = local
            .iter()
            .filter(|id| !remote.contains_key(id))
            .copied()
            .collect();
        let to_create: Vec<CatalogItem> = remote
            .drain()
            .filter(|(id, _)| !local.contains(id))
            .map(|(_, record)| record_to_item(media_kind, record, now))
            .collect();

        if to_create.is_empty() && to_delete.is_empty() {
            self.db
                .set_sync_cursor(kind, now)
                .await
                .map_err(RuntimeError::Database)?;
            debug!(kind = %kind, "local catalog already matches remote");
            self.emit(SyncEvent::NoChanges { kind });
            return Ok(SyncOutcome::NoChanges);
        }

        let created = to_create.len();
        let deleted = to_delete.len();
        self.db
            .apply_catalog_delta(media_kind, to_create, to_delete)
            .await
            .map_err(RuntimeError::Database)?;
        self.db
            .set_sync_cursor(kind, now)
            .await
            .map_err(RuntimeError::Database)?;

        info!(kind = %kind, created, deleted, "catalog sync applied");
        self.emit(SyncEvent::Applied {
            kind,
            created,
            deleted,
        });
        Ok(SyncOutcome::Applied { created, deleted })
    }

    /// Fetch categories for a kind on first use; afterwards always serve
    /// the cached set. Categories are never re-synchronized. First-time
    /// fetches are serialized so concurrent callers hit the network once.
    pub async fn ensure_categories(&self, kind: MediaKind) -> Result<Vec<Category>, RuntimeError> {
        let _fetch_guard = self.category_fetch.lock().await;
        let cached = self
            .db
            .has_categories(kind)
            .await
            .map_err(RuntimeError::Database)?;
        if !cached {
            let records = self
                .provider
                .fetch_categories(to_catalog_kind(kind))
                .await
                .map_err(|e| RuntimeError::Gateway(e.to_string()))?;
            self.db
                .replace_categories(kind, records_to_categories(kind, records))
                .await
                .map_err(RuntimeError::Database)?;
        }
        self.db
            .get_categories(kind)
            .await
            .map_err(RuntimeError::Database)
    }

    fn begin(&self, kind: SyncKind) -> bool {
        self.running
            .lock()
            .map(|mut set| set.insert(kind))
            .unwrap_or(false)
    }

    fn finish(&self, kind: SyncKind) {
        if let Ok(mut set) = self.running.lock() {
            set.remove(&kind);
        }
    }

    fn emit(&self, event: SyncEvent) {
        let _ = self.events.send(event);
    }
}
