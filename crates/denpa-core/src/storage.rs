use std::collections::{HashMap, HashSet};
use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::DenpaError;
use crate::models::{
    CatalogExtra, CatalogItem, Category, ContinueWatchingEntry, EpisodeProgressEntry, Favorite,
    MediaKind, SeriesDetail, SyncKind, WatchHistoryEntry,
};

const SCHEMA_V1: &str = include_str!("../../../migrations/001_initial.sql");
const SCHEMA_V2: &str = include_str!("../../../migrations/002_series_detail.sql");

/// SQLite-backed storage for the catalog cache and per-user watch state.
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Open (or create) the database at the given path and run migrations.
    pub fn open(path: &Path) -> Result<Self, DenpaError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self, DenpaError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        run_migrations(&conn)?;
        Ok(Self { conn })
    }

    // ── Catalog ─────────────────────────────────────────────────

    /// The full local id set for a kind. Input to delta computation.
    pub fn catalog_ids(&self, kind: MediaKind) -> Result<HashSet<i64>, DenpaError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM catalog_item WHERE kind = ?1")?;
        let ids = stmt
            .query_map(params![kind.as_db_str()], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(ids)
    }

    /// Apply a computed delta in one all-or-nothing transaction.
    ///
    /// Rows in neither set are untouched; in particular their `cached_at`
    /// survives the sync unchanged. Deletes are hard deletes.
    pub fn apply_catalog_delta(
        &self,
        kind: MediaKind,
        to_create: &[CatalogItem],
        to_delete: &[i64],
    ) -> Result<(), DenpaError> {
        let tx = self.conn.unchecked_transaction()?;

        for id in to_delete {
            tx.execute(
                "DELETE FROM catalog_item WHERE id = ?1 AND kind = ?2",
                params![id, kind.as_db_str()],
            )?;
            tx.execute(
                "DELETE FROM item_category WHERE item_id = ?1 AND kind = ?2",
                params![id, kind.as_db_str()],
            )?;
        }

        for item in to_create {
            let extra_json = serde_json::to_string(&item.extra)
                .map_err(|e| DenpaError::Malformed(e.to_string()))?;
            tx.execute(
                "INSERT INTO catalog_item (id, kind, name, icon_url, primary_category_id,
                 extra, cached_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    item.id,
                    item.kind.as_db_str(),
                    item.name,
                    item.icon_url,
                    item.primary_category_id,
                    extra_json,
                    item.cached_at.to_rfc3339(),
                ],
            )?;
            for category_id in &item.secondary_category_ids {
                tx.execute(
                    "INSERT OR IGNORE INTO item_category (item_id, kind, category_id)
                     VALUES (?1, ?2, ?3)",
                    params![item.id, item.kind.as_db_str(), category_id],
                )?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// All cached items of a kind, name-ordered.
    pub fn get_catalog(&self, kind: MediaKind) -> Result<Vec<CatalogItem>, DenpaError> {
        let secondary = self.load_secondary_ids(kind)?;
        let mut stmt = self.conn.prepare(
            "SELECT id, kind, name, icon_url, primary_category_id, extra, cached_at
             FROM catalog_item WHERE kind = ?1 ORDER BY name",
        )?;
        let rows = stmt
            .query_map(params![kind.as_db_str()], row_to_catalog_item)?
            .filter_map(|r| r.ok())
            .map(|mut item| {
                if let Some(ids) = secondary.get(&item.id) {
                    item.secondary_category_ids = ids.clone();
                }
                item
            })
            .collect();
        Ok(rows)
    }

    /// Items of a kind belonging to a category, either as primary or via the
    /// item_category join table.
    pub fn get_catalog_by_category(
        &self,
        kind: MediaKind,
        category_id: i64,
    ) -> Result<Vec<CatalogItem>, DenpaError> {
        let secondary = self.load_secondary_ids(kind)?;
        let mut stmt = self.conn.prepare(
            "SELECT id, kind, name, icon_url, primary_category_id, extra, cached_at
             FROM catalog_item
             WHERE kind = ?1
               AND (primary_category_id = ?2
                    OR id IN (SELECT item_id FROM item_category
                              WHERE kind = ?1 AND category_id = ?2))
             ORDER BY name",
        )?;
        let rows = stmt
            .query_map(params![kind.as_db_str(), category_id], row_to_catalog_item)?
            .filter_map(|r| r.ok())
            .map(|mut item| {
                if let Some(ids) = secondary.get(&item.id) {
                    item.secondary_category_ids = ids.clone();
                }
                item
            })
            .collect();
        Ok(rows)
    }

    /// Get a single cached item.
    pub fn get_catalog_item(
        &self,
        kind: MediaKind,
        id: i64,
    ) -> Result<Option<CatalogItem>, DenpaError> {
        let item = self
            .conn
            .query_row(
                "SELECT id, kind, name, icon_url, primary_category_id, extra, cached_at
                 FROM catalog_item WHERE kind = ?1 AND id = ?2",
                params![kind.as_db_str(), id],
                row_to_catalog_item,
            )
            .optional()?;

        let Some(mut item) = item else {
            return Ok(None);
        };
        let mut stmt = self.conn.prepare(
            "SELECT category_id FROM item_category WHERE item_id = ?1 AND kind = ?2",
        )?;
        item.secondary_category_ids = stmt
            .query_map(params![id, kind.as_db_str()], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(Some(item))
    }

    fn load_secondary_ids(&self, kind: MediaKind) -> Result<HashMap<i64, Vec<i64>>, DenpaError> {
        let mut stmt = self
            .conn
            .prepare("SELECT item_id, category_id FROM item_category WHERE kind = ?1")?;
        let mut map: HashMap<i64, Vec<i64>> = HashMap::new();
        let rows = stmt.query_map(params![kind.as_db_str()], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows.filter_map(|r| r.ok()) {
            map.entry(row.0).or_default().push(row.1);
        }
        Ok(map)
    }

    // ── Categories ──────────────────────────────────────────────

    /// Replace all categories of a kind. Called once per kind on first
    /// fetch; categories are never re-synchronized after that.
    pub fn replace_categories(
        &self,
        kind: MediaKind,
        categories: &[Category],
    ) -> Result<(), DenpaError> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM category WHERE kind = ?1",
            params![kind.as_db_str()],
        )?;
        for category in categories {
            tx.execute(
                "INSERT INTO category (id, kind, name) VALUES (?1, ?2, ?3)",
                params![category.id, kind.as_db_str(), category.name],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn get_categories(&self, kind: MediaKind) -> Result<Vec<Category>, DenpaError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, kind, name FROM category WHERE kind = ?1 ORDER BY name")?;
        let rows = stmt
            .query_map(params![kind.as_db_str()], |row| {
                let kind_str: String = row.get(1)?;
                Ok(Category {
                    id: row.get(0)?,
                    kind: MediaKind::from_db_str(&kind_str).unwrap_or(MediaKind::Live),
                    name: row.get(2)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    pub fn has_categories(&self, kind: MediaKind) -> Result<bool, DenpaError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM category WHERE kind = ?1",
            params![kind.as_db_str()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // ── Series detail ───────────────────────────────────────────

    /// Persist a hydrated series detail record, replacing any previous one.
    pub fn upsert_series_detail(&self, detail: &SeriesDetail) -> Result<(), DenpaError> {
        let seasons_json = serde_json::to_string(&detail.seasons)
            .map_err(|e| DenpaError::Malformed(e.to_string()))?;
        let episodes_json = serde_json::to_string(&detail.episodes)
            .map_err(|e| DenpaError::Malformed(e.to_string()))?;
        self.conn.execute(
            "INSERT OR REPLACE INTO series_detail (series_id, seasons, episodes, fetched_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                detail.series_id,
                seasons_json,
                episodes_json,
                detail.fetched_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_series_detail(&self, series_id: i64) -> Result<Option<SeriesDetail>, DenpaError> {
        self.conn
            .query_row(
                "SELECT series_id, seasons, episodes, fetched_at
                 FROM series_detail WHERE series_id = ?1",
                params![series_id],
                |row| {
                    let seasons_json: String = row.get(1)?;
                    let episodes_json: String = row.get(2)?;
                    let fetched_at_str: String = row.get(3)?;
                    Ok(SeriesDetail {
                        series_id: row.get(0)?,
                        seasons: serde_json::from_str(&seasons_json).unwrap_or_default(),
                        episodes: serde_json::from_str(&episodes_json).unwrap_or_default(),
                        fetched_at: parse_datetime(&fetched_at_str),
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    // ── Favorites ───────────────────────────────────────────────

    /// Flip favorite membership in one transaction: delete the row if it
    /// exists, insert it otherwise. Returns the new membership state.
    pub fn toggle_favorite(&self, candidate: &Favorite) -> Result<bool, DenpaError> {
        let tx = self.conn.unchecked_transaction()?;
        let deleted = tx.execute(
            "DELETE FROM favorite WHERE item_id = ?1",
            params![candidate.item_id],
        )?;
        let now_favorite = deleted == 0;
        if now_favorite {
            tx.execute(
                "INSERT INTO favorite (item_id, kind, title, poster_url, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    candidate.item_id,
                    candidate.kind.as_db_str(),
                    candidate.title,
                    candidate.poster_url,
                    candidate.created_at.to_rfc3339(),
                    candidate.updated_at.to_rfc3339(),
                ],
            )?;
        }
        tx.commit()?;
        Ok(now_favorite)
    }

    pub fn get_favorites(&self) -> Result<Vec<Favorite>, DenpaError> {
        let mut stmt = self.conn.prepare(
            "SELECT item_id, kind, title, poster_url, created_at, updated_at
             FROM favorite ORDER BY updated_at DESC",
        )?;
        let rows = stmt
            .query_map([], row_to_favorite)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    /// Favorite ids for a kind, for intersecting with catalog queries.
    pub fn favorite_ids(&self, kind: MediaKind) -> Result<HashSet<i64>, DenpaError> {
        let mut stmt = self
            .conn
            .prepare("SELECT item_id FROM favorite WHERE kind = ?1")?;
        let ids = stmt
            .query_map(params![kind.as_db_str()], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(ids)
    }

    // ── Watch history ───────────────────────────────────────────

    /// Append a playback log entry. The log is unbounded at write time.
    pub fn record_watch(&self, entry: &WatchHistoryEntry) -> Result<(), DenpaError> {
        self.conn.execute(
            "INSERT INTO watch_history (item_id, kind, title, poster_url, duration_secs,
             progress_percent, watched_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.item_id,
                entry.kind.as_db_str(),
                entry.title,
                entry.poster_url,
                entry.duration_secs,
                entry.progress_percent,
                entry.watched_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Most recent history entries, capped at `limit`.
    pub fn get_history(&self, limit: u32) -> Result<Vec<WatchHistoryEntry>, DenpaError> {
        let mut stmt = self.conn.prepare(
            "SELECT item_id, kind, title, poster_url, duration_secs, progress_percent, watched_at
             FROM watch_history ORDER BY watched_at DESC, id DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![limit], |row| {
                let kind_str: String = row.get(1)?;
                let watched_at_str: String = row.get(6)?;
                Ok(WatchHistoryEntry {
                    item_id: row.get(0)?,
                    kind: MediaKind::from_db_str(&kind_str).unwrap_or(MediaKind::Live),
                    title: row.get(2)?,
                    poster_url: row.get(3)?,
                    duration_secs: row.get(4)?,
                    progress_percent: row.get(5)?,
                    watched_at: parse_datetime(&watched_at_str),
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    // ── Continue watching ───────────────────────────────────────

    /// Upsert a resume position by item id. No completion handling here:
    /// the caller removes the entry once progress passes its threshold.
    pub fn save_continue_watching(&self, entry: &ContinueWatchingEntry) -> Result<(), DenpaError> {
        self.conn.execute(
            "INSERT INTO continue_watching (item_id, kind, title, poster_url, progress_percent,
             position_secs, duration_secs, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(item_id) DO UPDATE SET
               kind = excluded.kind,
               title = excluded.title,
               poster_url = excluded.poster_url,
               progress_percent = excluded.progress_percent,
               position_secs = excluded.position_secs,
               duration_secs = excluded.duration_secs,
               updated_at = excluded.updated_at",
            params![
                entry.item_id,
                entry.kind.as_db_str(),
                entry.title,
                entry.poster_url,
                entry.progress_percent,
                entry.position_secs,
                entry.duration_secs,
                entry.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_continue_watching(&self) -> Result<Vec<ContinueWatchingEntry>, DenpaError> {
        let mut stmt = self.conn.prepare(
            "SELECT item_id, kind, title, poster_url, progress_percent, position_secs,
             duration_secs, updated_at
             FROM continue_watching ORDER BY updated_at DESC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                let kind_str: String = row.get(1)?;
                let updated_at_str: String = row.get(7)?;
                Ok(ContinueWatchingEntry {
                    item_id: row.get(0)?,
                    kind: MediaKind::from_db_str(&kind_str).unwrap_or(MediaKind::Live),
                    title: row.get(2)?,
                    poster_url: row.get(3)?,
                    progress_percent: row.get(4)?,
                    position_secs: row.get(5)?,
                    duration_secs: row.get(6)?,
                    updated_at: parse_datetime(&updated_at_str),
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    pub fn remove_continue_watching(&self, item_id: i64) -> Result<(), DenpaError> {
        self.conn.execute(
            "DELETE FROM continue_watching WHERE item_id = ?1",
            params![item_id],
        )?;
        Ok(())
    }

    // ── Episode progress ────────────────────────────────────────

    /// Update the row matching `episode_id` if one exists, else insert.
    pub fn save_episode_progress(&self, entry: &EpisodeProgressEntry) -> Result<(), DenpaError> {
        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM episode_progress WHERE episode_id = ?1",
                params![entry.episode_id],
                |row| row.get(0),
            )
            .optional()?;

        match existing {
            Some(row_id) => {
                self.conn.execute(
                    "UPDATE episode_progress SET
                        title = ?1, progress_percent = ?2, position_secs = ?3,
                        duration_secs = ?4, watched = ?5, updated_at = ?6
                     WHERE id = ?7",
                    params![
                        entry.title,
                        entry.progress_percent,
                        entry.position_secs,
                        entry.duration_secs,
                        entry.watched as i32,
                        entry.updated_at.to_rfc3339(),
                        row_id,
                    ],
                )?;
            }
            None => {
                self.conn.execute(
                    "INSERT INTO episode_progress (episode_id, series_id, season_number,
                     episode_number, title, progress_percent, position_secs, duration_secs,
                     watched, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                    params![
                        entry.episode_id,
                        entry.series_id,
                        entry.season_number,
                        entry.episode_number,
                        entry.title,
                        entry.progress_percent,
                        entry.position_secs,
                        entry.duration_secs,
                        entry.watched as i32,
                        entry.updated_at.to_rfc3339(),
                    ],
                )?;
            }
        }
        Ok(())
    }

    pub fn get_episode_progress(
        &self,
        series_id: i64,
    ) -> Result<Vec<EpisodeProgressEntry>, DenpaError> {
        let mut stmt = self.conn.prepare(
            "SELECT episode_id, series_id, season_number, episode_number, title,
             progress_percent, position_secs, duration_secs, watched, updated_at
             FROM episode_progress WHERE series_id = ?1
             ORDER BY season_number, episode_number",
        )?;
        let rows = stmt
            .query_map(params![series_id], |row| {
                let updated_at_str: String = row.get(9)?;
                Ok(EpisodeProgressEntry {
                    episode_id: row.get(0)?,
                    series_id: row.get(1)?,
                    season_number: row.get(2)?,
                    episode_number: row.get(3)?,
                    title: row.get(4)?,
                    progress_percent: row.get(5)?,
                    position_secs: row.get(6)?,
                    duration_secs: row.get(7)?,
                    watched: row.get::<_, i32>(8)? != 0,
                    updated_at: parse_datetime(&updated_at_str),
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    // ── Sync cursors ────────────────────────────────────────────

    /// Timestamp of the last successful sync for a kind, if any.
    pub fn get_sync_cursor(&self, kind: SyncKind) -> Result<Option<DateTime<Utc>>, DenpaError> {
        let value = self.get_state(kind.cursor_key())?;
        Ok(value.map(|s| parse_datetime(&s)))
    }

    /// Advance the cursor. Only called after a fully successful sync.
    pub fn set_sync_cursor(&self, kind: SyncKind, at: DateTime<Utc>) -> Result<(), DenpaError> {
        self.set_state(kind.cursor_key(), &at.to_rfc3339())
    }

    /// Read a value from the app_state key-value area.
    pub fn get_state(&self, key: &str) -> Result<Option<String>, DenpaError> {
        self.conn
            .query_row(
                "SELECT value FROM app_state WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    /// Write a value into the app_state key-value area.
    pub fn set_state(&self, key: &str, value: &str) -> Result<(), DenpaError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO app_state (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

// ── Migrations ──────────────────────────────────────────────────

/// Run schema migrations using `PRAGMA user_version` for version tracking.
fn run_migrations(conn: &Connection) -> Result<(), DenpaError> {
    let version: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .unwrap_or(0);

    if version < 1 {
        conn.execute_batch(SCHEMA_V1)?;
        conn.pragma_update(None, "user_version", 1)?;
    }
    if version < 2 {
        conn.execute_batch(SCHEMA_V2)?;
        conn.pragma_update(None, "user_version", 2)?;
    }
    Ok(())
}

// ── Helpers ─────────────────────────────────────────────────────

/// Parse a datetime string from SQLite (RFC 3339, or SQLite's own format).
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return naive.and_utc();
    }
    DateTime::default()
}

// ── Row mapping helpers ─────────────────────────────────────────

fn row_to_catalog_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<CatalogItem> {
    let kind_str: String = row.get(1)?;
    let extra_json: String = row.get(5)?;
    let cached_at_str: String = row.get(6)?;
    let kind = MediaKind::from_db_str(&kind_str).unwrap_or(MediaKind::Live);
    Ok(CatalogItem {
        id: row.get(0)?,
        kind,
        name: row.get(2)?,
        icon_url: row.get(3)?,
        primary_category_id: row.get(4)?,
        secondary_category_ids: Vec::new(),
        extra: serde_json::from_str(&extra_json).unwrap_or(fallback_extra(kind)),
        cached_at: parse_datetime(&cached_at_str),
    })
}

/// Empty extra payload for rows whose JSON column fails to parse.
fn fallback_extra(kind: MediaKind) -> CatalogExtra {
    match kind {
        MediaKind::Live => CatalogExtra::Live {
            stream_kind: None,
            epg_channel_id: None,
            has_archive: false,
            archive_duration_hours: None,
            direct_source: None,
        },
        MediaKind::Movie => CatalogExtra::Movie {
            rating: None,
            rating_5based: None,
            container_extension: None,
        },
        MediaKind::Series => CatalogExtra::Series {
            plot: None,
            cast: None,
            director: None,
            genre: None,
            release_date: None,
            ratings: None,
            backdrop_paths: Vec::new(),
            trailer: None,
            episode_run_time: None,
        },
    }
}

fn row_to_favorite(row: &rusqlite::Row<'_>) -> rusqlite::Result<Favorite> {
    let kind_str: String = row.get(1)?;
    let created_at_str: String = row.get(4)?;
    let updated_at_str: String = row.get(5)?;
    Ok(Favorite {
        item_id: row.get(0)?,
        kind: MediaKind::from_db_str(&kind_str).unwrap_or(MediaKind::Live),
        title: row.get(2)?,
        poster_url: row.get(3)?,
        created_at: parse_datetime(&created_at_str),
        updated_at: parse_datetime(&updated_at_str),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(id: i64, name: &str) -> CatalogItem {
        CatalogItem {
            id,
            kind: MediaKind::Movie,
            name: name.into(),
            icon_url: None,
            primary_category_id: Some(7),
            secondary_category_ids: vec![],
            extra: CatalogExtra::Movie {
                rating: Some("6.8".into()),
                rating_5based: Some(3.4),
                container_extension: Some("mkv".into()),
            },
            cached_at: Utc::now(),
        }
    }

    fn favorite(item_id: i64) -> Favorite {
        Favorite {
            item_id,
            kind: MediaKind::Movie,
            title: "Some Movie".into(),
            poster_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_delta_apply_and_cached_at_preserved() {
        let db = Storage::open_memory().unwrap();
        db.apply_catalog_delta(
            MediaKind::Movie,
            &[movie(1, "One"), movie(2, "Two"), movie(3, "Three")],
            &[],
        )
        .unwrap();

        let before = db.get_catalog_item(MediaKind::Movie, 2).unwrap().unwrap();

        // Remote now reports {2, 3, 4}: create 4, delete 1.
        db.apply_catalog_delta(MediaKind::Movie, &[movie(4, "Four")], &[1])
            .unwrap();

        let ids = db.catalog_ids(MediaKind::Movie).unwrap();
        assert_eq!(ids, HashSet::from([2, 3, 4]));

        let after = db.get_catalog_item(MediaKind::Movie, 2).unwrap().unwrap();
        assert_eq!(after.cached_at, before.cached_at);
        assert!(db.get_catalog_item(MediaKind::Movie, 1).unwrap().is_none());
    }

    #[test]
    fn test_open_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("denpa.db");

        let db = Storage::open(&path).unwrap();
        db.apply_catalog_delta(MediaKind::Movie, &[movie(1, "One")], &[])
            .unwrap();
        db.set_sync_cursor(SyncKind::Movies, Utc::now()).unwrap();
        drop(db);

        // Reopen runs the migration gate again; existing data survives.
        let db = Storage::open(&path).unwrap();
        assert_eq!(db.catalog_ids(MediaKind::Movie).unwrap().len(), 1);
        assert!(db.get_sync_cursor(SyncKind::Movies).unwrap().is_some());
    }

    #[test]
    fn test_catalog_ids_scoped_by_kind() {
        let db = Storage::open_memory().unwrap();
        db.apply_catalog_delta(MediaKind::Movie, &[movie(1, "One")], &[])
            .unwrap();
        assert!(db.catalog_ids(MediaKind::Live).unwrap().is_empty());
        assert_eq!(db.catalog_ids(MediaKind::Movie).unwrap().len(), 1);
    }

    #[test]
    fn test_category_filter_primary_or_secondary() {
        let db = Storage::open_memory().unwrap();
        let mut a = movie(1, "Primary hit");
        a.primary_category_id = Some(10);
        let mut b = movie(2, "Secondary hit");
        b.primary_category_id = Some(99);
        b.secondary_category_ids = vec![10, 11];
        let mut c = movie(3, "Miss");
        c.primary_category_id = Some(99);
        db.apply_catalog_delta(MediaKind::Movie, &[a, b, c], &[])
            .unwrap();

        let hits = db.get_catalog_by_category(MediaKind::Movie, 10).unwrap();
        let ids: Vec<i64> = hits.iter().map(|i| i.id).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&1));
        assert!(ids.contains(&2));

        // Secondary ids come back on the row itself too.
        let b = db.get_catalog_item(MediaKind::Movie, 2).unwrap().unwrap();
        assert_eq!(b.secondary_category_ids.len(), 2);
    }

    #[test]
    fn test_categories_roundtrip() {
        let db = Storage::open_memory().unwrap();
        assert!(!db.has_categories(MediaKind::Live).unwrap());
        db.replace_categories(
            MediaKind::Live,
            &[
                Category {
                    id: 1,
                    kind: MediaKind::Live,
                    name: "News".into(),
                },
                Category {
                    id: 2,
                    kind: MediaKind::Live,
                    name: "Sports".into(),
                },
            ],
        )
        .unwrap();
        assert!(db.has_categories(MediaKind::Live).unwrap());
        assert_eq!(db.get_categories(MediaKind::Live).unwrap().len(), 2);
    }

    #[test]
    fn test_toggle_favorite_twice() {
        let db = Storage::open_memory().unwrap();
        assert!(db.toggle_favorite(&favorite(42)).unwrap());
        assert!(!db.toggle_favorite(&favorite(42)).unwrap());
        assert!(db.get_favorites().unwrap().is_empty());

        assert!(db.toggle_favorite(&favorite(42)).unwrap());
        assert_eq!(db.get_favorites().unwrap().len(), 1);
        assert_eq!(db.favorite_ids(MediaKind::Movie).unwrap().len(), 1);
    }

    #[test]
    fn test_history_read_cap() {
        let db = Storage::open_memory().unwrap();
        for i in 0..10 {
            db.record_watch(&WatchHistoryEntry {
                item_id: i,
                kind: MediaKind::Movie,
                title: format!("Movie {i}"),
                poster_url: None,
                duration_secs: None,
                progress_percent: None,
                watched_at: Utc::now(),
            })
            .unwrap();
        }
        assert_eq!(db.get_history(3).unwrap().len(), 3);
        assert_eq!(db.get_history(100).unwrap().len(), 10);
    }

    #[test]
    fn test_continue_watching_upsert_keeps_latest() {
        let db = Storage::open_memory().unwrap();
        let mut entry = ContinueWatchingEntry {
            item_id: 5,
            kind: MediaKind::Movie,
            title: "Movie".into(),
            poster_url: None,
            progress_percent: 10.0,
            position_secs: 60.0,
            duration_secs: 600.0,
            updated_at: Utc::now(),
        };
        db.save_continue_watching(&entry).unwrap();
        entry.progress_percent = 50.0;
        entry.position_secs = 300.0;
        db.save_continue_watching(&entry).unwrap();

        let rows = db.get_continue_watching().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].progress_percent, 50.0);
        assert_eq!(rows[0].position_secs, 300.0);

        db.remove_continue_watching(5).unwrap();
        assert!(db.get_continue_watching().unwrap().is_empty());
    }

    #[test]
    fn test_episode_progress_update_else_insert() {
        let db = Storage::open_memory().unwrap();
        let mut entry = EpisodeProgressEntry {
            episode_id: 900,
            series_id: 33,
            season_number: 1,
            episode_number: 4,
            title: Some("Ep 4".into()),
            progress_percent: 20.0,
            position_secs: 240.0,
            duration_secs: 1200.0,
            watched: false,
            updated_at: Utc::now(),
        };
        db.save_episode_progress(&entry).unwrap();
        entry.progress_percent = 100.0;
        entry.watched = true;
        db.save_episode_progress(&entry).unwrap();

        let rows = db.get_episode_progress(33).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].watched);
        assert_eq!(rows[0].progress_percent, 100.0);
    }

    #[test]
    fn test_series_detail_roundtrip() {
        let db = Storage::open_memory().unwrap();
        assert!(db.get_series_detail(33).unwrap().is_none());
        db.upsert_series_detail(&SeriesDetail {
            series_id: 33,
            seasons: vec![crate::models::Season {
                season_number: 1,
                name: Some("Season 1".into()),
                episode_count: Some(12),
            }],
            episodes: vec![crate::models::Episode {
                id: 900,
                season_number: 1,
                episode_number: 1,
                title: Some("Pilot".into()),
                container_extension: Some("mkv".into()),
                duration_secs: Some(1440),
                plot: None,
            }],
            fetched_at: Utc::now(),
        })
        .unwrap();

        let detail = db.get_series_detail(33).unwrap().unwrap();
        assert_eq!(detail.seasons.len(), 1);
        assert_eq!(detail.episodes[0].id, 900);
    }

    #[test]
    fn test_sync_cursor_roundtrip() {
        let db = Storage::open_memory().unwrap();
        assert!(db.get_sync_cursor(SyncKind::Movies).unwrap().is_none());

        let at = Utc::now();
        db.set_sync_cursor(SyncKind::Movies, at).unwrap();
        let read = db.get_sync_cursor(SyncKind::Movies).unwrap().unwrap();
        assert_eq!(read.timestamp(), at.timestamp());

        // Cursors are independent per kind.
        assert!(db.get_sync_cursor(SyncKind::Live).unwrap().is_none());
    }
}
