mod catalog;
mod watch;

pub use catalog::{
    CatalogExtra, CatalogItem, Category, Episode, MediaKind, Season, SeriesDetail, SyncKind,
};
pub use watch::{ContinueWatchingEntry, EpisodeProgressEntry, Favorite, WatchHistoryEntry};
