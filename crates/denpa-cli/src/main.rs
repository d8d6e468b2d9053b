//! Command-line front end for the denpa catalog runtime.

use clap::{Parser, Subcommand, ValueEnum};
use tracing::warn;

use denpa_api::xtream::XtreamClient;
use denpa_core::config::AppConfig;
use denpa_core::models::{MediaKind, SyncKind};
use denpa_runtime::{CatalogFilter, Runtime, SyncOutcome};

#[derive(Parser)]
#[command(name = "denpa", about = "Offline-first streaming catalog browser")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sync a catalog now, ignoring the freshness gate.
    Sync {
        kind: KindArg,
    },
    /// List cached catalog items (read is local; a background refresh may
    /// follow).
    List {
        kind: KindArg,
        /// Only items in this category.
        #[arg(long)]
        category: Option<i64>,
        /// Only favorited items.
        #[arg(long, conflicts_with = "category")]
        favorites: bool,
    },
    /// List categories for a kind, fetching them on first use.
    Categories {
        kind: KindArg,
    },
    /// List favorited items across all kinds.
    Favorites,
    /// Show recent watch history, newest first.
    History {
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Show the continue-watching shelf.
    Continue,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Live,
    Movies,
    Series,
}

impl From<KindArg> for MediaKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Live => MediaKind::Live,
            KindArg::Movies => MediaKind::Movie,
            KindArg::Series => MediaKind::Series,
        }
    }
}

impl From<KindArg> for SyncKind {
    fn from(arg: KindArg) -> Self {
        MediaKind::from(arg).into()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "denpa=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load()?;
    let runtime: Runtime<XtreamClient> = Runtime::from_config(config)?;
    if runtime.is_store_degraded() {
        warn!("local store unavailable; results will be empty until it recovers");
    }

    match cli.command {
        Command::Sync { kind } => {
            match runtime.force_sync(kind.into()).await? {
                SyncOutcome::Applied { created, deleted } => {
                    println!("synced: {created} added, {deleted} removed");
                }
                SyncOutcome::NoChanges => println!("already up to date"),
                SyncOutcome::Skipped(reason) => println!("skipped: {reason:?}"),
                SyncOutcome::Failed => println!("sync failed"),
            }
        }
        Command::List {
            kind,
            category,
            favorites,
        } => {
            let filter = if favorites {
                CatalogFilter::Favorites
            } else if let Some(id) = category {
                CatalogFilter::Category(id)
            } else {
                CatalogFilter::All
            };
            let items = runtime.catalog(kind.into(), filter).await?;
            for item in &items {
                println!("{:>8}  {}", item.id, item.name);
            }
            println!("{} items", items.len());
        }
        Command::Categories { kind } => {
            for category in runtime.categories(kind.into()).await? {
                println!("{:>8}  {}", category.id, category.name);
            }
        }
        Command::Favorites => {
            for favorite in runtime.favorites().await? {
                println!("{:>8}  [{}] {}", favorite.item_id, favorite.kind, favorite.title);
            }
        }
        Command::History { limit } => {
            for entry in runtime.history(limit).await? {
                println!(
                    "{}  [{}] {}",
                    entry.watched_at.format("%Y-%m-%d %H:%M"),
                    entry.kind,
                    entry.title
                );
            }
        }
        Command::Continue => {
            for entry in runtime.continue_watching().await? {
                println!(
                    "{:>8}  [{}] {}  {:.0}%",
                    entry.item_id, entry.kind, entry.title, entry.progress_percent
                );
            }
        }
    }
    Ok(())
}
