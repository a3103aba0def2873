//! flashynime CLI application.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use flashynime_api::CatalogClient;
use serde::Serialize;
use shared::{Anime, AnimeDetail, AppStore, Config, ContentKind, Language, Listing};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "flashynime", author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the home page of a category
    Home {
        #[arg(default_value = "anime")]
        category: ContentKind,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },

    /// Browse a listing (anime: ongoing|completed|movies|popular|latest|batch;
    /// donghua: ongoing|completed|latest|seasons; manga: projects|all|<order>)
    List {
        category: ContentKind,
        kind: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Restrict to these genre ids (union of all)
        #[arg(long = "genre")]
        genres: Vec<String>,
        /// Season year (donghua seasons)
        #[arg(long)]
        year: Option<i32>,
    },

    /// Search one category, or all of them
    Search {
        query: String,
        #[arg(long)]
        category: Option<ContentKind>,
    },

    /// Show a detail page
    Detail { category: ContentKind, id: String },

    /// Fetch an episode and record it as watched
    Watch { category: ContentKind, episode_id: String },

    /// Fetch a manga chapter and record it as read
    Read { chapter_id: String },

    /// Show a batch download page
    Batch { id: String },

    /// Resolve an anime server id to its embed URL
    Embed { server_id: String },

    /// Pick a random popular anime
    Random,

    /// Show recommended anime
    Recommended,

    /// Show the release schedule
    Schedule { category: ContentKind },

    /// List genres
    Genres { category: ContentKind },

    /// Manage the watchlist
    Watchlist {
        #[command(subcommand)]
        action: WatchlistAction,
    },

    /// Manage the watch history
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Set the UI language (id|en)
    Language { language: Language },

    /// Inspect or clear the fetch cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Debug)]
enum WatchlistAction {
    List,
    Add { category: ContentKind, id: String },
    Remove { id: String },
}

#[derive(Subcommand, Debug)]
enum HistoryAction {
    List,
    Remove { id: String },
    Clear,
}

#[derive(Subcommand, Debug)]
enum CacheAction {
    Stats,
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Initialize logging
    let mut log_config = shared::LogConfig::from_settings("flashynime", &config.log_dir(), &config.logging);
    if args.verbose {
        log_config.default_level = tracing::Level::DEBUG;
    }
    shared::logging::init(log_config)?;

    info!(config_file = %args.config.display(), "flashynime starting");

    let client = CatalogClient::from_config(&config).context("Failed to create catalog client")?;

    match args.command {
        Command::Home { category, page } => {
            let home = match category {
                ContentKind::Anime => client.anime().home().await?,
                ContentKind::Donghua => client.donghua().home(page).await?,
                ContentKind::Manga => client.manga().home().await?,
            };
            print_json(&home)?;
        }
        Command::List {
            category,
            kind,
            page,
            genres,
            year,
        } => {
            if !genres.is_empty() {
                let items = match category {
                    ContentKind::Anime => client.anime().by_genres(&genres, page).await?,
                    ContentKind::Donghua => client.donghua().by_genres(&genres, page).await?,
                    ContentKind::Manga => client.manga().by_genres(&genres, page).await?,
                };
                print_json(&Listing::new(items))?;
            } else {
                let listing = list(&client, category, &kind, page, year).await?;
                print_json(&listing)?;
            }
        }
        Command::Search { query, category } => match category {
            Some(kind) => print_json(&client.search(kind, &query).await?)?,
            None => print_json(&client.search_everywhere(&query).await)?,
        },
        Command::Detail { category, id } => {
            let detail = client.detail(category, &id).await?;
            let store = open_store(&config)?;
            let mut out = serde_json::to_value(&detail)?;
            out["inWatchlist"] = store.is_in_watchlist(&detail.anime.id).into();
            if let Some(episode) = store.last_watched(&detail.anime.id) {
                out["lastWatched"] = episode.into();
            }
            print_json(&out)?;
        }
        Command::Watch { category, episode_id } => {
            let episode = match category {
                ContentKind::Anime => client.anime().episode(&episode_id).await?,
                ContentKind::Donghua => client.donghua().episode(&episode_id).await?,
                ContentKind::Manga => bail!("Manga chapters are read with `read <chapter-id>`"),
            };

            let summary = summary_for(&client, category, &episode.anime_id).await;
            let mut store = open_store(&config)?;
            store.update_watch_progress(&summary.id, &episode.id)?;
            store.add_to_history(summary, Some(&episode.title))?;
            info!(anime_id = %episode.anime_id, episode_id = %episode.id, "Recorded watch");

            print_json(&episode)?;
        }
        Command::Read { chapter_id } => {
            let chapter = client.manga().chapter(&chapter_id).await?;

            let summary = summary_for(&client, ContentKind::Manga, &chapter.manga_id).await;
            let mut store = open_store(&config)?;
            store.update_watch_progress(&summary.id, &chapter.id)?;
            store.add_to_history(summary, Some(&chapter.title))?;

            print_json(&chapter)?;
        }
        Command::Batch { id } => print_json(&client.anime().batch_detail(&id).await?)?,
        Command::Embed { server_id } => print_json(&client.anime().server_embed(&server_id).await?)?,
        Command::Random => print_json(&client.anime().random().await?)?,
        Command::Recommended => print_json(&client.anime().recommended().await?)?,
        Command::Schedule { category } => print_json(&client.schedule(category).await?)?,
        Command::Genres { category } => print_json(&client.genres(category).await?)?,
        Command::Watchlist { action } => {
            let mut store = open_store(&config)?;
            match action {
                WatchlistAction::List => {}
                WatchlistAction::Add { category, id } => {
                    let detail = client.detail(category, &id).await?;
                    store.add_to_watchlist(detail.anime)?;
                }
                WatchlistAction::Remove { id } => store.remove_from_watchlist(&id)?,
            }
            print_json(&store.watchlist())?;
        }
        Command::History { action } => {
            let mut store = open_store(&config)?;
            match action {
                HistoryAction::List => {}
                HistoryAction::Remove { id } => store.remove_from_history(&id)?,
                HistoryAction::Clear => store.clear_history()?,
            }
            print_json(&store.history())?;
        }
        Command::Language { language } => {
            let mut store = open_store(&config)?;
            store.set_language(language)?;
            print_json(&store.language())?;
        }
        Command::Cache { action } => {
            let cache = client.fetcher().cache();
            match action {
                CacheAction::Stats => {
                    let stats = cache.stats().context("Failed to get cache stats")?;
                    info!(
                        cached_entries = stats.total_entries,
                        cache_size_kb = stats.total_size_bytes / 1_000,
                        "Cache statistics"
                    );
                    print_json(&serde_json::json!({
                        "entries": stats.total_entries,
                        "sizeBytes": stats.total_size_bytes,
                    }))?;
                }
                CacheAction::Clear => {
                    let removed = cache.clear().context("Failed to clear cache")?;
                    print_json(&serde_json::json!({ "removed": removed }))?;
                }
            }
        }
    }

    Ok(())
}

async fn list(
    client: &CatalogClient,
    category: ContentKind,
    kind: &str,
    page: u32,
    year: Option<i32>,
) -> Result<Listing> {
    let listing = match (category, kind) {
        (ContentKind::Anime, "ongoing") => client.anime().ongoing(page).await?,
        (ContentKind::Anime, "completed") => client.anime().completed(page).await?,
        (ContentKind::Anime, "movies") => client.anime().movies(page).await?,
        (ContentKind::Anime, "popular") => client.anime().popular(page).await?,
        (ContentKind::Anime, "latest") => client.anime().latest_episodes(page).await?,
        (ContentKind::Anime, "batch") => client.anime().batch_list(page).await?,
        (ContentKind::Donghua, "ongoing") => client.donghua().ongoing(page).await?,
        (ContentKind::Donghua, "completed") => client.donghua().completed(page).await?,
        (ContentKind::Donghua, "latest") => client.donghua().latest(page).await?,
        (ContentKind::Donghua, "seasons") => Listing::new(client.donghua().seasons(year).await?),
        (ContentKind::Manga, "projects") => client.manga().projects(page).await?,
        (ContentKind::Manga, "all") => client.manga().all(page).await?,
        (ContentKind::Manga, order) => client.manga().list(order, page).await?,
        (category, other) => bail!("Unknown {} listing: {}", category, other),
    };
    Ok(listing)
}

/// Summary record used for history entries. Falls back to a bare record
/// carrying only the id when the detail page cannot be fetched.
async fn summary_for(client: &CatalogClient, category: ContentKind, id: &str) -> Anime {
    match client.detail(category, id).await {
        Ok(AnimeDetail { anime, .. }) => anime,
        Err(e) => {
            warn!(id = id, error = %e, "Detail unavailable, recording bare history entry");
            let mut anime = Anime::placeholder(category);
            anime.id = id.to_string();
            anime
        }
    }
}

fn open_store(config: &Config) -> Result<AppStore> {
    let storage = shared::storage::open(config.store.backend, config.store_path())
        .context("Failed to open app state storage")?;
    AppStore::load(storage).context("Failed to load app state")
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", out);
    Ok(())
}
