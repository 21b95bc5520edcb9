//! pace-tempo - Track tempo resolution tool
//!
//! Resolves BPM for a list of tracks through the local tempo cache and the
//! remote BPM lookup service, and reports how many fall inside a target
//! tempo range.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pace_common::TempoConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pace_tempo::db::SqliteTempoCache;
use pace_tempo::services::playlist_constructor::{DEFAULT_FIT_PERCENT, DEFAULT_TEMPO};
use pace_tempo::services::PlaylistConstructor;
use pace_tempo::{Track, TempoService};

#[derive(Parser)]
#[command(name = "pace-tempo", version, about = "Resolve track tempos for tempo-filtered playlists")]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Folder holding the tempo cache database
    #[arg(long, global = true)]
    root_folder: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve tempos for the tracks in a JSON file
    Resolve {
        /// JSON array of tracks (id, title, artist, album, isrc, duration_secs)
        #[arg(long)]
        tracks: PathBuf,

        /// Target tempo in BPM
        #[arg(long, default_value_t = DEFAULT_TEMPO)]
        tempo: u32,

        /// Accepted deviation from the target tempo, in percent
        #[arg(long, default_value_t = DEFAULT_FIT_PERCENT)]
        fit: u32,
    },
    /// Show how many tempos are cached
    CacheStats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = TempoConfig::load(cli.config.as_deref())?;
    config.apply_env_overrides();
    config.validate()?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        git_hash = env!("GIT_HASH"),
        build_profile = env!("BUILD_PROFILE"),
        built_at = env!("BUILD_TIMESTAMP"),
        "Starting pace-tempo"
    );

    let root_folder = config.resolve_root_folder(cli.root_folder.as_deref());
    info!("Root folder: {}", root_folder.display());

    match cli.command {
        Command::Resolve { tracks, tempo, fit } => {
            resolve(&config, &root_folder, &tracks, tempo, fit).await
        }
        Command::CacheStats => cache_stats(&root_folder).await,
    }
}

async fn resolve(
    config: &TempoConfig,
    root_folder: &Path,
    tracks_path: &Path,
    tempo: u32,
    fit: u32,
) -> Result<()> {
    let content = std::fs::read_to_string(tracks_path)
        .with_context(|| format!("Failed to read {}", tracks_path.display()))?;
    let tracks: Vec<Track> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse tracks from {}", tracks_path.display()))?;

    let service = Arc::new(TempoService::open(config, root_folder).await?);

    let mut constructor = PlaylistConstructor::new(service.clone());
    constructor.tempo = tempo;
    constructor.fit = fit;
    let added = constructor.add_tracks(tracks);
    info!(added, "Resolving tempos");

    for resolver in constructor.resolvers() {
        let track = resolver.track();
        match resolver.wait().await {
            Ok(bpm) => println!("{}\t{} - {}\t{:.1} bpm", track.id, track.artist_name, track.title, bpm),
            Err(e) => println!("{}\t{} - {}\tunresolved ({})", track.id, track.artist_name, track.title, e),
        }
    }

    let range = constructor.tempo_range();
    println!(
        "{} of {} tracks between {:.0} and {:.0} bpm",
        constructor.matching_count(),
        constructor.total_count(),
        range.start(),
        range.end()
    );

    service.shutdown().await;
    Ok(())
}

async fn cache_stats(root_folder: &Path) -> Result<()> {
    let db_path = pace_common::config::database_path(root_folder);
    let pool = pace_tempo::db::init_database_pool(&db_path).await?;
    let cache = SqliteTempoCache::new(pool);

    println!("{}: {} cached tempos", db_path.display(), cache.count().await?);
    if let Some(latest) = cache.last_cached_at().await? {
        println!("Last cached: {}", latest.format("%Y-%m-%d %H:%M:%S"));
    }
    Ok(())
}
