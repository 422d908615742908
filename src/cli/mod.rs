use anyhow::Context;
use clap::{Parser, Subcommand};
use std::{path::PathBuf, sync::Arc};

use crate::config;
use crate::discovery::{
    clock::{CancelToken, SystemClock},
    fetcher::{Fetcher, UreqTralbumApi},
    sampler::{RandomIds, Sampler},
    submitter::HttpCollector,
};
use crate::http::server::HttpServer;
use crate::storage::db::i64_seconds_to_local_time;
use crate::storage::filter::{FilterField, LookupFilter};
use crate::storage::operations::Store;

#[derive(Parser)]
#[command(name = "bandscrape")]
#[command(version = "0.1")]
#[command(about = "Discovers Bandcamp tracks by sampling ids and archives them")]
pub struct Cli {
    /// Path to the config TOML file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the collector: ingestion endpoint and lookup page
    Serve,
    /// Sample random track ids forever and submit discoveries to the collector
    Discover,
    /// Show how many tracks are archived
    Status,
    /// Look up archived tracks by exact field values
    Lookup {
        #[arg(long, default_value = "")]
        track_title: String,
        #[arg(long, default_value = "")]
        album_title: String,
        #[arg(long, default_value = "")]
        band_name: String,
        #[arg(long, default_value = "")]
        track_url: String,
    },
}

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

/// Entrypoint for CLI
pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging();

    let cfg = config::Config::load(&cli.config.to_string_lossy())?;

    match cli.command {
        Commands::Serve => {
            let store = Store::open(&cfg.database).with_context(|| "Failed to load database")?;
            let http_server = HttpServer::new(store, cfg.http);

            log::info!(
                "Listening on {}:{}",
                http_server.config.bind_addr,
                http_server.config.port
            );
            http_server.run();
        }

        Commands::Discover => {
            let discovery = cfg.discovery;
            let cancel = CancelToken::new();
            let fetcher = Fetcher::new(
                Box::new(UreqTralbumApi::new(&discovery)),
                Arc::new(SystemClock),
                &discovery,
                cancel,
            );
            let mut sampler = Sampler::new(
                fetcher,
                Box::new(HttpCollector::new(&discovery)),
                Box::new(RandomIds::new()),
                &discovery,
            );

            log::info!("Submitting discoveries to {}", discovery.collector_url);
            sampler.run();
        }

        Commands::Status => {
            let store = Store::open(&cfg.database)?;
            println!("Database contains {} track(s)", store.count_tracks()?);
        }

        Commands::Lookup {
            track_title,
            album_title,
            band_name,
            track_url,
        } => {
            let filter = LookupFilter::new()
                .with(FilterField::TrackTitle, track_title)
                .with(FilterField::AlbumTitle, album_title)
                .with(FilterField::BandName, band_name)
                .with(FilterField::TrackUrl, track_url);

            let store = Store::open(&cfg.database)?;
            let tracks = store.lookup(&filter)?;

            println!("Found {} track(s):", tracks.len());
            for stored in &tracks {
                let track = &stored.track;
                println!(
                    "  [{}] {} - {}{} ({})",
                    track.track_id,
                    track.band_name,
                    track.track_title,
                    track
                        .album_title
                        .as_ref()
                        .map(|album| format!(" [{album}]"))
                        .unwrap_or_default(),
                    track.track_url
                );
                println!(
                    "      archived {}",
                    i64_seconds_to_local_time(stored.created_at)?
                );
            }
        }
    }

    Ok(())
}
